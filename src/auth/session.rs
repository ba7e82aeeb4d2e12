//! Signed, scoped `scope:user_id:issued_at` tokens.
//!
//! Used for the session cookie and for the OAuth `state` parameter. The scope
//! prefix keeps one from being replayed as the other.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use crate::crypto::CryptoEngine;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "dm_session";
pub const SESSION_SCOPE: &str = "session";
pub const OAUTH_STATE_SCOPE: &str = "oauth";

pub fn seal(
    crypto: &CryptoEngine,
    scope: &str,
    user_id: i64,
    issued_at: i64,
) -> Result<String, AppError> {
    crypto.sign(&format!("{scope}:{user_id}:{issued_at}"))
}

/// Returns the user id if the token is authentic, carries `scope`,
/// and is at most `max_age_secs` old at `now`.
pub fn open(
    crypto: &CryptoEngine,
    scope: &str,
    token: &str,
    max_age_secs: i64,
    now: i64,
) -> Option<i64> {
    let payload = crypto.verify_signed(token).ok()?;

    let mut parts = payload.splitn(3, ':');
    if parts.next()? != scope {
        return None;
    }
    let user_id: i64 = parts.next()?.parse().ok()?;
    let issued_at: i64 = parts.next()?.parse().ok()?;

    let age = now - issued_at;
    if !(0..=max_age_secs).contains(&age) {
        return None;
    }

    Some(user_id)
}

/// Session user from the cookie jar, if any.
pub fn current_user(crypto: &CryptoEngine, jar: &CookieJar, ttl_secs: i64) -> Option<i64> {
    let cookie = jar.get(SESSION_COOKIE)?;
    open(crypto, SESSION_SCOPE, cookie.value(), ttl_secs, Utc::now().timestamp())
}

pub fn start_session(
    crypto: &CryptoEngine,
    jar: CookieJar,
    user_id: i64,
    secure: bool,
) -> Result<CookieJar, AppError> {
    let value = seal(crypto, SESSION_SCOPE, user_id, Utc::now().timestamp())?;
    let cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax);
    Ok(jar.add(cookie))
}

pub fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
