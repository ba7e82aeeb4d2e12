//! Route handlers.
//!
//! The index route multiplexes on `action` the way the single-page UI
//! expects: browse by default, `logout`, `download` and `thumb` otherwise.
//! Logging in posts back to the same route.

use askama::Template;
use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::browse::{self, BrowseRequest};
use super::views::{BrowseView, LoginPage};
use crate::auth::{self, session};
use crate::drive::client::Fetched;
use crate::error::AppError;
use crate::SharedState;

// =============================================================================
// Health
// =============================================================================

/// GET /status
pub async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "drive-manager",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Index
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    action: Option<String>,
    parent: Option<String>,
    search: Option<String>,
    #[serde(rename = "pageToken")]
    page_token: Option<String>,
    id: Option<String>,
}

/// GET /: login form, folder listing, or one of the item actions.
pub async fn index(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(q): Query<IndexQuery>,
) -> Result<Response, AppError> {
    if q.action.as_deref() == Some("logout") {
        return Ok((session::end_session(jar), Redirect::to("/")).into_response());
    }

    let Some(user_id) = auth::current_user(&state.crypto, &jar, state.config.session_ttl_secs())
    else {
        return render_login(None);
    };

    match q.action.as_deref() {
        Some("download") => {
            let id = required_id(&q)?;
            let credential = state.lifecycle().obtain_valid_credential(user_id).await?;
            let fetched = state.drive.download(&credential, id).await?;
            info!(user_id, file_id = id, bytes = ?fetched.content_length, "download");
            attachment(fetched)
        }
        Some("thumb") => {
            let id = required_id(&q)?;
            let credential = state.lifecycle().obtain_valid_credential(user_id).await?;
            let fetched = state.drive.thumbnail(&credential, id).await?;
            let content_length = fetched.content_length;
            let response = (
                [
                    (header::CONTENT_TYPE, header_value(&fetched.content_type)?),
                    (header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=3600")),
                ],
                fetched.body,
            )
                .into_response();
            Ok(with_length(response, content_length))
        }
        _ => {
            let request = BrowseRequest {
                parent: q.parent,
                search: q.search,
                page_token: q.page_token,
            };
            let lifecycle = state.lifecycle();
            let page = browse::load(&lifecycle, &state.drive, user_id, request).await?;
            let html = BrowseView::from(&page).render()?;
            Ok(Html(html).into_response())
        }
    }
}

fn required_id(q: &IndexQuery) -> Result<&str, AppError> {
    q.id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing id".into()))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(format!("invalid header value: {e}")))
}

/// Quoted-string safe ASCII rendition of a file name.
fn disposition_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

fn attachment(fetched: Fetched) -> Result<Response, AppError> {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        disposition_name(&fetched.file_name)
    );

    let response = (
        [
            (header::CONTENT_TYPE, header_value(&fetched.content_type)?),
            (header::CONTENT_DISPOSITION, header_value(&disposition)?),
        ],
        fetched.body,
    )
        .into_response();
    Ok(with_length(response, fetched.content_length))
}

fn with_length(mut response: Response, content_length: Option<u64>) -> Response {
    if let Some(len) = content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    response
}

fn render_login(error: Option<&str>) -> Result<Response, AppError> {
    let html = LoginPage { error }.render()?;
    Ok(Html(html).into_response())
}

// =============================================================================
// Login
// =============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    action: Option<String>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /: `action=login` with username and password.
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if form.action.as_deref() != Some("login") {
        return Err(AppError::BadRequest("unsupported action".into()));
    }

    let user = state.store.find_user_by_username(form.username.trim()).await?;

    match user {
        Some(user) if auth::verify_password(&form.password, &user.password_hash) => {
            let jar = session::start_session(
                &state.crypto,
                jar,
                user.id,
                state.config.cookie_secure,
            )?;
            info!(user_id = user.id, "signed in");
            Ok((jar, Redirect::to("/")).into_response())
        }
        _ => {
            warn!("failed sign-in attempt");
            render_login(Some("Invalid credentials"))
        }
    }
}

// =============================================================================
// OAuth callback
// =============================================================================

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /oauth/callback: finish Drive consent and store the token pair.
pub async fn oauth_callback(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(q): Query<OAuthCallbackQuery>,
) -> Result<Response, AppError> {
    let user_id = auth::current_user(&state.crypto, &jar, state.config.session_ttl_secs())
        .ok_or(AppError::NotAuthenticated)?;

    if let Some(error) = q.error {
        warn!(user_id, "consent denied: {error}");
        return Err(AppError::BadRequest(format!("authorization denied: {error}")));
    }

    let (Some(code), Some(oauth_state)) = (q.code, q.state) else {
        return Err(AppError::BadRequest("missing code or state".into()));
    };

    state
        .lifecycle()
        .complete_consent(user_id, &code, &oauth_state)
        .await?;

    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::crypto::test_engine;
    use crate::drive::DriveClient;
    use crate::providers::GoogleProvider;
    use crate::store::{CredentialStore, TokenStore};
    use crate::testing::fresh_blob;
    use crate::AppState;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            base_url: "http://localhost:8080".into(),
            database_url: "sqlite::memory:".into(),
            master_key: String::new(),
            session_secret: String::new(),
            session_ttl_hours: 12,
            cookie_secure: false,
            google_client_id: "client".into(),
            google_client_secret: "secret".into(),
        }
    }

    /// Serve the app on an ephemeral port; returns its base URL.
    async fn spawn_app(google: &str, drive: &str) -> (String, SharedState) {
        let store = TokenStore::new("sqlite::memory:", test_engine()).await.unwrap();
        store.migrate().await.unwrap();
        let hash = auth::hash_password("hunter2").unwrap();
        store.create_user("ana", &hash).await.unwrap();

        let state: SharedState = Arc::new(AppState::new(
            test_config(),
            store,
            test_engine(),
            Box::new(GoogleProvider::with_endpoints(
                "client".into(),
                "secret".into(),
                &format!("{google}/auth"),
                &format!("{google}/token"),
            )),
            DriveClient::with_base_url(drive).unwrap(),
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::api::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), state)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    async fn sign_in(base: &str) -> String {
        let resp = client()
            .post(format!("{base}/"))
            .form(&[("action", "login"), ("username", "ana"), ("password", "hunter2")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 303);
        let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_disposition_name_is_header_safe() {
        assert_eq!(disposition_name("report \"Q1\".pdf"), "report _Q1_.pdf");
        assert_eq!(disposition_name("naïve.txt"), "na_ve.txt");
        assert_eq!(disposition_name("  "), "download");
    }

    #[tokio::test]
    async fn test_status() {
        let (base, _) = spawn_app("http://unused", "http://unused").await;
        let body: serde_json::Value = client()
            .get(format!("{base}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_anonymous_index_shows_login() {
        let (base, _) = spawn_app("http://unused", "http://unused").await;
        let resp = client().get(format!("{base}/?action=download&id=x")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().contains("name=\"password\""));
    }

    #[tokio::test]
    async fn test_wrong_password_rerenders_form() {
        let (base, _) = spawn_app("http://unused", "http://unused").await;
        let resp = client()
            .post(format!("{base}/"))
            .form(&[("action", "login"), ("username", "ana"), ("password", "nope")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(resp.text().await.unwrap().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_signed_in_without_token_gets_connect_page() {
        let (base, _) = spawn_app("http://unused", "http://unused").await;
        let cookie = sign_in(&base).await;

        let resp = client()
            .get(format!("{base}/"))
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = resp.text().await.unwrap();
        assert!(html.contains("Connect Google Drive"));
        assert!(html.contains("http://unused/auth?"));
    }

    #[tokio::test]
    async fn test_consent_then_browse() {
        let mut google = mockito::Server::new_async().await;
        let mut drive = mockito::Server::new_async().await;
        google
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"ya29.new","refresh_token":"1//rt","expires_in":3599,"token_type":"Bearer"}"#)
            .create_async()
            .await;
        let listing = drive
            .mock("GET", "/files")
            .match_header("authorization", "Bearer ya29.new")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"files":[{"id":"f1","name":"budget.xlsx","mimeType":"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"}]}"#)
            .create_async()
            .await;

        let (base, state) = spawn_app(&google.url(), &drive.url()).await;
        let cookie = sign_in(&base).await;

        let oauth_state = session::seal(
            &state.crypto,
            session::OAUTH_STATE_SCOPE,
            1,
            chrono::Utc::now().timestamp(),
        )
        .unwrap();
        let resp = client()
            .get(format!("{base}/oauth/callback"))
            .query(&[("code", "4/abc"), ("state", oauth_state.as_str())])
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 303);

        let html = client()
            .get(format!("{base}/"))
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        listing.assert_async().await;
        assert!(html.contains("budget.xlsx"));
    }

    #[tokio::test]
    async fn test_download_streams_file_with_length() {
        let mut drive = mockito::Server::new_async().await;
        drive
            .mock("GET", "/files/f9")
            .match_query(mockito::Matcher::UrlEncoded("fields".into(), "id, name, mimeType".into()))
            .with_status(200)
            .with_body(r#"{"id":"f9","name":"q1 \"final\".csv","mimeType":"text/csv"}"#)
            .create_async()
            .await;
        drive
            .mock("GET", "/files/f9")
            .match_query(mockito::Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("a,b\n1,2\n")
            .create_async()
            .await;

        let (base, state) = spawn_app("http://unused", &drive.url()).await;
        state
            .store
            .insert_token(1, &fresh_blob("ya29.ok"), None)
            .await
            .unwrap();
        let cookie = sign_in(&base).await;

        let resp = client()
            .get(format!("{base}/?action=download&id=f9"))
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "8");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"q1 _final_.csv\""
        );
        assert_eq!(resp.text().await.unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (base, _) = spawn_app("http://unused", "http://unused").await;
        let cookie = sign_in(&base).await;

        let resp = client()
            .get(format!("{base}/?action=logout"))
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 303);
        let removal = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(removal.starts_with(&format!("{}=;", session::SESSION_COOKIE)));
    }
}
