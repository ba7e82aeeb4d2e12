//! Token lifecycle: turns a user's newest stored token row into a usable
//! Drive credential, refreshing it at most once.
//!
//! Every failure here is terminal for the request: there is no retry and no
//! backoff. A rejected refresh sends the user back through consent exactly
//! like a missing row does.
//!
//! Refreshes overwrite the row without a lock. Two requests racing the same
//! expired token may both refresh and both write; each blob is valid on its
//! own, so the last write wins.

use chrono::Utc;
use tracing::{info, warn};

use super::token::Credential;
use crate::auth::session::{self, OAUTH_STATE_SCOPE};
use crate::crypto::CryptoEngine;
use crate::error::AppError;
use crate::providers::OAuthProvider;
use crate::store::CredentialStore;

/// How long a consent `state` parameter stays valid.
pub const CONSENT_STATE_MAX_AGE_SECS: i64 = 600;

pub struct TokenLifecycle<'a> {
    store: &'a dyn CredentialStore,
    provider: &'a dyn OAuthProvider,
    crypto: &'a CryptoEngine,
    redirect_uri: &'a str,
}

impl<'a> TokenLifecycle<'a> {
    pub fn new(
        store: &'a dyn CredentialStore,
        provider: &'a dyn OAuthProvider,
        crypto: &'a CryptoEngine,
        redirect_uri: &'a str,
    ) -> Self {
        Self {
            store,
            provider,
            crypto,
            redirect_uri,
        }
    }

    /// Return a credential that is valid right now, or
    /// [`AppError::AuthorizationRequired`] carrying a consent URL.
    ///
    /// The fast path (unexpired token) performs no network I/O and no writes.
    /// The only write is the overwrite after a successful refresh.
    pub async fn obtain_valid_credential(&self, user_id: i64) -> Result<Credential, AppError> {
        let Some(record) = self.store.get_latest_token(user_id).await? else {
            info!(user_id, "no Drive token on file, consent required");
            return Err(self.authorization_required(user_id, false));
        };

        match Credential::from_blob(&record.access_token) {
            Ok(credential) if !credential.is_expired_at(Utc::now()) => return Ok(credential),
            Ok(_) => {}
            Err(e) => warn!(user_id, record_id = record.id, "{e}, treating as expired"),
        }

        let Some(refresh_token) = record.refresh_token.as_deref() else {
            info!(user_id, record_id = record.id, "access token expired and no refresh token");
            return Err(self.authorization_required(user_id, true));
        };

        let tokens = match self.provider.refresh_token(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(user_id, record_id = record.id, "refresh rejected, consent required: {e}");
                return Err(self.authorization_required(user_id, true));
            }
        };

        let credential = Credential::from_token_set(tokens, Utc::now());
        self.store
            .update_access_token(record.id, &credential.to_blob()?)
            .await?;

        info!(user_id, record_id = record.id, "refreshed Drive access token");
        Ok(credential)
    }

    /// Consent URL bound to `user_id` through a signed `state` parameter.
    pub fn consent_url(&self, user_id: i64) -> Result<String, AppError> {
        let state = session::seal(self.crypto, OAUTH_STATE_SCOPE, user_id, Utc::now().timestamp())?;
        Ok(self.provider.auth_url(
            &self.provider.default_scopes(),
            &state,
            self.redirect_uri,
        ))
    }

    /// Finish the consent flow: check `state`, exchange `code` and store the
    /// new token pair. Returns the new row id.
    pub async fn complete_consent(
        &self,
        session_user: i64,
        code: &str,
        state: &str,
    ) -> Result<i64, AppError> {
        let user_id = session::open(
            self.crypto,
            OAUTH_STATE_SCOPE,
            state,
            CONSENT_STATE_MAX_AGE_SECS,
            Utc::now().timestamp(),
        )
        .ok_or(AppError::InvalidState)?;

        if user_id != session_user {
            return Err(AppError::Forbidden(
                "authorization was started by another user".into(),
            ));
        }

        let tokens = self.provider.exchange_code(code, self.redirect_uri).await?;
        let refresh_token = tokens.refresh_token.clone();
        if refresh_token.is_none() {
            warn!(user_id, "{} returned no refresh token", self.provider.id());
        }

        let credential = Credential::from_token_set(tokens, Utc::now());
        let record_id = self
            .store
            .insert_token(user_id, &credential.to_blob()?, refresh_token.as_deref())
            .await?;

        info!(user_id, record_id, "stored new Drive token");
        Ok(record_id)
    }

    fn authorization_required(&self, user_id: i64, reconnect: bool) -> AppError {
        match self.consent_url(user_id) {
            Ok(consent_url) => AppError::AuthorizationRequired {
                consent_url,
                reconnect,
            },
            Err(e) => e,
        }
    }
}
