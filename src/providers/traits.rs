use async_trait::async_trait;

use crate::error::AppError;

/// A set of tokens returned from an OAuth provider after code exchange or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// The OAuth authorization-code flow as seen by the token lifecycle.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier (e.g., "google").
    fn id(&self) -> &str;

    /// Scopes requested when sending the user to consent.
    fn default_scopes(&self) -> Vec<String>;

    /// Build the consent URL the user must visit.
    ///
    /// - `scopes`: The OAuth scopes to request.
    /// - `state`: An opaque, HMAC-signed state string for CSRF protection.
    /// - `redirect_uri`: The callback URL registered with the provider.
    fn auth_url(&self, scopes: &[String], state: &str, redirect_uri: &str) -> String;

    /// Exchange an authorization code for an access token (and usually a refresh token).
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, AppError>;

    /// Refresh an expired access token using a refresh token.
    ///
    /// Fails with [`AppError::RefreshFailed`] when the provider rejects the grant.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError>;
}
