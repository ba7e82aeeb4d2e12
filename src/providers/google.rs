use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::traits::{OAuthProvider, TokenSet};
use crate::error::AppError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full Drive access: listing, metadata, download and thumbnails.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Google OAuth 2.0 provider.
///
/// Consent is requested with `access_type=offline` and a forced
/// `select_account consent` prompt so Google always hands back a refresh token.
/// Token lifetime: 1 hour.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    auth_endpoint: String,
    token_endpoint: String,
    http: reqwest::Client,
}

// Raw token response from Google's token endpoint
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "bearer")]
    token_type: String,
    expires_in: Option<u64>,
    scope: Option<String>,
}

fn bearer() -> String {
    "Bearer".into()
}

impl From<GoogleTokenResponse> for TokenSet {
    fn from(resp: GoogleTokenResponse) -> Self {
        TokenSet {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            token_type: resp.token_type,
            expires_in: resp.expires_in,
            scope: resp.scope,
        }
    }
}

impl GoogleProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(client_id, client_secret, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        auth_endpoint: &str,
        token_endpoint: &str,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            auth_endpoint: auth_endpoint.to_string(),
            token_endpoint: token_endpoint.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
    ) -> Result<GoogleTokenResponse, String> {
        let resp = self
            .http
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("{status} - {body}"));
        }

        resp.json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn default_scopes(&self) -> Vec<String> {
        vec![DRIVE_SCOPE.into()]
    }

    fn auth_url(&self, scopes: &[String], state: &str, redirect_uri: &str) -> String {
        let scope = scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "select_account consent"),
        ];

        match Url::parse_with_params(&self.auth_endpoint, &params) {
            Ok(url) => url.to_string(),
            // The endpoint is a constant or a test server URL.
            Err(_) => {
                let query: String = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(params)
                    .finish();
                format!("{}?{}", self.auth_endpoint, query)
            }
        }
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, AppError> {
        let resp = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(|e| AppError::ProviderError(format!("Google token exchange failed: {e}")))?;

        Ok(resp.into())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        let resp = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(|e| AppError::RefreshFailed(format!("Google refresh failed: {e}")))?;

        Ok(resp.into())
    }
}
