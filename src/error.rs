use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::api::views::{ConnectPage, ErrorPage};

/// Unified error type for the drive manager.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Session / consent ───────────────────────────────────────────────
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Google Drive authorization required")]
    AuthorizationRequired {
        consent_url: String,
        /// A token row existed but could not be used.
        reconnect: bool,
    },

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ── Provider / remote API ───────────────────────────────────────────
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("OAuth provider error: {0}")]
    ProviderError(String),

    #[error("Drive API error: {0}")]
    RemoteApi(String),

    // ── Request / resource ──────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AppError::Database(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {e}"))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationRequired { .. } => StatusCode::OK,
            AppError::InvalidState => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RefreshFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::RemoteApi(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let page = match &self {
            // The login form lives at the index route.
            AppError::NotAuthenticated => return Redirect::to("/").into_response(),
            AppError::AuthorizationRequired {
                consent_url,
                reconnect,
            } => ConnectPage {
                consent_url,
                reconnect: *reconnect,
            }
            .render(),
            _ => {
                if status.is_server_error() {
                    tracing::error!("{self}");
                }
                let message = self.to_string();
                ErrorPage {
                    status: status.as_u16(),
                    message: &message,
                }
                .render()
            }
        };

        match page {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {e}");
                (status, self.to_string()).into_response()
            }
        }
    }
}
