//! Credential store: users and their persisted Drive token pairs.

pub mod db;

pub use db::{TokenRecord, TokenStore, User};

use async_trait::async_trait;

use crate::error::AppError;

/// The persistence operations the token lifecycle depends on.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Newest token row for the user, with the blob and refresh token decrypted.
    async fn get_latest_token(&self, user_id: i64) -> Result<Option<TokenRecord>, AppError>;

    /// Overwrite only the access-token blob of an existing row.
    async fn update_access_token(&self, record_id: i64, blob: &str) -> Result<(), AppError>;

    /// Persist a freshly consented token pair. Returns the new row id.
    async fn insert_token(
        &self,
        user_id: i64,
        blob: &str,
        refresh_token: Option<&str>,
    ) -> Result<i64, AppError>;
}
