//! SQLite-backed store for users and their Drive OAuth tokens.
//!
//! Tables:
//! - `users`: login identities with Argon2 password hashes
//! - `drive_tokens`: encrypted token pairs, newest row per user wins

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::warn;

use super::CredentialStore;
use crate::crypto::CryptoEngine;
use crate::error::AppError;

/// Token store backed by SQLite.
pub struct TokenStore {
    pool: SqlitePool,
    crypto: CryptoEngine,
}

impl TokenStore {
    pub async fn new(db_url: &str, crypto: CryptoEngine) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(db_url)
            .map_err(|e| AppError::Database(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own database.
        let max_connections = if db_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open SQLite database: {e}")))?;

        Ok(Self { pool, crypto })
    }

    /// Same database, different keys.
    #[cfg(test)]
    pub(crate) fn with_crypto(&self, crypto: CryptoEngine) -> Self {
        Self {
            pool: self.pool.clone(),
            crypto,
        }
    }

    /// Create tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drive_tokens (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(id),
                access_token    TEXT NOT NULL,
                refresh_token   TEXT,
                created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_drive_tokens_user ON drive_tokens(user_id, id DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a user. The hash must already be a PHC string.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::Conflict(format!("user '{username}' already exists")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| User {
            id: row.get(0),
            username: row.get(1),
            password_hash: row.get(2),
        }))
    }

    fn seal_refresh(&self, refresh_token: Option<&str>) -> Result<Option<String>, AppError> {
        refresh_token
            .filter(|rt| !rt.is_empty())
            .map(|rt| self.crypto.encrypt(rt))
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for TokenStore {
    async fn get_latest_token(&self, user_id: i64) -> Result<Option<TokenRecord>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, access_token, refresh_token, created_at
            FROM drive_tokens
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let id: i64 = row.try_get(0)?;
        let enc_access: String = row.try_get(2)?;
        let enc_refresh: Option<String> = row.try_get(3)?;

        // A value sealed under another MASTER_KEY reads as unusable rather
        // than failing the request, so the user can re-authorize.
        let access_token = self.crypto.decrypt(&enc_access).unwrap_or_else(|e| {
            warn!(record_id = id, "access token undecryptable: {e}");
            String::new()
        });
        let refresh_token = enc_refresh
            .filter(|rt| !rt.is_empty())
            .and_then(|rt| match self.crypto.decrypt(&rt) {
                Ok(rt) => Some(rt),
                Err(e) => {
                    warn!(record_id = id, "refresh token undecryptable: {e}");
                    None
                }
            });

        Ok(Some(TokenRecord {
            id,
            user_id: row.try_get(1)?,
            access_token,
            refresh_token,
            created_at: row.try_get(4)?,
        }))
    }

    async fn update_access_token(&self, record_id: i64, blob: &str) -> Result<(), AppError> {
        let enc_access = self.crypto.encrypt(blob)?;

        let affected = sqlx::query("UPDATE drive_tokens SET access_token = ? WHERE id = ?")
            .bind(&enc_access)
            .bind(record_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound("token record".into()));
        }

        Ok(())
    }

    async fn insert_token(
        &self,
        user_id: i64,
        blob: &str,
        refresh_token: Option<&str>,
    ) -> Result<i64, AppError> {
        let enc_access = self.crypto.encrypt(blob)?;
        let enc_refresh = self.seal_refresh(refresh_token)?;

        let done = sqlx::query(
            r#"
            INSERT INTO drive_tokens (user_id, access_token, refresh_token, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&enc_access)
        .bind(&enc_refresh)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(done.last_insert_rowid())
    }
}

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// A persisted token pair. `access_token` is the plaintext credential blob,
/// empty when the stored value could not be decrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}
