use anyhow::{Context, Result};

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Public URL of this service, used to build the OAuth redirect URI.
    pub base_url: String,

    // ── Database (SQLite) ───────────────────────────────────────────────
    pub database_url: String,

    // ── Crypto ──────────────────────────────────────────────────────────
    /// 32-byte base64-encoded key for AES-256-GCM encryption of stored tokens.
    pub master_key: String,
    /// 32-byte base64-encoded HMAC key for session cookies and OAuth state.
    pub session_secret: String,

    // ── Sessions ────────────────────────────────────────────────────────
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,

    // ── Google OAuth app ────────────────────────────────────────────────
    pub google_client_id: String,
    pub google_client_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("Invalid PORT")?,
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into())
                .trim_end_matches('/')
                .to_string(),

            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://drive-manager.db?mode=rwc".into()),

            master_key: std::env::var("MASTER_KEY")
                .context("MASTER_KEY is required (32 bytes, base64)")?,
            session_secret: std::env::var("SESSION_SECRET")
                .context("SESSION_SECRET is required (32 bytes, base64)")?,

            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "12".into())
                .parse()
                .context("Invalid SESSION_TTL_HOURS")?,
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID is required")?,
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET is required")?,
        })
    }

    /// OAuth redirect URI registered with Google.
    pub fn callback_url(&self) -> String {
        format!("{}/oauth/callback", self.base_url)
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl_hours * 3600
    }
}
