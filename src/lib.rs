pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod drive;
pub mod error;
pub mod providers;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::AppError;

use std::sync::Arc;

use credentials::TokenLifecycle;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub store: store::TokenStore,
    pub crypto: crypto::CryptoEngine,
    pub provider: Box<dyn providers::OAuthProvider>,
    pub drive: drive::DriveClient,
    redirect_uri: String,
}

impl AppState {
    pub fn new(
        config: Config,
        store: store::TokenStore,
        crypto: crypto::CryptoEngine,
        provider: Box<dyn providers::OAuthProvider>,
        drive: drive::DriveClient,
    ) -> Self {
        let redirect_uri = config.callback_url();
        Self {
            config,
            store,
            crypto,
            provider,
            drive,
            redirect_uri,
        }
    }

    /// Token lifecycle bound to this state's store, provider and keys.
    pub fn lifecycle(&self) -> TokenLifecycle<'_> {
        TokenLifecycle::new(
            &self.store,
            self.provider.as_ref(),
            &self.crypto,
            &self.redirect_uri,
        )
    }
}

pub type SharedState = Arc<AppState>;
