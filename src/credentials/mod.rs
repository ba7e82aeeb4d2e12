//! Drive credentials: the stored token blob and its lifecycle.

pub mod lifecycle;
pub mod token;

pub use lifecycle::TokenLifecycle;
pub use token::Credential;
