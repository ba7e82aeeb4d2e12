//! Login sessions and password verification.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::current_user;
