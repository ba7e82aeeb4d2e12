mod google;
mod traits;

pub use google::{GoogleProvider, DRIVE_SCOPE};
pub use traits::{OAuthProvider, TokenSet};
