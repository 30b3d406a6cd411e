//! Credentials and sessions: password hashing, the installation secret, and
//! the signed session tokens derived from it.

pub mod password;
pub mod secret;
pub mod session;

pub use secret::{SECRET_LENGTH, SessionSecret};
pub use session::{SESSION_COOKIE, SessionAuthenticator, SessionKeys, UserIdentity};
