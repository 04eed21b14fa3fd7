//! Credentials, auth-mode classification, secrets, and bearer token models.

pub mod credentials;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use secret::*;
pub use token::*;
