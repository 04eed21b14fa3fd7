//! Collaborator contracts consumed by the client.
//!
//! Fingerprint generation and device/browser context collection live outside this crate.
//! The client only consumes their results through these traits, so hosts can plug in a
//! real provider or a fixed value in tests.

pub mod device_context;
pub mod fingerprint;

pub use device_context::*;
pub use fingerprint::*;
