//! Wire types for the AuthDB portal HTTP API.
//!
//! This crate contains the serde-serializable shapes exchanged with the
//! portal: the login and refresh exchanges, paginated list envelopes, and
//! error bodies. Types here are pure data and change only when the wire
//! format changes.
//!
//! Higher-level session and dispatch logic lives in the `authdb` crate.

pub mod jwt;
pub mod login;
pub mod page;

pub use jwt::*;
pub use login::*;
pub use page::*;
