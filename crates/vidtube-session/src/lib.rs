//! Session and credential management for vidtube.
//!
//! Issues, verifies, rotates and revokes the access/refresh credential pair,
//! and hashes account passwords. Persistence goes through any
//! [`vidtube_core::store::DocumentStore`]; this crate is the only writer of a
//! user's `refreshToken` field.

pub mod error;
pub mod password;
pub mod token;

pub use error::{Error, Result};
pub use password::{hash_password, verify_password};
pub use token::{TokenConfig, TokenManager, TokenPair, Viewer};
