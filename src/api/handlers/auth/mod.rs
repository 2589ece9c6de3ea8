//! Admin account handlers and supporting modules.
//!
//! This module coordinates registration, login, session management, and the
//! password reset flow.
//!
//! ## Sessions
//!
//! A session is a random 32-byte token delivered in an `HttpOnly` cookie.
//! The database stores only a SHA-256 hash of the token plus its expiry, so
//! a leaked table never yields usable credentials. Expiry is checked on
//! every lookup; logout deletes the row and clears the cookie.
//!
//! ## Password Reset
//!
//! Reset tokens use the same hashed-at-rest scheme with a shorter lifetime.
//! The token table is keyed by admin id, so issuing a new token replaces
//! any previous one, and a successful reset consumes the token and revokes
//! all of that admin's sessions.

pub(crate) mod account;
pub(crate) mod principal;
pub(crate) mod reset;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
pub(crate) mod utils;

pub use state::AuthConfig;

/// Minimum accepted password length for admin accounts.
pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;
