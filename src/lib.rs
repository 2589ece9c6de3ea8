//! # Roster (Employee Administration API)
//!
//! `roster` is a small administration service: admin operator accounts
//! (register / login / password reset) managing a roster of employee
//! records over a REST API.
//!
//! ## Accounts & Sessions
//!
//! Admin passwords are stored as Argon2id hashes. Sessions are random
//! opaque tokens delivered in an `HttpOnly` cookie; the database stores
//! only a SHA-256 hash of the token together with its expiry. Password
//! reset uses the same persisted-token scheme with a shorter lifetime and
//! single-use consumption.
//!
//! ## Employee Registry
//!
//! Employees carry a generated external identifier (`EM-` + six digits),
//! a unique email, and a manager reference to the admin that created
//! them. Deletion is soft: records are flagged and excluded from default
//! listings but retained in storage and restorable.
//!
//! ## Collaborators
//!
//! Outbound email goes through a database-backed outbox drained by a
//! background worker. Profile pictures are stored in an external object
//! store; the service records only the returned URL.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
