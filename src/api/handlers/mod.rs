//! API handlers and shared utilities for Roster.
//!
//! This module organizes the service's route handlers and provides common
//! validation helpers used by both the account and employee endpoints.

pub mod auth;
pub mod employees;
pub mod health;
pub mod root;

use regex::Regex;

/// Maximum accepted length for admin and employee names.
pub const NAME_MAX_LENGTH: usize = 30;

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Names are required and capped at [`NAME_MAX_LENGTH`] characters.
pub fn valid_name(name: &str) -> bool {
    let length = name.chars().count();
    (1..=NAME_MAX_LENGTH).contains(&length)
}

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
