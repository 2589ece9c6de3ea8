//! Employee registry handlers.
//!
//! All routes except the public picture redirect require an authenticated
//! admin (see `auth::principal`). Employees are soft-deleted: flagged rows
//! are excluded from default listings and lookups but stay in storage and
//! can be restored.

pub(crate) mod picture;
pub(crate) mod records;
pub(crate) mod search;
mod storage;
pub(crate) mod types;

use rand::{distributions::Alphanumeric, Rng};

/// External identifiers look like `EM-042137`.
pub(crate) const EMPLOYEE_ID_PREFIX: &str = "EM-";

/// Placeholder avatar for employees without an uploaded picture.
/// Must match the column default in the schema.
pub(crate) const DEFAULT_AVATAR_URL: &str = "https://static.rosterhq.dev/avatars/default.png";

const ONE_TIME_PASSWORD_LENGTH: usize = 8;

/// Generate a candidate external id. Collisions are handled by the insert
/// retry loop in storage, not here.
fn generate_employee_id() -> String {
    let digits: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{EMPLOYEE_ID_PREFIX}{digits:06}")
}

/// Generate the initial password shown once in the create response.
fn generate_one_time_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ONE_TIME_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_id_matches_format() {
        for _ in 0..50 {
            let id = generate_employee_id();
            assert_eq!(id.len(), 9);
            assert!(id.starts_with("EM-"));
            assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn one_time_password_is_eight_alphanumerics() {
        for _ in 0..50 {
            let password = generate_one_time_password();
            assert_eq!(password.chars().count(), 8);
            assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
