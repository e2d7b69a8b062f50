//! UUID generation helpers.

use uuid::Uuid;

/// Generates a new random UUID as a string.
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Returns true if the string parses as a UUID.
#[must_use]
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}
