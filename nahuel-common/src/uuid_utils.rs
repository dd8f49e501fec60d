//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4 in the hyphenated text form stored in the database
pub fn generate_string() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
