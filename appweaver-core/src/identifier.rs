//! ID generation utilities.
//!
//! Prefixed UUID v4 identifiers for intents, error records, and sessions.

use uuid::Uuid;

/// Generate a unique intent ID.
///
/// # Example
///
/// ```rust
/// use appweaver_core::identifier::generate_intent_id;
///
/// let id = generate_intent_id();
/// assert!(id.starts_with("intent_"));
/// ```
#[must_use]
pub fn generate_intent_id() -> String {
    format!("intent_{}", Uuid::new_v4().simple())
}

/// Generate a unique error record ID.
///
/// Used when a failure has no associated intent to borrow an ID from.
#[must_use]
pub fn generate_error_id() -> String {
    format!("err_{}", Uuid::new_v4().simple())
}

/// Generate a unique session ID.
#[must_use]
pub fn generate_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert!(generate_intent_id().starts_with("intent_"));
        assert!(generate_error_id().starts_with("err_"));
        assert!(generate_session_id().starts_with("session_"));
    }

    #[test]
    fn test_uniqueness() {
        assert_ne!(generate_intent_id(), generate_intent_id());
    }
}
