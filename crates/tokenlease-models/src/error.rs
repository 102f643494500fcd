//! Error types for the `tokenlease-models` crate.
//!
//! All validation functions and fallible constructors in this crate return
//! variants of [`ModelError`]. Messages never include secret values.

use std::time::Duration;

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A required field was empty after merging a partial update.
    #[error("missing {field} in {context}")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
        /// What was being validated (`configuration`, `role`).
        context: &'static str,
    },

    /// A role's default TTL exceeds its maximum TTL.
    #[error("ttl cannot be greater than max_ttl ({}s > {}s)", ttl.as_secs(), max_ttl.as_secs())]
    TtlExceedsMaxTtl {
        /// Requested default TTL.
        ttl: Duration,
        /// Requested maximum TTL.
        max_ttl: Duration,
    },

    /// A role name was empty or contained characters outside the name pattern.
    #[error("invalid role name \"{value}\": {reason}")]
    InvalidRoleName {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: &'static str,
    },
}
