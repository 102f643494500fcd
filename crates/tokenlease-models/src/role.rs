//! Role definitions.
//!
//! A role binds a backing identity on the external service to a lease
//! policy. Roles are stored under `role/{name}` and written through
//! [`RolePatch`] merges, validated with [`RoleEntry::validate`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration;
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// RoleName
// ---------------------------------------------------------------------------

/// Validated, lower-cased role name.
///
/// A name is one or more ASCII word characters (`[A-Za-z0-9_]`), optionally
/// with `-` or `.` in the middle. Input is lower-cased before validation.
///
/// # Examples
///
/// ```
/// use tokenlease_models::RoleName;
///
/// let name = RoleName::new("Reader").unwrap();
/// assert_eq!(name.as_str(), "reader");
///
/// assert!(RoleName::new("").is_err());
/// assert!(RoleName::new("-leading").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Normalise and validate a role name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidRoleName`] if the name is empty or does
    /// not match the name pattern.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        let lowered = name.to_ascii_lowercase();
        let invalid = |reason| ModelError::InvalidRoleName {
            value: name.to_string(),
            reason,
        };

        let bytes = lowered.as_bytes();
        let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
            return Err(invalid("must not be empty"));
        };
        if !is_word(first) || !is_word(last) {
            return Err(invalid("must start and end with a letter, digit or underscore"));
        }
        if !bytes.iter().all(|&b| is_word(b) || b == b'-' || b == b'.') {
            return Err(invalid("may only contain letters, digits, '_', '-' and '.'"));
        }

        Ok(Self(lowered))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoleName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// RoleEntry
// ---------------------------------------------------------------------------

/// A stored role.
///
/// A zero `ttl` or `max_ttl` means "use the system default", which the host
/// resolves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleEntry {
    /// Role name; also the storage key suffix.
    pub name: RoleName,
    /// Identity on the external service that credentials are issued for.
    pub username: String,
    /// Default lease duration.
    #[serde(with = "duration::secs", default)]
    pub ttl: Duration,
    /// Maximum lease duration.
    #[serde(with = "duration::secs", default)]
    pub max_ttl: Duration,
}

impl RoleEntry {
    /// A blank role, the merge base for a first write.
    pub fn blank(name: RoleName) -> Self {
        Self {
            name,
            username: String::new(),
            ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
        }
    }

    /// Check the role invariants: `username` is set and, when `max_ttl` is
    /// non-zero, `ttl <= max_ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingField`] or [`ModelError::TtlExceedsMaxTtl`].
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.username.is_empty() {
            return Err(ModelError::MissingField {
                field: "username",
                context: "role",
            });
        }
        if !self.max_ttl.is_zero() && self.ttl > self.max_ttl {
            return Err(ModelError::TtlExceedsMaxTtl {
                ttl: self.ttl,
                max_ttl: self.max_ttl,
            });
        }
        Ok(())
    }

    /// The public projection of this role.
    pub fn view(&self) -> RoleView {
        RoleView {
            username: self.username.clone(),
            ttl: self.ttl,
            max_ttl: self.max_ttl,
        }
    }
}

// ---------------------------------------------------------------------------
// RolePatch
// ---------------------------------------------------------------------------

/// A partial role write. Durations are given in whole seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    /// New backing username, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New default TTL, if supplied.
    #[serde(
        default,
        with = "duration::option_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<Duration>,
    /// New maximum TTL, if supplied.
    #[serde(
        default,
        with = "duration::option_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_ttl: Option<Duration>,
}

impl RolePatch {
    /// Merge the supplied fields onto `base`.
    pub fn apply(self, mut base: RoleEntry) -> RoleEntry {
        if let Some(username) = self.username {
            base.username = username;
        }
        if let Some(ttl) = self.ttl {
            base.ttl = ttl;
        }
        if let Some(max_ttl) = self.max_ttl {
            base.max_ttl = max_ttl;
        }
        base
    }
}

// ---------------------------------------------------------------------------
// RoleView
// ---------------------------------------------------------------------------

/// What a role read returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleView {
    /// Backing username.
    pub username: String,
    /// Default TTL, in seconds on the wire.
    #[serde(with = "duration::secs")]
    pub ttl: Duration,
    /// Maximum TTL, in seconds on the wire.
    #[serde(with = "duration::secs")]
    pub max_ttl: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(ttl: u64, max_ttl: u64) -> RoleEntry {
        RoleEntry {
            name: RoleName::new("reader").unwrap(),
            username: "svc-reader".into(),
            ttl: Duration::from_secs(ttl),
            max_ttl: Duration::from_secs(max_ttl),
        }
    }

    // -- names -----------------------------------------------------------

    #[test]
    fn name_is_lowercased() {
        assert_eq!(RoleName::new("My-Role.v2").unwrap().as_str(), "my-role.v2");
    }

    #[test]
    fn single_character_name_is_valid() {
        assert!(RoleName::new("a").is_ok());
        assert!(RoleName::new("_").is_ok());
    }

    #[test]
    fn invalid_names_are_rejected() {
        for bad in ["", "-a", "a-", ".a", "a.", "a/b", "a b", "ré"] {
            assert!(
                matches!(RoleName::new(bad), Err(ModelError::InvalidRoleName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn name_deserialization_validates() {
        assert!(serde_json::from_str::<RoleName>(r#""ok""#).is_ok());
        assert!(serde_json::from_str::<RoleName>(r#""""#).is_err());
    }

    // -- validation -------------------------------------------------------

    #[test]
    fn ttl_within_max_ttl_is_valid() {
        assert!(role(3600, 7200).validate().is_ok());
        assert!(role(7200, 7200).validate().is_ok());
    }

    #[test]
    fn zero_max_ttl_allows_any_ttl() {
        assert!(role(1_000_000, 0).validate().is_ok());
    }

    #[test]
    fn zero_ttl_with_max_ttl_is_valid() {
        assert!(role(0, 50).validate().is_ok());
    }

    #[test]
    fn ttl_above_max_ttl_is_rejected() {
        assert_eq!(
            role(100, 50).validate(),
            Err(ModelError::TtlExceedsMaxTtl {
                ttl: Duration::from_secs(100),
                max_ttl: Duration::from_secs(50),
            })
        );
    }

    #[test]
    fn missing_username_is_rejected() {
        let mut r = role(1, 2);
        r.username.clear();
        assert!(matches!(
            r.validate(),
            Err(ModelError::MissingField { field: "username", .. })
        ));
    }

    // -- patches ----------------------------------------------------------

    #[test]
    fn patch_merges_onto_existing_role() {
        let patch = RolePatch {
            ttl: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let merged = patch.apply(role(3600, 7200));
        assert_eq!(merged.username, "svc-reader");
        assert_eq!(merged.ttl, Duration::from_secs(60));
        assert_eq!(merged.max_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn patch_reads_seconds() {
        let patch: RolePatch =
            serde_json::from_str(r#"{"username":"svc","ttl":3600}"#).unwrap();
        assert_eq!(patch.username.as_deref(), Some("svc"));
        assert_eq!(patch.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(patch.max_ttl, None);
    }

    #[test]
    fn view_renders_seconds() {
        let json = serde_json::to_value(role(3600, 7200).view()).unwrap();
        assert_eq!(json["username"], "svc-reader");
        assert_eq!(json["ttl"], 3600);
        assert_eq!(json["max_ttl"], 7200);
    }

    #[test]
    fn stored_entry_survives_json() {
        let original = role(3600, 7200);
        let bytes = serde_json::to_vec(&original).unwrap();
        let decoded: RoleEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }
}
