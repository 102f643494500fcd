//! Operations a host can invoke on a path.

use serde::{Deserialize, Serialize};

/// The kind of request the host is routing to a path handler.
///
/// `Create` and `Update` differ only where a handler cares whether the
/// target already exists (see the config path).
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read a single resource.
    Read,
    /// Write a resource that does not exist yet.
    Create,
    /// Write a resource that already exists.
    Update,
    /// Remove a resource.
    Delete,
    /// Enumerate resources under a prefix.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_lowercase() {
        use std::str::FromStr;
        use strum::IntoEnumIterator;

        for op in Operation::iter() {
            let s = op.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(Operation::from_str(&s).unwrap(), op);
        }
    }
}
