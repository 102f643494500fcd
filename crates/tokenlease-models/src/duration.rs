//! Serde helpers that encode [`Duration`]s as whole seconds.
//!
//! Used with `#[serde(with = "...")]` on role and credential fields so that
//! stored entries and host responses carry plain integers.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` ⇄ `u64` seconds.
pub mod secs {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    /// Serialize a duration as whole seconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    /// Deserialize whole seconds into a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// `Option<Duration>` ⇄ `Option<u64>` seconds.
pub mod option_secs {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    /// Serialize an optional duration as optional whole seconds.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize optional whole seconds into an optional duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
