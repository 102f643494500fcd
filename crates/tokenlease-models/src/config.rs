//! External-service configuration.
//!
//! A mount holds at most one [`Configuration`]. Writes arrive as a
//! [`ConfigPatch`] that is merged onto the stored value (or a blank one) and
//! then validated as a whole. Reads go through [`ConfigView`], which has no
//! password field at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Credentials and endpoint used to reach the external token API.
///
/// The `Debug` implementation redacts the password.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Account used to authenticate against the external API.
    pub username: String,
    /// Secret for `username`. Never rendered by [`ConfigView`].
    pub password: String,
    /// Base URL of the external API.
    pub url: String,
}

impl Configuration {
    /// Build a configuration from its three fields.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            url: url.into(),
        }
    }

    /// Check that username, password and url are all non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ModelError> {
        let missing = |field| ModelError::MissingField {
            field,
            context: "configuration",
        };

        if self.username.is_empty() {
            return Err(missing("username"));
        }
        if self.password.is_empty() {
            return Err(missing("password"));
        }
        if self.url.is_empty() {
            return Err(missing("url"));
        }
        Ok(())
    }

    /// The public projection of this configuration.
    pub fn view(&self) -> ConfigView {
        ConfigView {
            username: self.username.clone(),
            url: self.url.clone(),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ConfigPatch
// ---------------------------------------------------------------------------

/// A partial configuration write. Absent fields keep their stored value.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    /// New username, if supplied.
    #[serde(default)]
    pub username: Option<String>,
    /// New password, if supplied.
    #[serde(default)]
    pub password: Option<String>,
    /// New URL, if supplied.
    #[serde(default)]
    pub url: Option<String>,
}

impl ConfigPatch {
    /// Merge the supplied fields onto `base`.
    pub fn apply(self, mut base: Configuration) -> Configuration {
        if let Some(username) = self.username {
            base.username = username;
        }
        if let Some(password) = self.password {
            base.password = password;
        }
        if let Some(url) = self.url {
            base.url = url;
        }
        base
    }
}

impl From<Configuration> for ConfigPatch {
    fn from(c: Configuration) -> Self {
        Self {
            username: Some(c.username),
            password: Some(c.password),
            url: Some(c.url),
        }
    }
}

impl fmt::Debug for ConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPatch")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ConfigView
// ---------------------------------------------------------------------------

/// What a config read returns: username and url, no password.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigView {
    /// Configured username.
    pub username: String,
    /// Configured URL.
    pub url: String,
}
