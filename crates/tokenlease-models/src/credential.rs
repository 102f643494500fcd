//! Issued credentials.
//!
//! An [`ExternalToken`] comes back from the external service on sign-in. It
//! is split into a [`CredentialResponse`]: the [`PublicCredential`] half is
//! handed to the requester, the [`InternalCredential`] half is retained by
//! the host so it can sign the token out later. The two halves are separate
//! types so nothing outside the listed fields can leak into either one.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration;
use crate::role::RoleEntry;

// ---------------------------------------------------------------------------
// ExternalToken
// ---------------------------------------------------------------------------

/// Result of a sign-in against the external service.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExternalToken {
    /// Bearer token value.
    pub token: String,
    /// Identifier the external service assigned to the token.
    pub token_id: String,
    /// Identifier of the signed-in user.
    pub user_id: String,
    /// Username the token was issued for.
    pub username: String,
}

impl fmt::Debug for ExternalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalToken")
            .field("token", &"<redacted>")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Response halves
// ---------------------------------------------------------------------------

/// Client-visible half of an issued credential.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicCredential {
    /// Bearer token value.
    pub token: String,
    /// External token identifier.
    pub token_id: String,
    /// External user identifier.
    pub user_id: String,
    /// External username.
    pub username: String,
}

impl fmt::Debug for PublicCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicCredential")
            .field("token", &"<redacted>")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}

/// Host-retained half of an issued credential: everything needed to revoke.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InternalCredential {
    /// Token to sign out of the external service on revocation.
    pub token: String,
}

impl fmt::Debug for InternalCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialResponse
// ---------------------------------------------------------------------------

/// A freshly issued, lease-bounded credential.
///
/// `ttl` and `max_ttl` are copied from the role; zero leaves the choice to
/// the host's defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialResponse {
    /// Returned to the requester.
    pub public: PublicCredential,
    /// Retained by the host for revocation; never echoed back.
    pub internal: InternalCredential,
    /// Default lease duration.
    #[serde(with = "duration::secs")]
    pub ttl: Duration,
    /// Lease ceiling.
    #[serde(with = "duration::secs")]
    pub max_ttl: Duration,
}

impl CredentialResponse {
    /// Split `token` into its public and internal halves and attach the
    /// role's lease policy.
    pub fn from_token(token: ExternalToken, role: &RoleEntry) -> Self {
        let internal = InternalCredential {
            token: token.token.clone(),
        };
        Self {
            public: PublicCredential {
                token: token.token,
                token_id: token.token_id,
                user_id: token.user_id,
                username: token.username,
            },
            internal,
            ttl: role.ttl,
            max_ttl: role.max_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleName;

    fn token() -> ExternalToken {
        ExternalToken {
            token: "tok-123".into(),
            token_id: "tid-1".into(),
            user_id: "uid-1".into(),
            username: "svc-reader".into(),
        }
    }

    fn role() -> RoleEntry {
        RoleEntry {
            name: RoleName::new("reader").unwrap(),
            username: "svc-reader".into(),
            ttl: Duration::from_secs(3600),
            max_ttl: Duration::from_secs(7200),
        }
    }

    #[test]
    fn response_splits_public_and_internal() {
        let resp = CredentialResponse::from_token(token(), &role());
        assert_eq!(resp.public.token, "tok-123");
        assert_eq!(resp.public.token_id, "tid-1");
        assert_eq!(resp.public.user_id, "uid-1");
        assert_eq!(resp.public.username, "svc-reader");
        assert_eq!(resp.internal.token, "tok-123");
        assert_eq!(resp.ttl, Duration::from_secs(3600));
        assert_eq!(resp.max_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn internal_half_serializes_only_the_token() {
        let resp = CredentialResponse::from_token(token(), &role());
        let internal = serde_json::to_value(&resp.internal).unwrap();
        let keys: Vec<_> = internal.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["token"]);
    }

    #[test]
    fn public_half_has_exactly_the_listed_fields() {
        let resp = CredentialResponse::from_token(token(), &role());
        let public = serde_json::to_value(&resp.public).unwrap();
        let mut keys: Vec<_> = public.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["token", "token_id", "user_id", "username"]);
    }

    #[test]
    fn debug_never_prints_token() {
        let resp = CredentialResponse::from_token(token(), &role());
        assert!(!format!("{resp:?}").contains("tok-123"));
        assert!(!format!("{:?}", token()).contains("tok-123"));
    }
}
