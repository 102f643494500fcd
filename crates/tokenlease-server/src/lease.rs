//! Host-side lease bookkeeping.
//!
//! The engine leaves zero TTLs to the host and never persists issued
//! tokens. This module resolves role TTLs against the system defaults and
//! keeps the internal half of each credential so the lease can be revoked.
//! Expired leases are dropped lazily whenever the table is touched; nothing
//! signs their tokens out.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokenlease_models::{CredentialResponse, InternalCredential};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// System lease defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    /// TTL used when a role's TTL is zero.
    pub default_ttl: Duration,
    /// Ceiling for every lease; used directly when a role's max TTL is zero.
    pub max_ttl: Duration,
}

impl LeasePolicy {
    /// Effective `(ttl, max_ttl)` for a credential carrying the role's
    /// `ttl` / `max_ttl`.
    pub fn resolve(&self, ttl: Duration, max_ttl: Duration) -> (Duration, Duration) {
        let max_ttl = if max_ttl.is_zero() {
            self.max_ttl
        } else {
            max_ttl.min(self.max_ttl)
        };
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        (ttl.min(max_ttl), max_ttl)
    }
}

/// A live lease.
#[derive(Debug, Clone)]
pub struct LeaseRecord {
    /// Role the credential was issued for.
    pub role: String,
    /// Kept for revocation.
    pub internal: InternalCredential,
    /// When the credential was issued.
    pub issued_at: DateTime<Utc>,
    /// Effective TTL.
    pub ttl: Duration,
    /// Effective ceiling.
    pub max_ttl: Duration,
}

impl LeaseRecord {
    /// When the lease lapses if never renewed.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }

    /// Public metadata for this lease.
    pub fn info(&self, lease_id: Uuid) -> LeaseInfo {
        LeaseInfo {
            lease_id,
            role: self.role.clone(),
            lease_duration: self.ttl.as_secs(),
            max_ttl: self.max_ttl.as_secs(),
            issued_at: self.issued_at,
            expires_at: self.expires_at(),
        }
    }
}

/// Lease metadata returned alongside the public credential.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaseInfo {
    /// Lease handle for later revocation.
    pub lease_id: Uuid,
    /// Role the credential was issued for.
    pub role: String,
    /// Effective TTL in seconds.
    pub lease_duration: u64,
    /// Effective ceiling in seconds.
    pub max_ttl: u64,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// When the lease lapses if never renewed.
    pub expires_at: DateTime<Utc>,
}

/// In-memory lease table.
#[derive(Debug, Default)]
pub struct LeaseTable {
    leases: Mutex<HashMap<Uuid, LeaseRecord>>,
}

impl LeaseTable {
    /// Record a freshly issued credential under a new lease id.
    pub async fn register(
        &self,
        role: &str,
        credential: &CredentialResponse,
        policy: &LeasePolicy,
    ) -> LeaseInfo {
        let (ttl, max_ttl) = policy.resolve(credential.ttl, credential.max_ttl);
        let lease_id = Uuid::new_v4();
        let record = LeaseRecord {
            role: role.to_string(),
            internal: credential.internal.clone(),
            issued_at: Utc::now(),
            ttl,
            max_ttl,
        };
        let info = record.info(lease_id);

        let mut leases = self.leases.lock().await;
        purge_expired(&mut leases);
        leases.insert(lease_id, record);
        info
    }

    /// Look up a live lease. Expired leases are gone.
    pub async fn get(&self, lease_id: &Uuid) -> Option<LeaseRecord> {
        let mut leases = self.leases.lock().await;
        purge_expired(&mut leases);
        leases.get(lease_id).cloned()
    }

    /// Forget a lease. Returns whether it existed.
    pub async fn remove(&self, lease_id: &Uuid) -> bool {
        self.leases.lock().await.remove(lease_id).is_some()
    }
}

fn purge_expired(leases: &mut HashMap<Uuid, LeaseRecord>) {
    let now = Utc::now();
    let before = leases.len();
    leases.retain(|_, record| !record.is_expired(now));

    let dropped = before - leases.len();
    if dropped > 0 {
        debug!(dropped, "expired leases dropped");
    }
}
