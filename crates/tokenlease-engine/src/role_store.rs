//! Persistence of role definitions under `role/{name}`.

use tokenlease_models::{RoleEntry, RoleName, RolePatch};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::storage::{ROLE_PREFIX, Storage, get_json, put_json};

/// Reads and writes role entries. Roles are independent keys, so every
/// operation is a single-key storage call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleStore;

fn role_key(name: &RoleName) -> String {
    format!("{ROLE_PREFIX}{name}")
}

impl RoleStore {
    /// Role names in lexical order; empty when none exist.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub async fn list(storage: &dyn Storage) -> Result<Vec<String>, EngineError> {
        storage
            .list(ROLE_PREFIX)
            .await
            .map_err(|e| EngineError::storage("list", ROLE_PREFIX, e))
    }

    /// Load a role by name.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] for an empty or malformed name, or a
    /// storage failure. A missing role is `Ok(None)`.
    pub async fn read(storage: &dyn Storage, name: &str) -> Result<Option<RoleEntry>, EngineError> {
        let name = RoleName::new(name)?;
        get_json(storage, &role_key(&name)).await
    }

    /// Merge `patch` onto the stored role (or a blank one) and persist it.
    ///
    /// The merged role must have a username and, if `max_ttl` is non-zero,
    /// `ttl <= max_ttl`. A rejected write leaves storage untouched.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`], [`EngineError::Validation`] or a
    /// storage failure.
    pub async fn write(
        storage: &dyn Storage,
        name: &str,
        patch: RolePatch,
    ) -> Result<RoleEntry, EngineError> {
        let name = RoleName::new(name)?;
        let key = role_key(&name);

        let base = get_json(storage, &key)
            .await?
            .unwrap_or_else(|| RoleEntry::blank(name.clone()));
        let merged = patch.apply(base);

        if let Err(e) = merged.validate() {
            warn!(role = %name, error = %e, "rejected role write");
            return Err(e.into());
        }

        put_json(storage, &key, &merged).await?;
        info!(
            role = %name,
            username = %merged.username,
            ttl = merged.ttl.as_secs(),
            max_ttl = merged.max_ttl.as_secs(),
            "role written"
        );
        Ok(merged)
    }

    /// Remove a role. Deleting a missing role succeeds.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] or a storage failure.
    pub async fn delete(storage: &dyn Storage, name: &str) -> Result<(), EngineError> {
        let name = RoleName::new(name)?;
        let key = role_key(&name);
        storage
            .delete(&key)
            .await
            .map_err(|e| EngineError::storage("delete", &key, e))?;
        info!(role = %name, "role deleted");
        Ok(())
    }
}
