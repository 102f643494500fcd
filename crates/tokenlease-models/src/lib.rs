#![deny(missing_docs)]

//! # tokenlease models
//!
//! Core data types for the tokenlease dynamic-secrets engine.
//!
//! ## Data hierarchy
//!
//! ```text
//! storage
//! ├── "config"        → Configuration   (username, password, url)
//! └── "role/{name}"   → RoleEntry       (username, ttl, max_ttl)
//!
//! issuance
//! ExternalToken ──▶ CredentialResponse
//!                   ├── PublicCredential   (returned to the caller)
//!                   ├── InternalCredential (kept by the host for revocation)
//!                   └── ttl / max_ttl
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | External-service configuration, partial updates, public view |
//! | [`role`] | Role names, role entries, partial updates, public view |
//! | [`credential`] | Upstream tokens and the split credential response |
//! | [`operation`] | Operations a host may invoke on a path |
//! | [`duration`] | Serde helpers rendering durations as whole seconds |
//! | [`error`] | [`ModelError`] |

pub mod config;
pub mod credential;
pub mod duration;
pub mod error;
pub mod operation;
pub mod role;

// Re-export all public types at crate root for convenience.
pub use config::*;
pub use credential::*;
pub use error::*;
pub use operation::*;
pub use role::*;
