//! contentvc core library.
//!
//! This crate provides multi-tenant content version control: configuration,
//! SQLite persistence, tenant-scoped version stores, line diffing, conflict
//! detection, merging and resolution, a comparison cache, and restores.

pub mod cache;
pub mod config;
pub mod conflict;
pub mod db;
pub mod diff;
pub mod errors;
pub mod models;
pub mod restore;
pub mod service;
pub mod store;

// Re-exports for convenience.
pub use cache::ComparisonCache;
pub use config::AppConfig;
pub use conflict::{ConflictDetector, ConflictResolver, MergeEngine, MergeOptions, MergeResult};
pub use db::Database;
pub use diff::{DiffEngine, DiffResult};
pub use errors::{CoreError, VersionError};
pub use models::{ContentVersion, RestoreRecord, TenantId};
pub use restore::RestoreCoordinator;
pub use service::VersionControl;
pub use store::{MemoryVersionStore, SqliteVersionStore, VersionStore};
