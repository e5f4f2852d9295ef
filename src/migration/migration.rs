//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::executor::DbError;

/// A single schema change.
///
/// Migrations run synchronously on the calling coroutine or thread, each one
/// inside its own transaction.
pub trait Migration: Send + Sync {
    /// Human-readable identifier, e.g. `create_users_and_catalog`
    fn name(&self) -> &str;

    /// Ordering key (timestamp: YYYYMMDDHHMMSS); must be positive
    fn version(&self) -> i64;

    /// Apply the migration
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;

    /// Undo the migration
    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError>;
}
