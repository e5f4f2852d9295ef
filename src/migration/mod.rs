//! Schema migrations.
//!
//! Migrations are compiled into the binary (see [`crate::migrations`]) and
//! tracked in the `storefront_migrations` state table:
//! - `Migration` trait with `up()` / `down()`
//! - `SchemaManager` for DDL inside a migration
//! - checksums over the SQL a migration runs, so an edited migration is detected
//! - a table-based lock so concurrent deployments do not race
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront::migration::{Migration, SchemaManager};
//! use storefront::DbError;
//!
//! pub struct CreateWishlists;
//!
//! impl Migration for CreateWishlists {
//!     fn name(&self) -> &str {
//!         "create_wishlists"
//!     }
//!
//!     fn version(&self) -> i64 {
//!         20250301090000
//!     }
//!
//!     fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
//!         manager.execute(
//!             "CREATE TABLE wishlists (id UUID PRIMARY KEY, user_id UUID NOT NULL REFERENCES users(id))",
//!             &[],
//!         )
//!     }
//!
//!     fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
//!         manager.execute("DROP TABLE IF EXISTS wishlists", &[])
//!     }
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod lock;
pub mod migration;
pub mod migrator;
pub mod record;
pub mod schema_manager;
pub mod state_table;
pub mod status;

pub use checksum::{calculate_checksum, validate_checksum};
pub use error::MigrationError;
pub use lock::MigrationLockGuard;
pub use migration::Migration;
pub use migrator::Migrator;
pub use record::MigrationRecord;
pub use schema_manager::SchemaManager;
pub use state_table::{initialize_state_table, STATE_TABLE};
pub use status::{MigrationStatus, PendingMigration};
