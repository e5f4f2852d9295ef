//! Migration state table management

use crate::executor::{DbError, DbExecutor};

/// Name of the state table. Version `-1` is reserved for the lock row.
pub const STATE_TABLE: &str = "storefront_migrations";

/// Create `storefront_migrations` and its index if they do not exist.
pub fn initialize_state_table(executor: &dyn DbExecutor) -> Result<(), DbError> {
    executor.execute(
        r#"
        CREATE TABLE IF NOT EXISTS storefront_migrations (
            version BIGINT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            execution_time_ms BIGINT,
            success BOOLEAN NOT NULL DEFAULT true
        )
        "#,
        &[],
    )?;

    executor.execute(
        "CREATE INDEX IF NOT EXISTS idx_storefront_migrations_applied_at \
         ON storefront_migrations(applied_at)",
        &[],
    )?;

    Ok(())
}
