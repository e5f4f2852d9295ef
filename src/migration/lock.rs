//! Table-based migration lock.
//!
//! The process that manages to insert the reserved row (version `-1`) into the
//! state table holds the lock; everyone else polls until it is deleted.

use crate::executor::DbExecutor;
use crate::migration::MigrationError;
use std::time::{Duration, Instant};

const LOCK_VERSION: i64 = -1;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Holds the migration lock; releases it on drop.
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn DbExecutor,
}

impl<'a> MigrationLockGuard<'a> {
    /// Acquire the lock, waiting up to `timeout`.
    pub fn acquire(executor: &'a dyn DbExecutor, timeout: Duration) -> Result<Self, MigrationError> {
        acquire_migration_lock(executor, timeout)?;
        Ok(Self { executor })
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = release_migration_lock(self.executor) {
            log::error!(
                "failed to release migration lock, delete it manually \
                 (DELETE FROM storefront_migrations WHERE version = {LOCK_VERSION}): {e}"
            );
        }
    }
}

pub fn acquire_migration_lock(
    executor: &dyn DbExecutor,
    timeout: Duration,
) -> Result<(), MigrationError> {
    let start = Instant::now();
    let mut announced = false;

    loop {
        let inserted = executor.execute(
            "INSERT INTO storefront_migrations (version, name, checksum, applied_at, success) \
             VALUES ($1, 'LOCK', 'lock', NOW(), true) \
             ON CONFLICT (version) DO NOTHING",
            &[&LOCK_VERSION],
        )?;

        if inserted > 0 {
            log::debug!("acquired migration lock");
            return Ok(());
        }

        if start.elapsed() >= timeout {
            return Err(MigrationError::LockTimeout(format!(
                "could not acquire the migration lock within {timeout:?}; another process may be \
                 migrating. If none is, remove the lock row: \
                 DELETE FROM storefront_migrations WHERE version = {LOCK_VERSION}"
            )));
        }

        if !announced {
            log::info!("waiting for another process to finish migrating");
            announced = true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

pub fn release_migration_lock(executor: &dyn DbExecutor) -> Result<(), MigrationError> {
    executor.execute(
        "DELETE FROM storefront_migrations WHERE version = $1",
        &[&LOCK_VERSION],
    )?;
    Ok(())
}
