//! Migrator - applies, reverts and reports compiled-in migrations

use crate::executor::{DbExecutor, PgExecutor};
use crate::migration::{
    calculate_checksum, initialize_state_table, Migration, MigrationError, MigrationLockGuard,
    MigrationRecord, MigrationStatus, PendingMigration, SchemaManager,
};
use std::collections::HashSet;
use std::time::{Duration, Instant};

const LOCK_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Migrator {
    /// Create a migrator over `migrations`, which are sorted by version.
    ///
    /// Fails on a non-positive or duplicate version.
    pub fn new(mut migrations: Vec<Box<dyn Migration>>) -> Result<Self, MigrationError> {
        migrations.sort_by_key(|m| m.version());
        let mut seen = HashSet::new();
        for migration in &migrations {
            let version = migration.version();
            if version <= 0 || !seen.insert(version) {
                return Err(MigrationError::InvalidVersion(version));
            }
        }
        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// Compare compiled-in migrations with the state table.
    ///
    /// Fails if an applied migration's checksum changed or if the database has
    /// a migration this build does not contain.
    pub fn status(&self, executor: &dyn DbExecutor) -> Result<MigrationStatus, MigrationError> {
        initialize_state_table(executor)?;
        let applied = Self::query_applied_migrations(executor)?;

        let known: HashSet<i64> = self.migrations.iter().map(|m| m.version()).collect();
        if let Some(unknown) = applied.iter().find(|r| !known.contains(&r.version)) {
            return Err(MigrationError::UnknownApplied {
                version: unknown.version,
                name: unknown.name.clone(),
            });
        }

        let mut pending = Vec::new();
        for migration in &self.migrations {
            let checksum = calculate_checksum(migration.as_ref())?;
            match applied.iter().find(|r| r.version == migration.version()) {
                Some(record) if record.checksum != checksum => {
                    return Err(MigrationError::ChecksumMismatch {
                        version: record.version,
                        name: record.name.clone(),
                        stored: record.checksum.clone(),
                        current: checksum,
                    });
                }
                Some(_) => {}
                None => pending.push(PendingMigration {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    checksum,
                }),
            }
        }

        Ok(MigrationStatus::new(applied, pending))
    }

    /// Apply pending migrations, each in its own transaction.
    ///
    /// `steps` limits how many are applied (`None` = all). Returns the number applied.
    pub fn up(&self, executor: &PgExecutor, steps: Option<usize>) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let _lock = MigrationLockGuard::acquire(executor, LOCK_TIMEOUT)?;

        let status = self.status(executor)?;
        let mut applied_count = 0;

        for pending in status.pending.iter().take(steps.unwrap_or(usize::MAX)) {
            let Some(migration) = self.find(pending.version) else {
                continue;
            };
            let start = Instant::now();
            log::info!("applying migration {} ({})", pending.version, pending.name);

            let tx = executor.begin()?;
            migration
                .up(&SchemaManager::new(&tx))
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: pending.version,
                    name: pending.name.clone(),
                    error: e.to_string(),
                })?;

            let execution_time_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
            Self::record_migration(&tx, pending, execution_time_ms)?;
            tx.commit()?;

            log::info!(
                "applied migration {} ({}) in {execution_time_ms} ms",
                pending.version,
                pending.name
            );
            applied_count += 1;
        }

        Ok(applied_count)
    }

    /// Revert the newest `steps` applied migrations (default 1).
    pub fn down(&self, executor: &PgExecutor, steps: Option<usize>) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let _lock = MigrationLockGuard::acquire(executor, LOCK_TIMEOUT)?;

        let status = self.status(executor)?;
        let mut reverted = 0;

        for record in status.applied.iter().rev().take(steps.unwrap_or(1)) {
            let Some(migration) = self.find(record.version) else {
                continue;
            };
            log::info!("reverting migration {} ({})", record.version, record.name);

            let tx = executor.begin()?;
            migration
                .down(&SchemaManager::new(&tx))
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: record.version,
                    name: record.name.clone(),
                    error: e.to_string(),
                })?;
            tx.execute(
                "DELETE FROM storefront_migrations WHERE version = $1",
                &[&record.version],
            )?;
            tx.commit()?;
            reverted += 1;
        }

        Ok(reverted)
    }

    fn find(&self, version: i64) -> Option<&dyn Migration> {
        self.migrations
            .iter()
            .find(|m| m.version() == version)
            .map(|m| m.as_ref())
    }

    /// Applied migrations, oldest first. Excludes the lock row.
    fn query_applied_migrations(
        executor: &dyn DbExecutor,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let rows = executor.query_all(
            "SELECT version, name, checksum, applied_at, execution_time_ms, success \
             FROM storefront_migrations WHERE version > 0 ORDER BY version ASC",
            &[],
        )?;
        rows.iter()
            .map(|row| MigrationRecord::from_row(row).map_err(MigrationError::from))
            .collect()
    }

    fn record_migration(
        executor: &dyn DbExecutor,
        pending: &PendingMigration,
        execution_time_ms: i64,
    ) -> Result<(), MigrationError> {
        executor.execute(
            "INSERT INTO storefront_migrations \
             (version, name, checksum, applied_at, execution_time_ms, success) \
             VALUES ($1, $2, $3, NOW(), $4, true)",
            &[
                &pending.version,
                &pending.name,
                &pending.checksum,
                &execution_time_ms,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{DbError, RecordingExecutor};

    struct Noop(i64);

    impl Migration for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn version(&self) -> i64 {
            self.0
        }

        fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
            manager.execute("SELECT 1", &[])
        }

        fn down(&self, _manager: &SchemaManager<'_>) -> Result<(), DbError> {
            Ok(())
        }
    }

    #[test]
    fn test_new_sorts_by_version() {
        let migrator = Migrator::new(vec![Box::new(Noop(3)), Box::new(Noop(1)), Box::new(Noop(2))])
            .unwrap();
        let versions: Vec<i64> = migrator.migrations().iter().map(|m| m.version()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_new_rejects_duplicate_and_non_positive_versions() {
        assert!(matches!(
            Migrator::new(vec![Box::new(Noop(5)), Box::new(Noop(5))]),
            Err(MigrationError::InvalidVersion(5))
        ));
        assert!(matches!(
            Migrator::new(vec![Box::new(Noop(0))]),
            Err(MigrationError::InvalidVersion(0))
        ));
    }

    #[test]
    fn test_status_on_empty_database_lists_everything_pending() {
        let migrator = Migrator::new(vec![Box::new(Noop(2)), Box::new(Noop(1))]).unwrap();
        let recorder = RecordingExecutor::new();

        let status = migrator.status(&recorder).unwrap();
        assert_eq!(status.applied.len(), 0);
        assert_eq!(status.next_pending_version(), Some(1));
        assert_eq!(status.pending.len(), 2);
        assert_eq!(status.pending[0].checksum.len(), 64);
    }
}
