//! Checksums for compiled-in migrations.
//!
//! A migration's checksum is the SHA-256 of the SQL its `up()` issues, captured
//! with a [`RecordingExecutor`]. Editing a migration after it shipped changes
//! the SQL and therefore the checksum.

use super::migration::Migration;
use super::schema_manager::SchemaManager;
use crate::executor::{DbError, RecordingExecutor};
use sha2::{Digest, Sha256};

/// Calculate the SHA-256 checksum of the statements `migration.up()` runs.
pub fn calculate_checksum(migration: &dyn Migration) -> Result<String, DbError> {
    let recorder = RecordingExecutor::new();
    migration.up(&SchemaManager::new(&recorder))?;

    let mut hasher = Sha256::new();
    for statement in recorder.statements() {
        hasher.update(normalize(&statement).as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Collapse whitespace so reformatting a statement does not change the checksum.
fn normalize(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a checksum against the stored value.
pub fn validate_checksum(stored_checksum: &str, current_checksum: &str) -> Result<(), DbError> {
    if stored_checksum == current_checksum {
        Ok(())
    } else {
        Err(DbError::Other(format!(
            "Checksum mismatch: stored={stored_checksum}, current={current_checksum}"
        )))
    }
}
