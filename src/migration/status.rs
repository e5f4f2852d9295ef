//! Migration status reporting

use crate::migration::MigrationRecord;

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Applied migrations (from the state table), oldest first
    pub applied: Vec<MigrationRecord>,
    /// Compiled-in migrations not yet applied, in version order
    pub pending: Vec<PendingMigration>,
}

#[derive(Debug, Clone)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

impl MigrationStatus {
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.version).max()
    }

    pub fn next_pending_version(&self) -> Option<i64> {
        self.pending.first().map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_summary() {
        let applied = vec![MigrationRecord {
            version: 10,
            name: "a".to_string(),
            checksum: "x".to_string(),
            applied_at: Utc::now(),
            execution_time_ms: Some(3),
            success: true,
        }];
        let pending = vec![PendingMigration {
            version: 20,
            name: "b".to_string(),
            checksum: "y".to_string(),
        }];

        let status = MigrationStatus::new(applied, pending);
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some(10));
        assert_eq!(status.next_pending_version(), Some(20));
        assert!(MigrationStatus::new(vec![], vec![]).is_up_to_date());
    }
}
