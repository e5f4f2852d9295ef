//! Row mapping traits.

use crate::executor::DbError;
use may_postgres::Row;

/// Build a value from a result row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error>;
}

/// A table-backed model.
///
/// `COLUMNS` is the projection every `SelectQuery` for the entity uses, and the
/// list `RETURNING` clauses ask for, so `from_row` can read by name.
pub trait Entity: FromRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// `COLUMNS` as a comma-separated SQL list.
    fn column_list() -> String {
        Self::COLUMNS.join(", ")
    }
}

/// Decode one row, reporting failures as `DbError::ParseError`.
pub fn decode<T: FromRow>(row: &Row) -> Result<T, DbError> {
    T::from_row(row).map_err(|e| DbError::ParseError(format!("Failed to parse row: {e}")))
}

pub fn decode_all<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, DbError> {
    rows.iter().map(decode).collect()
}
