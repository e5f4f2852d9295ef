//! Running statements built with `sea_query` (INSERT/UPDATE/DELETE and friends).

use crate::executor::{DbError, DbExecutor};
use crate::query::traits::{decode, decode_all, FromRow};
use crate::query::value_conversion::with_converted_params;
use sea_query::Values;

/// Execute a built statement and return the affected row count.
pub fn execute(executor: &dyn DbExecutor, (sql, values): (String, Values)) -> Result<u64, DbError> {
    with_converted_params(&values, |params| executor.execute(&sql, params))
}

/// Execute a built statement and decode every returned row.
pub fn fetch_all<T: FromRow>(
    executor: &dyn DbExecutor,
    (sql, values): (String, Values),
) -> Result<Vec<T>, DbError> {
    with_converted_params(&values, |params| decode_all(&executor.query_all(&sql, params)?))
}

/// Execute a built statement and decode the first returned row, if any.
pub fn fetch_optional<T: FromRow>(
    executor: &dyn DbExecutor,
    built: (String, Values),
) -> Result<Option<T>, DbError> {
    Ok(fetch_all(executor, built)?.into_iter().next())
}

/// Decode the single row a raw `... RETURNING` statement produces.
pub fn fetch_returning<T: FromRow>(
    executor: &dyn DbExecutor,
    sql: &str,
    params: &[&dyn may_postgres::types::ToSql],
) -> Result<T, DbError> {
    decode(&executor.query_one(sql, params)?)
}
