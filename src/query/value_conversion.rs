//! Value conversion from `sea_query` to `may_postgres`.
//!
//! Every `Value` is copied into an owned, boxed `ToSql` so the parameter slice
//! handed to the closure borrows only from this function's frame.

use crate::executor::DbError;
use chrono::{DateTime, Utc};
use may_postgres::types::ToSql;
use sea_query::{Value, Values};
use uuid::Uuid;

/// Convert `sea_query` values to `may_postgres` parameters and run `f` with them.
///
/// NULLs keep their column type (`Option::<String>::None` for a text value, and
/// so on) so PostgreSQL's parameter type check accepts them.
///
/// # Errors
///
/// Returns `DbError::Other` if an unsupported value type is encountered.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, DbError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, DbError>,
{
    let owned = values
        .iter()
        .map(to_sql_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| &**p as &dyn ToSql).collect();
    f(&params)
}

fn to_sql_param(value: &Value) -> Result<Box<dyn ToSql>, DbError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(Some(u)) => {
            let signed = i64::try_from(*u).map_err(|_| {
                DbError::Other(format!(
                    "BigUnsigned value {u} exceeds i64::MAX, cannot be bound as BIGINT"
                ))
            })?;
            Box::new(Some(signed))
        }
        Value::BigUnsigned(None) => Box::new(None::<i64>),
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(Some(s)) => Box::new(Some(s.to_string())),
        Value::String(None) => Box::new(None::<String>),
        Value::Char(v) => Box::new(v.map(String::from)),
        Value::Bytes(Some(b)) => {
            let bytes: &Vec<u8> = b;
            Box::new(Some(bytes.clone()))
        }
        Value::Bytes(None) => Box::new(None::<Vec<u8>>),
        Value::Json(Some(j)) => {
            let json: &serde_json::Value = j;
            Box::new(Some(json.clone()))
        }
        Value::Json(None) => Box::new(None::<serde_json::Value>),
        Value::Uuid(Some(u)) => {
            let id: &Uuid = u;
            Box::new(Some(*id))
        }
        Value::Uuid(None) => Box::new(None::<Uuid>),
        Value::ChronoDateTimeUtc(Some(t)) => {
            let ts: &DateTime<Utc> = t;
            Box::new(Some(*ts))
        }
        Value::ChronoDateTimeUtc(None) => Box::new(None::<DateTime<Utc>>),
        other => {
            return Err(DbError::Other(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Expr, ExprTrait, PostgresQueryBuilder, Query};

    #[test]
    fn test_converts_every_bound_value() {
        let id = Uuid::new_v4();
        let (sql, values) = Query::select()
            .column("id")
            .from("products")
            .and_where(Expr::col("category_id").eq(id))
            .and_where(Expr::col("is_active").eq(true))
            .and_where(Expr::col("price_cents").gte(100_i64))
            .and_where(Expr::col("title").eq("Mouse"))
            .build(PostgresQueryBuilder);

        assert!(sql.contains("$4"));
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_null_values_keep_their_type() {
        let values = Values(vec![
            Value::String(None),
            Value::Uuid(None),
            Value::BigInt(None),
        ]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_big_unsigned_overflow_is_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let result = with_converted_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(DbError::Other(msg)) if msg.contains("exceeds i64::MAX")));
    }
}
