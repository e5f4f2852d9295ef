use crate::executor::{DbError, DbExecutor};
use crate::query::statement::{fetch_optional, fetch_returning};
use crate::query::{Entity, FromRow, SelectQuery};
use chrono::{DateTime, Utc};
use may_postgres::Row;
use sea_query::{Asterisk, Expr, ExprTrait, Order, PostgresQueryBuilder, Query};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for Category {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["id", "name", "created_at", "updated_at"];
}

/// All categories, alphabetically.
pub fn list(executor: &dyn DbExecutor) -> Result<Vec<Category>, DbError> {
    SelectQuery::<Category>::new()
        .order_by("name", Order::Asc)
        .all(executor)
}

pub fn find_by_id(executor: &dyn DbExecutor, id: Uuid) -> Result<Option<Category>, DbError> {
    SelectQuery::<Category>::new()
        .filter(Expr::col("id").eq(id))
        .one(executor)
}

pub fn find_by_ids(executor: &dyn DbExecutor, ids: Vec<Uuid>) -> Result<Vec<Category>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    SelectQuery::<Category>::new()
        .filter(Expr::col("id").is_in(ids))
        .all(executor)
}

pub fn insert(executor: &dyn DbExecutor, name: &str) -> Result<Category, DbError> {
    let sql = format!(
        "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING {}",
        Category::column_list()
    );
    fetch_returning(executor, &sql, &[&Uuid::new_v4(), &name])
}

/// Insert `name` unless it exists; either way return the stored row.
pub fn ensure(executor: &dyn DbExecutor, name: &str) -> Result<Category, DbError> {
    let sql = format!(
        "INSERT INTO categories (id, name) VALUES ($1, $2) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING {}",
        Category::column_list()
    );
    fetch_returning(executor, &sql, &[&Uuid::new_v4(), &name])
}

/// Rename a category. `None` if it does not exist.
pub fn rename(executor: &dyn DbExecutor, id: Uuid, name: &str) -> Result<Option<Category>, DbError> {
    let built = Query::update()
        .table(Category::TABLE)
        .value("name", name)
        .value("updated_at", Expr::current_timestamp())
        .and_where(Expr::col("id").eq(id))
        .returning_col(Asterisk)
        .build(PostgresQueryBuilder);
    fetch_optional(executor, built)
}

/// Hard delete. Fails with a foreign-key violation while products reference it.
pub fn delete(executor: &dyn DbExecutor, id: Uuid) -> Result<bool, DbError> {
    let affected = executor.execute("DELETE FROM categories WHERE id = $1", &[&id])?;
    Ok(affected > 0)
}
