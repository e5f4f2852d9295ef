//! SchemaManager - DDL helpers available to migrations

use crate::executor::{DbError, DbExecutor};
use may_postgres::types::ToSql;
use sea_query::{IndexCreateStatement, PostgresQueryBuilder, TableDropStatement};

/// Wraps an executor for the duration of one migration.
pub struct SchemaManager<'a> {
    executor: &'a dyn DbExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn DbExecutor) -> Self {
        Self { executor }
    }

    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), DbError> {
        self.execute(&table.build(PostgresQueryBuilder), &[])
    }

    /// ```rust,no_run
    /// # use storefront::migration::SchemaManager;
    /// # fn run(manager: &SchemaManager<'_>) -> Result<(), storefront::DbError> {
    /// use sea_query::{Expr, Index};
    ///
    /// manager.create_index(
    ///     Index::create()
    ///         .if_not_exists()
    ///         .name("idx_products_category_id")
    ///         .table("products")
    ///         .col(Expr::col("category_id"))
    ///         .to_owned(),
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), DbError> {
        self.execute(&index.build(PostgresQueryBuilder), &[])
    }

    /// Execute raw SQL
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<(), DbError> {
        self.executor.execute(sql, params).map(|_| ())
    }

    pub fn executor(&self) -> &dyn DbExecutor {
        self.executor
    }
}
