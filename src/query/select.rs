//! Typed SELECT builder.
//!
//! Building methods (`filter`, `order_by`, `limit`, ...) wrap the underlying
//! `SelectStatement`; `all` / `one` build it for PostgreSQL, bind the values and
//! map each row through `FromRow`.

use crate::executor::{DbError, DbExecutor};
use crate::query::traits::{decode_all, Entity};
use crate::query::value_conversion::with_converted_params;
use sea_query::{
    IntoColumnRef, IntoCondition, LockType, Order, PostgresQueryBuilder, Query, SelectStatement,
};
use std::marker::PhantomData;

/// Query builder for selecting `E` rows.
pub struct SelectQuery<E> {
    pub(crate) query: SelectStatement,
    _phantom: PhantomData<E>,
}

impl<E: Entity> Default for SelectQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> SelectQuery<E> {
    /// `SELECT <E::COLUMNS> FROM <E::TABLE>`
    pub fn new() -> Self {
        let mut query = Query::select();
        query
            .columns(E::COLUMNS.iter().copied())
            .from(E::TABLE);
        Self {
            query,
            _phantom: PhantomData,
        }
    }

    /// Add a condition; several calls are AND-ed together.
    pub fn filter<C: IntoCondition>(mut self, condition: C) -> Self {
        self.query.cond_where(condition);
        self
    }

    pub fn order_by<C: IntoColumnRef>(mut self, column: C, order: Order) -> Self {
        self.query.order_by(column, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset(offset);
        self
    }

    /// Append `FOR UPDATE`. Only meaningful inside a transaction.
    pub fn for_update(mut self) -> Self {
        self.query.lock(LockType::Update);
        self
    }

    /// Render the statement, mostly for logging and tests.
    pub fn to_sql(&self) -> String {
        self.query.to_string(PostgresQueryBuilder)
    }

    /// Execute and return all rows.
    pub fn all(self, executor: &dyn DbExecutor) -> Result<Vec<E>, DbError> {
        let (sql, values) = self.query.build(PostgresQueryBuilder);

        with_converted_params(&values, |params| decode_all(&executor.query_all(&sql, params)?))
    }

    /// Execute and return the first row, if any.
    pub fn one(mut self, executor: &dyn DbExecutor) -> Result<Option<E>, DbError> {
        self.query.limit(1);
        Ok(self.all(executor)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;
    use crate::query::traits::FromRow;
    use may_postgres::Row;
    use sea_query::{Expr, ExprTrait};

    struct Widget;

    impl FromRow for Widget {
        fn from_row(_row: &Row) -> Result<Self, may_postgres::Error> {
            Ok(Widget)
        }
    }

    impl Entity for Widget {
        const TABLE: &'static str = "widgets";
        const COLUMNS: &'static [&'static str] = &["id", "name"];
    }

    #[test]
    fn test_select_projects_entity_columns() {
        let sql = SelectQuery::<Widget>::new().to_sql();
        assert_eq!(sql, r#"SELECT "id", "name" FROM "widgets""#);
    }

    #[test]
    fn test_select_with_filters_order_and_paging() {
        let sql = SelectQuery::<Widget>::new()
            .filter(Expr::col("name").eq("gear"))
            .filter(Expr::col("id").is_not_null())
            .order_by("name", Order::Desc)
            .limit(20)
            .offset(40)
            .to_sql();

        assert!(sql.contains(r#"WHERE "name" = 'gear' AND "id" IS NOT NULL"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "name" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 20"), "{sql}");
        assert!(sql.contains("OFFSET 40"), "{sql}");
    }

    #[test]
    fn test_for_update_appends_lock_clause() {
        let sql = SelectQuery::<Widget>::new().for_update().to_sql();
        assert!(sql.ends_with("FOR UPDATE"), "{sql}");
    }

    #[test]
    fn test_one_limits_to_a_single_row() {
        let recorder = RecordingExecutor::new();
        let found = SelectQuery::<Widget>::new()
            .filter(Expr::col("id").eq(7))
            .one(&recorder)
            .unwrap();

        assert!(found.is_none());
        let statements = recorder.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("LIMIT $2"), "{}", statements[0]);
        assert_eq!(recorder.param_counts(), vec![2]);
    }
}
