use crate::entity::product::{self, Product};
use crate::entity::distinct;
use crate::executor::{DbError, DbExecutor};
use crate::query::statement::{self, fetch_returning};
use crate::query::{decode, Entity, FromRow, SelectQuery};
use chrono::{DateTime, Utc};
use may_postgres::Row;
use sea_query::{Expr, ExprTrait, Order, PostgresQueryBuilder, Query};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl FromRow for CartItem {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            product: None,
        })
    }
}

impl Entity for CartItem {
    const TABLE: &'static str = "cart_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "product_id",
        "quantity",
        "created_at",
        "updated_at",
    ];
}

/// The user's cart, newest line first, with products attached.
pub fn list_for_user(executor: &dyn DbExecutor, user_id: Uuid) -> Result<Vec<CartItem>, DbError> {
    let mut items = SelectQuery::<CartItem>::new()
        .filter(Expr::col("user_id").eq(user_id))
        .order_by("created_at", Order::Desc)
        .all(executor)?;
    attach_products(executor, &mut items)?;
    Ok(items)
}

/// Lock the user's cart rows for the rest of the transaction.
pub fn lock_for_user(executor: &dyn DbExecutor, user_id: Uuid) -> Result<Vec<CartItem>, DbError> {
    let mut items = SelectQuery::<CartItem>::new()
        .filter(Expr::col("user_id").eq(user_id))
        .order_by("created_at", Order::Asc)
        .for_update()
        .all(executor)?;
    attach_products(executor, &mut items)?;
    Ok(items)
}

/// Add `quantity` of a product, incrementing an existing line atomically.
pub fn upsert(
    executor: &dyn DbExecutor,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartItem, DbError> {
    let sql = format!(
        "INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, product_id) DO UPDATE \
         SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
         RETURNING {}",
        CartItem::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[&Uuid::new_v4(), &user_id, &product_id, &quantity],
    )
}

/// Set a line's quantity. `None` if the user has no such line.
pub fn set_quantity(
    executor: &dyn DbExecutor,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<Option<CartItem>, DbError> {
    let sql = format!(
        "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
         WHERE user_id = $1 AND product_id = $2 RETURNING {}",
        CartItem::column_list()
    );
    executor
        .query_opt(&sql, &[&user_id, &product_id, &quantity])?
        .map(|row| decode(&row))
        .transpose()
}

pub fn delete(executor: &dyn DbExecutor, user_id: Uuid, product_id: Uuid) -> Result<bool, DbError> {
    let affected = executor.execute(
        "DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2",
        &[&user_id, &product_id],
    )?;
    Ok(affected > 0)
}

/// Delete exactly the given lines. Checkout passes the rows it locked, so a
/// line added concurrently stays in the cart.
pub fn delete_lines(executor: &dyn DbExecutor, ids: Vec<Uuid>) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let built = Query::delete()
        .from_table(CartItem::TABLE)
        .and_where(Expr::col("id").is_in(ids))
        .build(PostgresQueryBuilder);
    statement::execute(executor, built)
}

pub fn attach_products(executor: &dyn DbExecutor, items: &mut [CartItem]) -> Result<(), DbError> {
    let ids = distinct(items.iter().map(|i| i.product_id));
    let by_id: HashMap<Uuid, Product> = product::find_by_ids(executor, ids)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    for item in items.iter_mut() {
        item.product = by_id.get(&item.product_id).cloned();
    }
    Ok(())
}

/// Σ quantity × current unit price, or `None` if it does not fit in an `i64`.
/// Lines without a loaded product count as zero.
pub fn total_cents(items: &[CartItem]) -> Option<i64> {
    items
        .iter()
        .filter_map(|item| {
            item.product
                .as_ref()
                .map(|p| i64::from(item.quantity).checked_mul(p.price_cents))
        })
        .try_fold(0_i64, |total, line| total.checked_add(line?))
}
