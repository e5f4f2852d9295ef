use crate::entity::product::{self, Product};
use crate::entity::user::User;
use crate::entity::distinct;
use crate::executor::{DbError, DbExecutor};
use crate::query::statement::fetch_returning;
use crate::query::{decode, Entity, FromRow, SelectQuery};
use chrono::{DateTime, Utc};
use may_postgres::Row;
use sea_query::{Expr, ExprTrait, Order as SortOrder};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

text_enum! {
    /// Order lifecycle state. `Completed` and `Canceled` are terminal.
    pub enum OrderStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Shipped => "SHIPPED",
        Completed => "COMPLETED",
        Canceled => "CANCELED",
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }
}

/// Shipping fields captured at checkout, already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shipping {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub city_province: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping_name: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_street: Option<String>,
    pub shipping_house: Option<String>,
    pub shipping_city_province: Option<String>,
    pub shipping_district: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl FromRow for Order {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_cents: row.try_get("total_cents")?,
            status: row.try_get("status")?,
            shipping_name: row.try_get("shipping_name")?,
            shipping_phone: row.try_get("shipping_phone")?,
            shipping_street: row.try_get("shipping_street")?,
            shipping_house: row.try_get("shipping_house")?,
            shipping_city_province: row.try_get("shipping_city_province")?,
            shipping_district: row.try_get("shipping_district")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
            user: None,
        })
    }
}

impl Entity for Order {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "total_cents",
        "status",
        "shipping_name",
        "shipping_phone",
        "shipping_street",
        "shipping_house",
        "shipping_city_province",
        "shipping_district",
        "created_at",
        "updated_at",
    ];
}

/// One line of an order; `price_cents` is the unit price at checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl FromRow for OrderItem {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price_cents: row.try_get("price_cents")?,
            product: None,
        })
    }
}

impl Entity for OrderItem {
    const TABLE: &'static str = "order_items";
    const COLUMNS: &'static [&'static str] =
        &["id", "order_id", "product_id", "quantity", "price_cents"];
}

/// Insert a PENDING order header.
pub fn insert(
    executor: &dyn DbExecutor,
    user_id: Uuid,
    total_cents: i64,
    shipping: &Shipping,
) -> Result<Order, DbError> {
    let sql = format!(
        "INSERT INTO orders \
         (id, user_id, total_cents, status, shipping_name, shipping_phone, shipping_street, \
          shipping_house, shipping_city_province, shipping_district) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        Order::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[
            &Uuid::new_v4(),
            &user_id,
            &total_cents,
            &OrderStatus::Pending.as_str(),
            &shipping.name,
            &shipping.phone,
            &shipping.street,
            &shipping.house,
            &shipping.city_province,
            &shipping.district,
        ],
    )
}

pub fn insert_item(
    executor: &dyn DbExecutor,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price_cents: i64,
) -> Result<OrderItem, DbError> {
    let sql = format!(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price_cents) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        OrderItem::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[&Uuid::new_v4(), &order_id, &product_id, &quantity, &price_cents],
    )
}

pub fn find_by_id(executor: &dyn DbExecutor, id: Uuid) -> Result<Option<Order>, DbError> {
    SelectQuery::<Order>::new()
        .filter(Expr::col("id").eq(id))
        .one(executor)
}

/// Orders newest first, optionally restricted to one user, with items attached.
pub fn list(executor: &dyn DbExecutor, user_id: Option<Uuid>) -> Result<Vec<Order>, DbError> {
    let mut query = SelectQuery::<Order>::new();
    if let Some(user_id) = user_id {
        query = query.filter(Expr::col("user_id").eq(user_id));
    }
    let mut orders = query.order_by("created_at", SortOrder::Desc).all(executor)?;
    attach_items(executor, &mut orders)?;
    Ok(orders)
}

/// Set the status. `None` if the order does not exist.
pub fn set_status(
    executor: &dyn DbExecutor,
    id: Uuid,
    status: OrderStatus,
) -> Result<Option<Order>, DbError> {
    let sql = format!(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        Order::column_list()
    );
    executor
        .query_opt(&sql, &[&id, &status.as_str()])?
        .map(|row| decode(&row))
        .transpose()
}

/// Fill `items` (each with its product) on every order.
pub fn attach_items(executor: &dyn DbExecutor, orders: &mut [Order]) -> Result<(), DbError> {
    let order_ids = distinct(orders.iter().map(|o| o.id));
    if order_ids.is_empty() {
        return Ok(());
    }
    let mut items = SelectQuery::<OrderItem>::new()
        .filter(Expr::col("order_id").is_in(order_ids))
        .order_by("id", SortOrder::Asc)
        .all(executor)?;

    let product_ids = distinct(items.iter().map(|i| i.product_id));
    let products: HashMap<Uuid, Product> = product::find_by_ids(executor, product_ids)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for mut item in items.drain(..) {
        item.product = products.get(&item.product_id).cloned();
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in orders.iter_mut() {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}
