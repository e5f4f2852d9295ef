use crate::entity::category::{self, Category};
use crate::entity::distinct;
use crate::executor::{DbError, DbExecutor};
use crate::query::statement::{fetch_optional, fetch_returning};
use crate::query::{Entity, FromRow, SelectQuery};
use chrono::{DateTime, Utc};
use may_postgres::Row;
use sea_query::{
    Asterisk, Cond, Expr, ExprTrait, LikeExpr, Order, PostgresQueryBuilder, Query,
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl FromRow for Product {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            price_cents: row.try_get("price_cents")?,
            stock: row.try_get("stock")?,
            image_url: row.try_get("image_url")?,
            is_active: row.try_get("is_active")?,
            category_id: row.try_get("category_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            category: None,
        })
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "sku",
        "description",
        "price_cents",
        "stock",
        "image_url",
        "is_active",
        "category_id",
        "created_at",
        "updated_at",
    ];
}

/// Listing filter. `page` is 1-based; callers clamp both paging fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub include_inactive: bool,
    pub page: u64,
    pub limit: u64,
}

impl ProductFilter {
    /// Rows to skip for `page`. `None` once the offset no longer fits a
    /// PostgreSQL `bigint`; no such page can hold rows.
    pub fn offset(&self) -> Option<u64> {
        (self.page.max(1) - 1)
            .checked_mul(self.limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            include_inactive: false,
            page: 1,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub category_id: Uuid,
}

/// Partial update; `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub category_id: Option<Uuid>,
}

/// Escape LIKE wildcards so user input only matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains(column: &'static str, pattern: &str) -> Expr {
    Expr::col(column).like(LikeExpr::new(pattern).escape('\\'))
}

fn listing_query(filter: &ProductFilter, offset: u64) -> SelectQuery<Product> {
    let mut query = SelectQuery::<Product>::new();
    if !filter.include_inactive {
        query = query.filter(Expr::col("is_active").eq(true));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(Expr::col("category_id").eq(category_id));
    }
    if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        query = query.filter(
            Cond::any()
                .add(contains("title", &pattern))
                .add(contains("description", &pattern))
                .add(contains("sku", &pattern)),
        );
    }
    query
        .order_by("created_at", Order::Desc)
        .limit(filter.limit)
        .offset(offset)
}

/// One page of products, newest first, each with its category.
pub fn list(executor: &dyn DbExecutor, filter: &ProductFilter) -> Result<Vec<Product>, DbError> {
    let Some(offset) = filter.offset() else {
        return Ok(Vec::new());
    };
    let mut products = listing_query(filter, offset).all(executor)?;
    attach_categories(executor, &mut products)?;
    Ok(products)
}

pub fn find_by_id(executor: &dyn DbExecutor, id: Uuid) -> Result<Option<Product>, DbError> {
    SelectQuery::<Product>::new()
        .filter(Expr::col("id").eq(id))
        .one(executor)
}

/// Product with its category embedded.
pub fn find_with_category(executor: &dyn DbExecutor, id: Uuid) -> Result<Option<Product>, DbError> {
    let Some(product) = find_by_id(executor, id)? else {
        return Ok(None);
    };
    let mut products = vec![product];
    attach_categories(executor, &mut products)?;
    Ok(products.pop())
}

pub fn find_by_ids(executor: &dyn DbExecutor, ids: Vec<Uuid>) -> Result<Vec<Product>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    SelectQuery::<Product>::new()
        .filter(Expr::col("id").is_in(ids))
        .all(executor)
}

pub fn insert(executor: &dyn DbExecutor, new: &NewProduct) -> Result<Product, DbError> {
    let sql = format!(
        "INSERT INTO products \
         (id, title, sku, description, price_cents, stock, image_url, is_active, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
        Product::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[
            &Uuid::new_v4(),
            &new.title,
            &new.sku,
            &new.description,
            &new.price_cents,
            &new.stock,
            &new.image_url,
            &new.is_active,
            &new.category_id,
        ],
    )
}

/// Insert or refresh the product with the same SKU.
pub fn upsert_by_sku(executor: &dyn DbExecutor, new: &NewProduct) -> Result<Product, DbError> {
    let sql = format!(
        "INSERT INTO products \
         (id, title, sku, description, price_cents, stock, image_url, is_active, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (sku) DO UPDATE SET \
         title = EXCLUDED.title, description = EXCLUDED.description, \
         price_cents = EXCLUDED.price_cents, stock = EXCLUDED.stock, \
         image_url = EXCLUDED.image_url, is_active = EXCLUDED.is_active, \
         category_id = EXCLUDED.category_id, updated_at = NOW() \
         RETURNING {}",
        Product::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[
            &Uuid::new_v4(),
            &new.title,
            &new.sku,
            &new.description,
            &new.price_cents,
            &new.stock,
            &new.image_url,
            &new.is_active,
            &new.category_id,
        ],
    )
}

/// Apply `changes`. `None` if the product does not exist.
pub fn update(
    executor: &dyn DbExecutor,
    id: Uuid,
    changes: &ProductChanges,
) -> Result<Option<Product>, DbError> {
    let mut query = Query::update();
    query.table(Product::TABLE);
    if let Some(title) = &changes.title {
        query.value("title", title.as_str());
    }
    if let Some(sku) = &changes.sku {
        query.value("sku", sku.as_str());
    }
    if let Some(description) = &changes.description {
        query.value("description", description.as_str());
    }
    if let Some(price_cents) = changes.price_cents {
        query.value("price_cents", price_cents);
    }
    if let Some(stock) = changes.stock {
        query.value("stock", stock);
    }
    if let Some(image_url) = &changes.image_url {
        query.value("image_url", image_url.as_str());
    }
    if let Some(is_active) = changes.is_active {
        query.value("is_active", is_active);
    }
    if let Some(category_id) = changes.category_id {
        query.value("category_id", category_id);
    }
    query
        .value("updated_at", Expr::current_timestamp())
        .and_where(Expr::col("id").eq(id))
        .returning_col(Asterisk);

    fetch_optional(executor, query.build(PostgresQueryBuilder))
}

/// Soft delete. Returns `false` if the product does not exist.
pub fn deactivate(executor: &dyn DbExecutor, id: Uuid) -> Result<bool, DbError> {
    let affected = executor.execute(
        "UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1",
        &[&id],
    )?;
    Ok(affected > 0)
}

/// Fill `category` on each product with one extra query.
pub fn attach_categories(executor: &dyn DbExecutor, products: &mut [Product]) -> Result<(), DbError> {
    let ids = distinct(products.iter().map(|p| p.category_id));
    let by_id: HashMap<Uuid, Category> = category::find_by_ids(executor, ids)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    for product in products.iter_mut() {
        product.category = by_id.get(&product.category_id).cloned();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    #[test]
    fn test_default_listing_hides_inactive_products() {
        let sql = listing_query(&ProductFilter::default(), 0).to_sql();
        assert!(sql.contains(r#"WHERE "is_active" = TRUE"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "created_at" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 20"), "{sql}");
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[test]
    fn test_include_inactive_drops_the_active_filter() {
        let filter = ProductFilter {
            include_inactive: true,
            ..ProductFilter::default()
        };
        let sql = listing_query(&filter, 0).to_sql();
        assert!(!sql.contains("is_active\" ="), "{sql}");
    }

    #[test]
    fn test_search_matches_title_description_or_sku() {
        let filter = ProductFilter {
            search: Some("M90".to_string()),
            page: 3,
            limit: 10,
            ..ProductFilter::default()
        };
        let sql = listing_query(&filter, filter.offset().unwrap()).to_sql();
        assert!(sql.contains(r#""title" LIKE '%M90%'"#), "{sql}");
        assert!(sql.contains(r#""description" LIKE '%M90%'"#), "{sql}");
        assert!(sql.contains(r#""sku" LIKE '%M90%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[test]
    fn test_offset_past_bigint_range_lists_nothing() {
        let filter = ProductFilter {
            page: i64::MAX.unsigned_abs(),
            limit: 50,
            ..ProductFilter::default()
        };
        assert_eq!(filter.offset(), None);

        let recorder = RecordingExecutor::new();
        assert!(list(&recorder, &filter).unwrap().is_empty());
        assert!(recorder.statements().is_empty());
    }

    #[test]
    fn test_offset_of_last_representable_page() {
        let filter = ProductFilter {
            page: 2,
            limit: 50,
            ..ProductFilter::default()
        };
        assert_eq!(filter.offset(), Some(50));
        let edge = ProductFilter {
            page: i64::MAX.unsigned_abs() / 50 + 1,
            limit: 50,
            ..ProductFilter::default()
        };
        assert_eq!(edge.offset(), Some(i64::MAX.unsigned_abs() / 50 * 50));
    }

    #[test]
    fn test_escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_update_only_sets_supplied_columns() {
        let recorder = RecordingExecutor::new();
        let changes = ProductChanges {
            price_cents: Some(1299),
            is_active: Some(false),
            ..ProductChanges::default()
        };
        assert!(update(&recorder, Uuid::nil(), &changes).unwrap().is_none());

        let sql = &recorder.statements()[0];
        assert!(sql.contains(r#""price_cents" = $1"#), "{sql}");
        assert!(sql.contains(r#""is_active" = $2"#), "{sql}");
        assert!(!sql.contains(r#""title""#), "{sql}");
        assert_eq!(recorder.param_counts(), vec![3]);
    }

    #[test]
    fn test_product_json_is_camel_case_and_embeds_category() {
        let at = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let product = Product {
            id: Uuid::nil(),
            title: "Logitech Mouse M90".to_string(),
            sku: "M90-001".to_string(),
            description: None,
            price_cents: 599,
            stock: 50,
            image_url: None,
            is_active: true,
            category_id: Uuid::nil(),
            created_at: at,
            updated_at: at,
            category: Some(Category {
                id: Uuid::nil(),
                name: "Mouse".to_string(),
                created_at: at,
                updated_at: at,
            }),
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["priceCents"], 599);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["category"]["name"], "Mouse");
    }
}
