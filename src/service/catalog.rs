//! Categories and products.

use crate::entity::category::{self, Category};
use crate::entity::product::{self, NewProduct, Product, ProductChanges, ProductFilter};
use crate::error::ApiError;
use crate::executor::{ConstraintViolation, DbExecutor};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 50;

/// `page` query value: anything but a positive integer means page 1.
pub fn page_from_query(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|p| *p > 0)
        .map_or(1, |p| p.unsigned_abs())
}

/// `limit` query value: invalid or non-positive means 20, capped at 50.
pub fn limit_from_query(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|l| *l > 0)
        .map_or(DEFAULT_PAGE_SIZE, |l| l.unsigned_abs().min(MAX_PAGE_SIZE))
}

/// Raw listing parameters as they arrive in the query string.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub include_inactive: Option<String>,
}

impl ProductQuery {
    /// `include_inactive` is honored only for admins and only for the value `true`.
    pub fn into_filter(self, caller_is_admin: bool) -> Result<ProductFilter, ApiError> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid categoryId"))?,
            ),
        };
        Ok(ProductFilter {
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            category_id,
            include_inactive: caller_is_admin && self.include_inactive.as_deref() == Some("true"),
            page: page_from_query(self.page.as_deref()),
            limit: limit_from_query(self.limit.as_deref()),
        })
    }
}

pub fn list_categories(executor: &dyn DbExecutor) -> Result<Vec<Category>, ApiError> {
    Ok(category::list(executor)?)
}

pub fn get_category(executor: &dyn DbExecutor, id: Uuid) -> Result<Category, ApiError> {
    category::find_by_id(executor, id)?.ok_or_else(|| ApiError::not_found("Category not found"))
}

pub fn create_category(executor: &dyn DbExecutor, name: &str) -> Result<Category, ApiError> {
    Ok(category::insert(executor, name.trim())?)
}

pub fn update_category(executor: &dyn DbExecutor, id: Uuid, name: &str) -> Result<Category, ApiError> {
    category::rename(executor, id, name.trim())?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

pub fn delete_category(executor: &dyn DbExecutor, id: Uuid) -> Result<(), ApiError> {
    match category::delete(executor, id) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::not_found("Category not found")),
        Err(e) => match e.constraint_violation() {
            Some(ConstraintViolation::ForeignKey { .. }) => Err(ApiError::bad_request(
                "Category is still referenced by products",
            )),
            _ => Err(e.into()),
        },
    }
}

pub fn list_products(executor: &dyn DbExecutor, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    Ok(product::list(executor, filter)?)
}

pub fn get_product(executor: &dyn DbExecutor, id: Uuid) -> Result<Product, ApiError> {
    product::find_with_category(executor, id)?.ok_or_else(|| ApiError::not_found("Product not found"))
}

/// Product fields from a create request; `category_id` is still raw text.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub title: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub category_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub title: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub category_id: Option<String>,
}

/// Resolve a category reference; unknown or malformed ids are a 400.
fn existing_category(executor: &dyn DbExecutor, raw: &str) -> Result<Uuid, ApiError> {
    let invalid = || ApiError::bad_request("Invalid categoryId");
    let id = Uuid::parse_str(raw.trim()).map_err(|_| invalid())?;
    category::find_by_id(executor, id)?.ok_or_else(invalid)?;
    Ok(id)
}

pub fn create_product(executor: &dyn DbExecutor, input: CreateProductInput) -> Result<Product, ApiError> {
    let category_id = existing_category(executor, &input.category_id)?;
    let created = product::insert(
        executor,
        &NewProduct {
            title: input.title,
            sku: input.sku,
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            image_url: input.image_url,
            is_active: input.is_active.unwrap_or(true),
            category_id,
        },
    )?;
    get_product(executor, created.id)
}

pub fn update_product(
    executor: &dyn DbExecutor,
    id: Uuid,
    input: UpdateProductInput,
) -> Result<Product, ApiError> {
    if product::find_by_id(executor, id)?.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }
    let category_id = input
        .category_id
        .as_deref()
        .map(|raw| existing_category(executor, raw))
        .transpose()?;

    let changes = ProductChanges {
        title: input.title,
        sku: input.sku,
        description: input.description,
        price_cents: input.price_cents,
        stock: input.stock,
        image_url: input.image_url,
        is_active: input.is_active,
        category_id,
    };
    product::update(executor, id, &changes)?.ok_or_else(|| ApiError::not_found("Product not found"))?;
    get_product(executor, id)
}

/// Soft delete.
pub fn delete_product(executor: &dyn DbExecutor, id: Uuid) -> Result<(), ApiError> {
    if product::deactivate(executor, id)? {
        Ok(())
    } else {
        Err(ApiError::not_found("Product not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        assert_eq!(page_from_query(None), 1);
        assert_eq!(page_from_query(Some("0")), 1);
        assert_eq!(page_from_query(Some("-3")), 1);
        assert_eq!(page_from_query(Some("abc")), 1);
        assert_eq!(page_from_query(Some("4")), 4);
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(limit_from_query(None), 20);
        assert_eq!(limit_from_query(Some("0")), 20);
        assert_eq!(limit_from_query(Some("x")), 20);
        assert_eq!(limit_from_query(Some("7")), 7);
        assert_eq!(limit_from_query(Some("500")), 50);
    }

    #[test]
    fn test_include_inactive_needs_admin_and_literal_true() {
        let query = || ProductQuery {
            include_inactive: Some("true".to_string()),
            ..ProductQuery::default()
        };
        assert!(query().into_filter(true).unwrap().include_inactive);
        assert!(!query().into_filter(false).unwrap().include_inactive);

        let yes = ProductQuery {
            include_inactive: Some("1".to_string()),
            ..ProductQuery::default()
        };
        assert!(!yes.into_filter(true).unwrap().include_inactive);
    }

    #[test]
    fn test_search_is_trimmed_and_blank_ignored() {
        let filter = ProductQuery {
            search: Some("  mouse ".to_string()),
            ..ProductQuery::default()
        }
        .into_filter(false)
        .unwrap();
        assert_eq!(filter.search.as_deref(), Some("mouse"));

        let filter = ProductQuery {
            search: Some("   ".to_string()),
            ..ProductQuery::default()
        }
        .into_filter(false)
        .unwrap();
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_malformed_category_filter_is_400() {
        let err = ProductQuery {
            category_id: Some("cm123".to_string()),
            ..ProductQuery::default()
        }
        .into_filter(false)
        .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_create_with_malformed_category_is_400() {
        let recorder = crate::executor::RecordingExecutor::new();
        let err = create_product(
            &recorder,
            CreateProductInput {
                title: "Mouse".to_string(),
                sku: "M-1".to_string(),
                description: None,
                price_cents: 100,
                stock: 1,
                image_url: None,
                is_active: None,
                category_id: "not-a-uuid".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid categoryId");
    }
}
