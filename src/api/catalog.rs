use super::validate::{checked, Body, Text};
use super::{caller, caller_with_role, connection, path_id};
use crate::entity::Role;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::service::catalog::{self as service, CreateProductInput, ProductQuery, UpdateProductInput};
use crate::state::AppState;
use serde_json::json;

const CATEGORY_NOT_FOUND: &str = "Category not found";
const PRODUCT_NOT_FOUND: &str = "Product not found";

fn category_name(body: &mut Body) -> Option<String> {
    body.string(
        "name",
        Text {
            trim: true,
            min: 2,
            ..Text::ANY
        },
    )
}

pub fn list_categories(state: &AppState) -> Result<HttpResponse, ApiError> {
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::list_categories(&conn)?))
}

pub fn get_category(state: &AppState, raw_id: &str) -> Result<HttpResponse, ApiError> {
    let id = path_id(raw_id, CATEGORY_NOT_FOUND)?;
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::get_category(&conn, id)?))
}

pub fn create_category(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let mut body = Body::parse(&req.body, &["name"])?;
    let name = category_name(&mut body);
    body.finish()?;

    let conn = connection(state)?;
    let created = service::create_category(&conn, &checked(name)?)?;
    log::info!("category {} created", created.id);
    Ok(HttpResponse::created(&created))
}

pub fn update_category(state: &AppState, req: &HttpRequest, raw_id: &str) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let mut body = Body::parse(&req.body, &["name"])?;
    let name = category_name(&mut body);
    body.finish()?;
    let id = path_id(raw_id, CATEGORY_NOT_FOUND)?;

    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::update_category(&conn, id, &checked(name)?)?))
}

pub fn delete_category(state: &AppState, req: &HttpRequest, raw_id: &str) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let id = path_id(raw_id, CATEGORY_NOT_FOUND)?;

    let conn = connection(state)?;
    service::delete_category(&conn, id)?;
    log::info!("category {id} deleted");
    Ok(HttpResponse::ok(&json!({ "deleted": true })))
}

/// `GET /products`. Public; an admin token unlocks `includeInactive`.
pub fn list_products(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let is_admin = req.header("authorization").is_some()
        && caller(state, req).is_ok_and(|user| user.role == Role::Admin);

    let param = |name: &str| req.query_param(name).map(str::to_string);
    let filter = ProductQuery {
        search: param("search"),
        category_id: param("categoryId"),
        page: param("page"),
        limit: param("limit"),
        include_inactive: param("includeInactive"),
    }
    .into_filter(is_admin)?;

    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::list_products(&conn, &filter)?))
}

pub fn get_product(state: &AppState, raw_id: &str) -> Result<HttpResponse, ApiError> {
    let id = path_id(raw_id, PRODUCT_NOT_FOUND)?;
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::get_product(&conn, id)?))
}

const PRODUCT_FIELDS: &[&str] = &[
    "title",
    "description",
    "priceCents",
    "sku",
    "stock",
    "isActive",
    "imageUrl",
    "categoryId",
];

pub fn create_product(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let mut body = Body::parse(&req.body, PRODUCT_FIELDS)?;
    let title = body.string("title", Text::min(2));
    let description = body.optional_string("description", Text::ANY);
    let price_cents = body.int("priceCents", 0);
    let sku = body.string("sku", Text::min(2));
    let stock = body.int32("stock", 0);
    let is_active = body.optional_bool("isActive");
    let image_url = body.optional_string("imageUrl", Text::ANY);
    let category_id = body.string("categoryId", Text::ANY);
    body.finish()?;

    let input = CreateProductInput {
        title: checked(title)?,
        sku: checked(sku)?,
        description,
        price_cents: checked(price_cents)?,
        stock: checked(stock)?,
        image_url,
        is_active,
        category_id: checked(category_id)?,
    };
    let conn = connection(state)?;
    let created = service::create_product(&conn, input)?;
    log::info!("product {} ({}) created", created.id, created.sku);
    Ok(HttpResponse::created(&created))
}

pub fn update_product(state: &AppState, req: &HttpRequest, raw_id: &str) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let mut body = Body::parse(&req.body, PRODUCT_FIELDS)?;
    let input = UpdateProductInput {
        title: body.optional_string("title", Text::min(2)),
        description: body.optional_string("description", Text::ANY),
        price_cents: body.optional_int("priceCents", 0),
        sku: body.optional_string("sku", Text::min(2)),
        stock: body.optional_int32("stock", 0),
        is_active: body.optional_bool("isActive"),
        image_url: body.optional_string("imageUrl", Text::ANY),
        category_id: body.optional_string("categoryId", Text::ANY),
    };
    body.finish()?;
    let id = path_id(raw_id, PRODUCT_NOT_FOUND)?;

    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::update_product(&conn, id, input)?))
}

/// Soft delete.
pub fn delete_product(state: &AppState, req: &HttpRequest, raw_id: &str) -> Result<HttpResponse, ApiError> {
    caller_with_role(state, req, &[Role::Admin])?;
    let id = path_id(raw_id, PRODUCT_NOT_FOUND)?;

    let conn = connection(state)?;
    service::delete_product(&conn, id)?;
    log::info!("product {id} deactivated");
    Ok(HttpResponse::ok(&json!({ "deleted": true, "soft": true })))
}
