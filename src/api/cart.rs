use super::validate::{checked, Body, Text};
use super::{caller_with_role, connection, path_id};
use crate::entity::Role;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::service::cart as service;
use crate::state::AppState;
use serde_json::json;

const ITEM_NOT_FOUND: &str = "Cart item not found";

pub fn get_cart(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer])?;
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::get_cart(&conn, user.id)?))
}

pub fn add_item(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer])?;
    let mut body = Body::parse(&req.body, &["productId", "quantity"])?;
    let product_id = body.string("productId", Text::ANY);
    let quantity = body.int32("quantity", 1);
    body.finish()?;

    let conn = connection(state)?;
    let item = service::add_item(&conn, user.id, &checked(product_id)?, checked(quantity)?)?;
    Ok(HttpResponse::created(&item))
}

pub fn update_item(state: &AppState, req: &HttpRequest, raw_product_id: &str) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer])?;
    let mut body = Body::parse(&req.body, &["quantity"])?;
    let quantity = body.int32("quantity", 1);
    body.finish()?;
    let product_id = path_id(raw_product_id, ITEM_NOT_FOUND)?;

    let conn = connection(state)?;
    let item = service::update_quantity(&conn, user.id, product_id, checked(quantity)?)?;
    Ok(HttpResponse::ok(&item))
}

pub fn remove_item(state: &AppState, req: &HttpRequest, raw_product_id: &str) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer])?;
    let product_id = path_id(raw_product_id, ITEM_NOT_FOUND)?;

    let conn = connection(state)?;
    service::remove_item(&conn, user.id, product_id)?;
    Ok(HttpResponse::ok(&json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use crate::api::handle;
    use crate::api::test_support::{bearer, state};
    use crate::entity::Role;
    use crate::http::HttpRequest;

    #[test]
    fn test_quantity_must_be_positive() {
        let state = state();
        let req = HttpRequest::new("POST", "/cart/items")
            .with_header("authorization", &bearer(&state, Role::Customer))
            .with_body(r#"{"productId":"p","quantity":0}"#);
        let res = handle(&state, &req);
        assert_eq!(res.status, 400);
        assert_eq!(res.json_body()["message"][0], "quantity must not be less than 1");
    }

    #[test]
    fn test_unknown_line_id_is_404() {
        let state = state();
        let req = HttpRequest::new("DELETE", "/cart/items/not-a-uuid")
            .with_header("authorization", &bearer(&state, Role::Customer));
        let res = handle(&state, &req);
        assert_eq!(res.status, 404);
        assert_eq!(res.json_body()["message"], "Cart item not found");
    }
}
