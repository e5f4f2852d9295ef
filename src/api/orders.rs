use super::validate::{checked, Body, Text};
use super::{caller_with_role, connection, path_id};
use crate::entity::{OrderStatus, Role, Shipping};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::service::orders as service;
use crate::state::AppState;

const STATUSES: &[&str] = &["PENDING", "PAID", "SHIPPED", "COMPLETED", "CANCELED"];

/// Optional shipping text: trimmed, bounded, and empty stored as NULL.
fn optional_line(body: &mut Body, name: &str, max: usize) -> Option<String> {
    body.optional_string(
        name,
        Text {
            trim: true,
            max: Some(max),
            ..Text::ANY
        },
    )
    .filter(|value| !value.is_empty())
}

/// Required fields come back `None` only after recording an error.
fn shipping(body: &mut Body) -> Shipping {
    Shipping {
        name: body.string("shippingName", Text::trimmed(120)),
        phone: body.string("shippingPhone", Text::trimmed(40)),
        street: body.string("shippingStreet", Text::trimmed(120)),
        house: optional_line(body, "shippingHouse", 120),
        city_province: body.string("shippingCityProvince", Text::trimmed(120)),
        district: optional_line(body, "shippingDistrict", 80),
    }
}

/// `POST /orders`: checkout the caller's cart.
pub fn create(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer])?;
    let mut body = Body::parse(
        &req.body,
        &[
            "shippingName",
            "shippingPhone",
            "shippingStreet",
            "shippingHouse",
            "shippingCityProvince",
            "shippingDistrict",
        ],
    )?;
    let shipping = shipping(&mut body);
    body.finish()?;

    let conn = connection(state)?;
    let order = service::create_from_cart(&conn, &state.notifier, user.id, shipping)?;
    Ok(HttpResponse::created(&order))
}

pub fn list(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = caller_with_role(state, req, &[Role::Customer, Role::Admin])?;
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::list_orders(&conn, &user)?))
}

pub fn update_status(state: &AppState, req: &HttpRequest, raw_id: &str) -> Result<HttpResponse, ApiError> {
    let admin = caller_with_role(state, req, &[Role::Admin])?;
    let mut body = Body::parse(&req.body, &["status"])?;
    let status = body.required_enum::<OrderStatus>("status", STATUSES);
    body.finish()?;
    let status = checked(status)?;
    let id = path_id(raw_id, "Order not found")?;

    let conn = connection(state)?;
    let order = service::update_status(&conn, id, status)?;
    log::info!("order {id} set to {status} by {}", admin.email);
    Ok(HttpResponse::ok(&order))
}

#[cfg(test)]
mod tests {
    use crate::api::handle;
    use crate::api::test_support::{bearer, state};
    use crate::entity::Role;
    use crate::http::HttpRequest;

    #[test]
    fn test_shipping_fields_are_required_and_bounded() {
        let state = state();
        let long_phone = "9".repeat(41);
        let req = HttpRequest::new("POST", "/orders")
            .with_header("authorization", &bearer(&state, Role::Customer))
            .with_body(format!(
                r#"{{"shippingName":"   ","shippingPhone":"{long_phone}","shippingStreet":"1 Main St"}}"#
            ));
        let res = handle(&state, &req);
        assert_eq!(res.status, 400);
        let messages: Vec<String> =
            serde_json::from_value(res.json_body()["message"].clone()).unwrap();
        assert_eq!(
            messages,
            vec![
                "shippingName should not be empty",
                "shippingPhone must be shorter than or equal to 40 characters",
                "shippingCityProvince must be a string",
            ]
        );
    }

    #[test]
    fn test_invalid_status_lists_allowed_values() {
        let state = state();
        let req = HttpRequest::new("PATCH", "/orders/abc/status")
            .with_header("authorization", &bearer(&state, Role::Admin))
            .with_body(r#"{"status":"LOST"}"#);
        let res = handle(&state, &req);
        assert_eq!(res.status, 400);
        assert_eq!(
            res.json_body()["message"][0],
            "status must be one of the following values: PENDING, PAID, SHIPPED, COMPLETED, CANCELED"
        );
    }

    #[test]
    fn test_valid_status_on_malformed_id_is_404() {
        let state = state();
        let req = HttpRequest::new("PATCH", "/orders/abc/status")
            .with_header("authorization", &bearer(&state, Role::Admin))
            .with_body(r#"{"status":"PAID"}"#);
        let res = handle(&state, &req);
        assert_eq!(res.status, 404);
        assert_eq!(res.json_body()["message"], "Order not found");
    }
}
