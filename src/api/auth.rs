use super::validate::{checked, Body, Text};
use super::{caller, connection};
use crate::entity::Role;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::service::auth::{self as service, RegisterInput};
use crate::state::AppState;

const ROLES: &[&str] = &["CUSTOMER", "ADMIN"];

/// `POST /auth/register`
pub fn register(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut body = Body::parse(&req.body, &["email", "password", "role"])?;
    let email = body.email("email");
    let password = body.string("password", Text::min(6));
    let role = body.optional_enum::<Role>("role", ROLES);
    body.finish()?;

    let input = RegisterInput {
        email: checked(email)?,
        password: checked(password)?,
        role,
    };
    let conn = connection(state)?;
    let user = service::register(&conn, state.admin.as_ref(), input)?;
    Ok(HttpResponse::created(&user))
}

/// `POST /auth/login`
pub fn login(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut body = Body::parse(&req.body, &["email", "password"])?;
    let email = body.email("email");
    let password = body.string("password", Text::ANY);
    body.finish()?;

    let conn = connection(state)?;
    let response = service::login(
        &conn,
        state.admin.as_ref(),
        &state.tokens,
        &checked(email)?,
        &checked(password)?,
    )?;
    Ok(HttpResponse::created(&response))
}

/// `GET /auth/me`
pub fn me(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = caller(state, req)?;
    let conn = connection(state)?;
    Ok(HttpResponse::ok(&service::me(&conn, &user)?))
}

#[cfg(test)]
mod tests {
    use crate::api::handle;
    use crate::api::test_support::state;
    use crate::http::HttpRequest;

    fn post(path: &str, body: &str) -> HttpRequest {
        HttpRequest::new("POST", path)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    #[test]
    fn test_register_collects_every_field_error() {
        let res = handle(
            &state(),
            &post(
                "/auth/register",
                r#"{"email":"not-an-email","password":"123","role":"ROOT","nickname":"x"}"#,
            ),
        );
        assert_eq!(res.status, 400);
        let body = res.json_body();
        let messages: Vec<&str> = body["message"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m.as_str())
            .collect();
        assert!(messages.contains(&"property nickname should not exist"));
        assert!(messages.contains(&"email must be an email"));
        assert!(messages.contains(&"password must be longer than or equal to 6 characters"));
        assert!(messages.contains(&"role must be one of the following values: CUSTOMER, ADMIN"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let res = handle(&state(), &post("/auth/login", "{}"));
        assert_eq!(res.status, 400);
        assert_eq!(res.json_body()["error"], "Bad Request");
    }

    #[test]
    fn test_login_rejects_non_object_body() {
        let res = handle(&state(), &post("/auth/login", "[1,2]"));
        assert_eq!(res.status, 400);
        assert_eq!(res.json_body()["message"], "Request body must be a JSON object");
    }
}
