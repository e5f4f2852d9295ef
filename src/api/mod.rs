//! Request dispatch: route, guard, validate, then call into `service`.
//!
//! Handlers authenticate and validate before checking out a database
//! connection, so rejected requests never touch the pool.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod upload;
pub mod validate;

use crate::auth::{authenticate, require_role, AuthUser};
use crate::entity::Role;
use crate::error::ApiError;
use crate::http::{route, HttpRequest, HttpResponse, Route};
use crate::pool::PooledConnection;
use crate::state::AppState;
use serde_json::json;
use uuid::Uuid;

/// Produce the response for `req`. Never fails; errors become JSON bodies.
pub fn handle(state: &AppState, req: &HttpRequest) -> HttpResponse {
    match dispatch(state, req) {
        Ok(response) => response,
        Err(err) => {
            if err.status() >= 500 {
                log::error!("{} {} failed: {err}", req.method, req.path);
            } else {
                log::debug!("{} {} rejected: {err}", req.method, req.path);
            }
            HttpResponse::from(err)
        }
    }
}

fn dispatch(state: &AppState, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
    match route(&req.method, &req.path) {
        Route::Health => health(state),
        Route::Metrics => Ok(HttpResponse::metrics(crate::metrics::render())),
        Route::Preflight => Ok(HttpResponse::no_content()),

        Route::Register => auth::register(state, req),
        Route::Login => auth::login(state, req),
        Route::Me => auth::me(state, req),

        Route::ListCategories => catalog::list_categories(state),
        Route::CreateCategory => catalog::create_category(state, req),
        Route::GetCategory(id) => catalog::get_category(state, id),
        Route::UpdateCategory(id) => catalog::update_category(state, req, id),
        Route::DeleteCategory(id) => catalog::delete_category(state, req, id),

        Route::ListProducts => catalog::list_products(state, req),
        Route::CreateProduct => catalog::create_product(state, req),
        Route::GetProduct(id) => catalog::get_product(state, id),
        Route::UpdateProduct(id) => catalog::update_product(state, req, id),
        Route::DeleteProduct(id) => catalog::delete_product(state, req, id),

        Route::GetCart => cart::get_cart(state, req),
        Route::AddCartItem => cart::add_item(state, req),
        Route::UpdateCartItem(product_id) => cart::update_item(state, req, product_id),
        Route::RemoveCartItem(product_id) => cart::remove_item(state, req, product_id),

        Route::CreateOrder => orders::create(state, req),
        Route::ListOrders => orders::list(state, req),
        Route::UpdateOrderStatus(id) => orders::update_status(state, req, id),

        Route::Upload => upload::upload(state, req),

        Route::NotFound => Err(ApiError::not_found(format!(
            "Cannot {} {}",
            req.method, req.path
        ))),
    }
}

/// `{"status":"ok"}` when a pooled connection answers `SELECT 1`.
fn health(state: &AppState) -> Result<HttpResponse, ApiError> {
    let conn = connection(state)?;
    match conn.check_health() {
        Ok(true) => Ok(HttpResponse::ok(&json!({ "status": "ok" }))),
        Ok(false) | Err(_) => {
            conn.discard();
            Err(ApiError::ServiceUnavailable(
                "Database is not reachable".to_string(),
            ))
        }
    }
}

pub(crate) fn connection(state: &AppState) -> Result<PooledConnection, ApiError> {
    Ok(state.pool.get()?)
}

/// The authenticated caller; 401 without a valid bearer token.
pub(crate) fn caller(state: &AppState, req: &HttpRequest) -> Result<AuthUser, ApiError> {
    authenticate(&state.tokens, req.header("authorization"))
}

/// The authenticated caller, who must hold one of `roles`.
pub(crate) fn caller_with_role(
    state: &AppState,
    req: &HttpRequest,
    roles: &[Role],
) -> Result<AuthUser, ApiError> {
    let user = caller(state, req)?;
    require_role(&user, roles)?;
    Ok(user)
}

/// Resource id from the path; anything that is not a UUID cannot exist.
pub(crate) fn path_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(not_found))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::TokenService;
    use crate::config::DatabaseConfig;
    use crate::entity::{Role, User};
    use crate::http::CorsPolicy;
    use crate::notify::Notifier;
    use crate::pool::ConnectionPool;
    use crate::state::AppState;
    use std::time::Duration;
    use uuid::Uuid;

    /// State whose pool points at a closed port; handlers under test must
    /// answer before checking out a connection.
    pub fn state() -> AppState {
        AppState {
            pool: ConnectionPool::new(&DatabaseConfig {
                url: "postgres://nobody@127.0.0.1:1/none".to_string(),
                max_connections: 1,
                pool_timeout_seconds: 0,
            }),
            tokens: TokenService::new("test-secret", Duration::from_secs(300)),
            admin: None,
            notifier: Notifier::disabled(),
            uploader: None,
            cors: CorsPolicy::from_setting(None),
        }
    }

    pub fn bearer(state: &AppState, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@store.local", role.as_str().to_lowercase()),
            password_hash: String::new(),
            role,
            created_at: chrono::Utc::now(),
        };
        format!("Bearer {}", state.tokens.issue(&user).unwrap())
    }
}
