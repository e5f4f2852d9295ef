//! Shared setup: a migrated database from `TEST_DATABASE_URL` and an
//! in-process `AppState` driven through `api::handle`.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use serde_json::Value;
use std::time::Duration;
use storefront::auth::TokenService;
use storefront::config::DatabaseConfig;
use storefront::http::{CorsPolicy, HttpRequest, HttpResponse};
use storefront::migration::Migrator;
use storefront::notify::Notifier;
use storefront::service::auth::AdminAccount;
use storefront::{api, connect, migrations, AppState, ConnectionPool, PgExecutor};

pub const ADMIN_EMAIL: &str = "reserved-admin@test.local";
pub const ADMIN_PASSWORD: &str = "Reserved123!";

static MIGRATED: Lazy<Result<(), String>> = Lazy::new(|| {
    let url = database_url().ok_or("TEST_DATABASE_URL not set")?;
    let conn = PgExecutor::new(connect(&url).map_err(|e| e.to_string())?);
    Migrator::new(migrations::all())
        .and_then(|m| m.up(&conn, None))
        .map(|_| ())
        .map_err(|e| e.to_string())
});

pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Direct connection for setup SQL the HTTP surface cannot express.
pub fn raw_connection() -> PgExecutor {
    let url = database_url().expect("TEST_DATABASE_URL");
    PgExecutor::new(connect(&url).expect("connect to test database"))
}

/// `None` (after a note on stderr) when no test database is configured.
pub fn app() -> Option<AppState> {
    let url = match database_url() {
        Some(url) => url,
        None => {
            eprintln!("skipping: TEST_DATABASE_URL is not set");
            return None;
        }
    };
    if let Err(e) = &*MIGRATED {
        panic!("migrating test database failed: {e}");
    }
    Some(AppState {
        pool: ConnectionPool::new(&DatabaseConfig {
            url,
            max_connections: 4,
            pool_timeout_seconds: 5,
        }),
        tokens: TokenService::new("integration-secret", Duration::from_secs(600)),
        admin: Some(AdminAccount {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
        notifier: Notifier::disabled(),
        uploader: None,
        cors: CorsPolicy::from_setting(None),
    })
}

pub fn call(state: &AppState, method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> HttpResponse {
    let mut req = HttpRequest::new(method, path);
    if let Some(token) = token {
        req = req.with_header("Authorization", &format!("Bearer {token}"));
    }
    if let Some(body) = body {
        req = req
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string());
    }
    api::handle(state, &req)
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Register (when `role` is given) and log in; returns the access token.
pub fn login_as(state: &AppState, email: &str, password: &str, role: Option<&str>) -> String {
    if let Some(role) = role {
        let res = call(
            state,
            "POST",
            "/auth/register",
            None,
            Some(serde_json::json!({ "email": email, "password": password, "role": role })),
        );
        assert_eq!(res.status, 201, "register {email}: {}", res.json_body());
    }
    let res = call(
        state,
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    );
    assert_eq!(res.status, 201, "login {email}: {}", res.json_body());
    res.json_body()["accessToken"]
        .as_str()
        .expect("accessToken")
        .to_string()
}
