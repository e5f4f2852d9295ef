//! Registration, login and the reserved admin account.

use crate::auth::{password, AuthUser, TokenService};
use crate::config::AuthConfig;
use crate::entity::user::{self, Role, User};
use crate::error::ApiError;
use crate::executor::{ConstraintViolation, DbExecutor};
use serde::Serialize;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The configured address that always resolves to an administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
}

impl AdminAccount {
    /// `None` unless both email and password are configured.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let email = normalize_email(config.admin_email.as_deref()?);
        let password = config.admin_password.clone()?;
        (!email.is_empty() && !password.is_empty()).then_some(Self { email, password })
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PublicUser,
}

fn hash_password(plain: &str) -> Result<String, ApiError> {
    password::hash(plain).map_err(|e| {
        log::error!("password hashing failed: {e}");
        ApiError::internal()
    })
}

/// Make sure the reserved admin row exists with the configured password.
fn ensure_admin(executor: &dyn DbExecutor, admin: &AdminAccount) -> Result<User, ApiError> {
    if let Some(existing) = user::find_by_email(executor, &admin.email)? {
        if existing.role == Role::Admin && password::verify(&admin.password, &existing.password_hash) {
            return Ok(existing);
        }
        log::info!("repairing reserved admin account {}", admin.email);
    }
    let hash = hash_password(&admin.password)?;
    Ok(user::upsert_credentials(executor, &admin.email, &hash, Role::Admin)?)
}

pub fn register(
    executor: &dyn DbExecutor,
    admin: Option<&AdminAccount>,
    input: RegisterInput,
) -> Result<User, ApiError> {
    let email = normalize_email(&input.email);

    if let Some(admin) = admin.filter(|a| a.email == email) {
        if input.password != admin.password {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        return ensure_admin(executor, admin);
    }

    if user::find_by_email(executor, &email)?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let hash = hash_password(&input.password)?;
    let role = input.role.unwrap_or(Role::Customer);
    user::insert(executor, &email, &hash, role).map_err(|e| {
        // Lost a race with a concurrent registration.
        if let Some(ConstraintViolation::Unique { .. }) = e.constraint_violation() {
            ApiError::bad_request("Email already exists")
        } else {
            ApiError::from(e)
        }
    })
}

pub fn login(
    executor: &dyn DbExecutor,
    admin: Option<&AdminAccount>,
    tokens: &TokenService,
    email: &str,
    password_plain: &str,
) -> Result<LoginResponse, ApiError> {
    let email = normalize_email(email);

    let account = match admin.filter(|a| a.email == email && a.password == password_plain) {
        Some(admin) => ensure_admin(executor, admin)?,
        None => {
            let found = user::find_by_email(executor, &email)?
                .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
            if !password::verify(password_plain, &found.password_hash) {
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            found
        }
    };

    let access_token = tokens.issue(&account).map_err(|e| {
        log::error!("failed to sign access token: {e}");
        ApiError::internal()
    })?;

    Ok(LoginResponse {
        access_token,
        user: PublicUser {
            id: account.id,
            email: account.email,
            role: account.role,
        },
    })
}

/// The caller's stored record; 401 if the account is gone.
pub fn me(executor: &dyn DbExecutor, caller: &AuthUser) -> Result<User, ApiError> {
    user::find_by_id(executor, caller.id)?.ok_or_else(ApiError::unauthorized)
}
