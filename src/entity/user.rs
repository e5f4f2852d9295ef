use crate::executor::{DbError, DbExecutor};
use crate::query::statement::fetch_returning;
use crate::query::{Entity, FromRow, SelectQuery};
use chrono::{DateTime, Utc};
use may_postgres::Row;
use sea_query::{Expr, ExprTrait};
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    /// Account role; admins manage the catalog and orders.
    pub enum Role {
        Customer => "CUSTOMER",
        Admin => "ADMIN",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "email", "password_hash", "role", "created_at"];
}

pub fn find_by_id(executor: &dyn DbExecutor, id: Uuid) -> Result<Option<User>, DbError> {
    SelectQuery::<User>::new()
        .filter(Expr::col("id").eq(id))
        .one(executor)
}

/// `email` must already be normalized.
pub fn find_by_email(executor: &dyn DbExecutor, email: &str) -> Result<Option<User>, DbError> {
    SelectQuery::<User>::new()
        .filter(Expr::col("email").eq(email))
        .one(executor)
}

/// Insert a new account. A taken email surfaces as a unique violation.
pub fn insert(
    executor: &dyn DbExecutor,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, DbError> {
    let sql = format!(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
        User::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[&Uuid::new_v4(), &email, &password_hash, &role.as_str()],
    )
}

/// Create the account or overwrite its hash and role if the email exists.
pub fn upsert_credentials(
    executor: &dyn DbExecutor,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, DbError> {
    let sql = format!(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (email) DO UPDATE \
         SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role \
         RETURNING {}",
        User::column_list()
    );
    fetch_returning(
        executor,
        &sql,
        &[&Uuid::new_v4(), &email, &password_hash, &role.as_str()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    #[test]
    fn test_role_text_round_trip() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Customer.to_string(), "CUSTOMER");
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown Role value `admin`");
    }

    #[test]
    fn test_user_json_hides_password_hash() {
        let user = User {
            id: Uuid::nil(),
            email: "a@b.co".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            role: Role::Admin,
            created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "ADMIN");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_upsert_overwrites_on_email_conflict() {
        let recorder = RecordingExecutor::new();
        // The recorder has no rows to return, so the call itself fails.
        assert!(upsert_credentials(&recorder, "a@b.co", "hash", Role::Admin).is_err());
        let sql = &recorder.statements()[0];
        assert!(sql.contains("ON CONFLICT (email) DO UPDATE"), "{sql}");
        assert!(sql.ends_with("RETURNING id, email, password_hash, role, created_at"), "{sql}");
    }
}
