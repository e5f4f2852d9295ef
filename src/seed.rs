//! Demo data: an admin, a customer, three categories and three products.
//!
//! Safe to run repeatedly. Accounts get their role and password reset, and
//! products are matched by SKU.

use crate::auth::password;
use crate::entity::product::{self, NewProduct};
use crate::entity::{category, user, Role};
use crate::executor::{DbError, PgExecutor};

const DEFAULT_ADMIN_EMAIL: &str = "admin@store.local";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin12345!";
const DEFAULT_CUSTOMER_EMAIL: &str = "customer@store.local";
const DEFAULT_CUSTOMER_PASSWORD: &str = "Customer12345!";

const CATEGORIES: &[&str] = &["Mouse", "Keyboard", "Monitor"];

struct SeedProduct {
    title: &'static str,
    description: &'static str,
    price_cents: i64,
    sku: &'static str,
    stock: i32,
    image_url: &'static str,
    category: &'static str,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        title: "Logitech Mouse M90",
        description: "Wired USB mouse",
        price_cents: 599,
        sku: "M90-001",
        stock: 50,
        image_url: "https://example.com/mouse.png",
        category: "Mouse",
    },
    SeedProduct {
        title: "Mechanical Keyboard K120",
        description: "Compact mechanical keyboard",
        price_cents: 2999,
        sku: "K120-001",
        stock: 30,
        image_url: "https://example.com/keyboard.png",
        category: "Keyboard",
    },
    SeedProduct {
        title: "24-inch Monitor FHD",
        description: "1080p IPS display",
        price_cents: 12999,
        sku: "MON-24FHD",
        stock: 15,
        image_url: "https://example.com/monitor.png",
        category: "Monitor",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAccounts {
    pub admin_email: String,
    pub admin_password: String,
    pub customer_email: String,
    pub customer_password: String,
}

impl SeedAccounts {
    /// `SEED_*` variables first, then `ADMIN_EMAIL`/`ADMIN_PASSWORD`, then defaults.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str], default: &str| {
            keys.iter()
                .find_map(|key| lookup(key))
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            admin_email: first(&["SEED_ADMIN_EMAIL", "ADMIN_EMAIL"], DEFAULT_ADMIN_EMAIL)
                .trim()
                .to_lowercase(),
            admin_password: first(&["SEED_ADMIN_PASSWORD", "ADMIN_PASSWORD"], DEFAULT_ADMIN_PASSWORD),
            customer_email: first(&["SEED_CUSTOMER_EMAIL"], DEFAULT_CUSTOMER_EMAIL)
                .trim()
                .to_lowercase(),
            customer_password: first(&["SEED_CUSTOMER_PASSWORD"], DEFAULT_CUSTOMER_PASSWORD),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub products: usize,
}

fn hash(plain: &str) -> Result<String, DbError> {
    password::hash(plain).map_err(|e| DbError::Other(format!("password hashing failed: {e}")))
}

/// Write the demo data in one transaction.
pub fn run(conn: &PgExecutor, accounts: &SeedAccounts) -> Result<SeedSummary, DbError> {
    let tx = conn.begin()?;
    let mut summary = SeedSummary::default();

    let admin_hash = hash(&accounts.admin_password)?;
    user::upsert_credentials(&tx, &accounts.admin_email, &admin_hash, Role::Admin)?;
    let customer_hash = hash(&accounts.customer_password)?;
    user::upsert_credentials(&tx, &accounts.customer_email, &customer_hash, Role::Customer)?;
    summary.users = 2;

    let mut categories = Vec::with_capacity(CATEGORIES.len());
    for name in CATEGORIES {
        categories.push(category::ensure(&tx, name)?);
    }
    summary.categories = categories.len();

    for seed in PRODUCTS {
        let Some(category) = categories.iter().find(|c| c.name == seed.category) else {
            continue;
        };
        product::upsert_by_sku(
            &tx,
            &NewProduct {
                title: seed.title.to_string(),
                sku: seed.sku.to_string(),
                description: Some(seed.description.to_string()),
                price_cents: seed.price_cents,
                stock: seed.stock,
                image_url: Some(seed.image_url.to_string()),
                is_active: true,
                category_id: category.id,
            },
        )?;
        summary.products += 1;
    }

    tx.commit()?;
    log::info!(
        "seed complete: admin {}, customer {}, {} categories, {} products",
        accounts.admin_email,
        accounts.customer_email,
        summary.categories,
        summary.products
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_fall_back_through_admin_settings() {
        let accounts = SeedAccounts::from_env(|key| match key {
            "ADMIN_EMAIL" => Some(" Owner@Shop.Test ".to_string()),
            "SEED_ADMIN_PASSWORD" => Some("seed-pass".to_string()),
            "ADMIN_PASSWORD" => Some("ignored".to_string()),
            _ => None,
        });
        assert_eq!(accounts.admin_email, "owner@shop.test");
        assert_eq!(accounts.admin_password, "seed-pass");
        assert_eq!(accounts.customer_email, DEFAULT_CUSTOMER_EMAIL);
        assert_eq!(accounts.customer_password, DEFAULT_CUSTOMER_PASSWORD);
    }

    #[test]
    fn test_every_product_has_a_seeded_category() {
        for seed in PRODUCTS {
            assert!(CATEGORIES.contains(&seed.category), "{}", seed.sku);
        }
    }
}
