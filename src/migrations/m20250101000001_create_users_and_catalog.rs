//! Migration: users, categories, products
//! Version: 20250101000001

use crate::executor::DbError;
use crate::migration::{Migration, SchemaManager};
use sea_query::{Expr, Index, Table};

pub struct CreateUsersAndCatalog;

impl Migration for CreateUsersAndCatalog {
    fn name(&self) -> &str {
        "create_users_and_catalog"
    }

    fn version(&self) -> i64 {
        20250101000001
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role TEXT NOT NULL DEFAULT 'CUSTOMER',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_role_check CHECK (role IN ('CUSTOMER', 'ADMIN'))
            )
            "#,
            &[],
        )?;

        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT categories_name_key UNIQUE (name)
            )
            "#,
            &[],
        )?;

        // Categories cannot be deleted while products still point at them.
        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                sku VARCHAR(100) NOT NULL,
                description TEXT,
                price_cents BIGINT NOT NULL,
                stock INTEGER NOT NULL DEFAULT 0,
                image_url TEXT,
                is_active BOOLEAN NOT NULL DEFAULT true,
                category_id UUID NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT products_sku_key UNIQUE (sku),
                CONSTRAINT products_price_cents_check CHECK (price_cents >= 0),
                CONSTRAINT products_stock_check CHECK (stock >= 0)
            )
            "#,
            &[],
        )?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_products_category_id")
                .table("products")
                .col(Expr::col("category_id"))
                .to_owned(),
        )?;
        manager.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_active_created ON products(is_active, created_at DESC)",
            &[],
        )?;

        Ok(())
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        for table in ["products", "categories", "users"] {
            manager.drop_table(Table::drop().table(table).if_exists().to_owned())?;
        }
        Ok(())
    }
}
