//! Migration: cart items, orders, order items
//! Version: 20250101000002

use crate::executor::DbError;
use crate::migration::{Migration, SchemaManager};
use sea_query::{Expr, Index, Table};

pub struct CreateCartAndOrders;

impl Migration for CreateCartAndOrders {
    fn name(&self) -> &str {
        "create_cart_and_orders"
    }

    fn version(&self) -> i64 {
        20250101000002
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS cart_items (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                quantity INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT cart_items_user_id_product_id_key UNIQUE (user_id, product_id),
                CONSTRAINT cart_items_quantity_check CHECK (quantity >= 1)
            )
            "#,
            &[],
        )?;

        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                total_cents BIGINT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                shipping_name VARCHAR(120),
                shipping_phone VARCHAR(40),
                shipping_street VARCHAR(120),
                shipping_house VARCHAR(120),
                shipping_city_province VARCHAR(120),
                shipping_district VARCHAR(80),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT orders_total_cents_check CHECK (total_cents >= 0),
                CONSTRAINT orders_status_check
                    CHECK (status IN ('PENDING', 'PAID', 'SHIPPED', 'COMPLETED', 'CANCELED'))
            )
            "#,
            &[],
        )?;

        manager.execute(
            r#"
            CREATE TABLE IF NOT EXISTS order_items (
                id UUID PRIMARY KEY,
                order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                product_id UUID NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
                quantity INTEGER NOT NULL,
                price_cents BIGINT NOT NULL,
                CONSTRAINT order_items_quantity_check CHECK (quantity >= 1),
                CONSTRAINT order_items_price_cents_check CHECK (price_cents >= 0)
            )
            "#,
            &[],
        )?;

        manager.execute(
            "CREATE INDEX IF NOT EXISTS idx_orders_user_created ON orders(user_id, created_at DESC)",
            &[],
        )?;
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_order_items_order_id")
                .table("order_items")
                .col(Expr::col("order_id"))
                .to_owned(),
        )?;

        Ok(())
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        for table in ["order_items", "orders", "cart_items"] {
            manager.drop_table(Table::drop().table(table).if_exists().to_owned())?;
        }
        Ok(())
    }
}
