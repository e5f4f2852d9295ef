//! Migration runner against a real database.

mod support;

use storefront::migration::Migrator;
use storefront::{connect, migrations, DbExecutor, PgExecutor};

#[test]
fn test_migrations_are_applied_once() {
    if support::app().is_none() {
        return;
    }
    let url = support::database_url().unwrap();
    let conn = PgExecutor::new(connect(&url).unwrap());
    let migrator = Migrator::new(migrations::all()).unwrap();

    let status = migrator.status(&conn).unwrap();
    assert!(status.is_up_to_date(), "pending: {:?}", status.pending);
    assert_eq!(status.applied.len(), migrator.migrations().len());

    assert_eq!(migrator.up(&conn, None).unwrap(), 0);

    for table in ["users", "categories", "products", "cart_items", "orders", "order_items"] {
        let row = conn
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_tables WHERE tablename = $1::text)",
                &[&table],
            )
            .unwrap();
        let exists: bool = row.get(0);
        assert!(exists, "{table} missing");
    }
}
