//! The storefront schema, in version order.

mod m20250101000001_create_users_and_catalog;
mod m20250101000002_create_cart_and_orders;

use crate::migration::Migration;

pub use m20250101000001_create_users_and_catalog::CreateUsersAndCatalog;
pub use m20250101000002_create_cart_and_orders::CreateCartAndOrders;

/// Every migration this build knows about.
pub fn all() -> Vec<Box<dyn Migration>> {
    vec![Box::new(CreateUsersAndCatalog), Box::new(CreateCartAndOrders)]
}
