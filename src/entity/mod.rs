//! Storefront tables: row models plus the SQL that reads and writes them.
//!
//! Every function takes `&dyn DbExecutor`, so the same code runs on a pooled
//! connection or inside a transaction. Related rows (a product's category, an
//! order's items) are loaded with one extra `IN (...)` query per relation and
//! attached to the parent structs.

#[macro_use]
mod text_enum;

pub mod cart_item;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use cart_item::CartItem;
pub use category::Category;
pub use order::{Order, OrderItem, OrderStatus, Shipping};
pub use product::Product;
pub use text_enum::UnknownVariant;
pub use user::{Role, User};

use std::collections::HashSet;
use std::hash::Hash;

/// Distinct keys in first-seen order.
pub(crate) fn distinct<K: Copy + Eq + Hash>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(*k)).collect()
}
