//! Outbound order notifications.
//!
//! Checkout hands the committed order to a [`Notifier`], which queues it for a
//! background worker. Nothing here can fail the request that produced the order.

pub mod telegram;

pub use telegram::{build_order_message, format_money, Notifier};
