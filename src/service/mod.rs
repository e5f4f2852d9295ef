//! Business rules, one module per area. Services take validated input and an
//! executor and return `ApiError` on rule violations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
