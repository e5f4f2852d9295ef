//! # Storefront
//!
//! Coroutine-native storefront REST service on PostgreSQL and the `may` runtime:
//! accounts with JWT auth, a catalog, per-customer carts and checkout into
//! orders, with Telegram order notices and Cloudinary image uploads.
//!
//! Layers, bottom up:
//! - [`connection`], [`executor`], [`transaction`], [`pool`]: `may_postgres` access
//! - [`query`], [`entity`]: SQL building with `sea-query` and row mapping
//! - [`migration`], [`migrations`]: compiled-in schema migrations
//! - [`service`]: business rules, returning [`error::ApiError`]
//! - [`api`], [`http`]: routing, guards and validation on `may_minihttp`

pub mod api;
pub mod auth;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod migration;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod query;
pub mod seed;
pub mod service;
pub mod state;
pub mod transaction;
pub mod upload;

pub use config::StorefrontConfig;
pub use connection::{connect, ConnectionError};
pub use error::ApiError;
pub use executor::{DbError, DbExecutor, PgExecutor};
pub use pool::{ConnectionPool, PoolError, PooledConnection};
pub use state::AppState;
pub use transaction::{Transaction, TransactionError};
