//! Query building and execution for storefront entities.
//!
//! - **Traits**: `FromRow` and `Entity` (table name + column list)
//! - **Select**: `SelectQuery`, a thin typed wrapper over `sea_query::SelectStatement`
//! - **Statement**: running built INSERT/UPDATE/DELETE statements
//! - **Value Conversion**: `sea_query::Value` to `ToSql` parameters
//!
//! ```no_run
//! use storefront::entity::product::Product;
//! use storefront::query::SelectQuery;
//! use storefront::DbExecutor;
//! use sea_query::{Expr, ExprTrait, Order};
//!
//! # fn run(executor: &dyn DbExecutor) -> Result<(), storefront::DbError> {
//! let active = SelectQuery::<Product>::new()
//!     .filter(Expr::col("is_active").eq(true))
//!     .order_by("created_at", Order::Desc)
//!     .limit(20)
//!     .all(executor)?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
#[doc(inline)]
pub use traits::{decode, decode_all, Entity, FromRow};

pub mod select;
#[doc(inline)]
pub use select::SelectQuery;

pub mod statement;

pub mod value_conversion;
#[doc(inline)]
pub use value_conversion::with_converted_params;
