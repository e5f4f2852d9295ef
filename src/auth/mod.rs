//! Authentication primitives: bcrypt password hashes, HS256 access tokens and
//! the bearer/role guard the router applies.

pub mod guard;
pub mod password;
pub mod token;

pub use guard::{authenticate, require_role, AuthUser};
pub use token::{Claims, TokenService};
