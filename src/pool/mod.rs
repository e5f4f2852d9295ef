//! Bounded connection pool for `may_postgres`.
//!
//! Connections are opened lazily up to `max_connections` and parked in a
//! `crossbeam-channel` when idle. A checkout that cannot get a connection
//! within `pool_timeout_seconds` fails with [`PoolError::Timeout`], which the
//! HTTP layer answers with 503.

mod manager;

pub use manager::{ConnectionPool, PooledConnection};

use crate::connection::ConnectionError;
use std::fmt;
use std::time::Duration;

/// Pool error type
#[derive(Debug)]
pub enum PoolError {
    /// No connection became available before the acquire timeout
    Timeout(Duration),
    /// Opening a new connection failed
    Connection(ConnectionError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Timeout(waited) => {
                write!(f, "Timed out after {waited:?} waiting for a database connection")
            }
            PoolError::Connection(e) => write!(f, "Failed to open database connection: {e}"),
        }
    }
}

impl std::error::Error for PoolError {}

impl From<ConnectionError> for PoolError {
    fn from(err: ConnectionError) -> Self {
        PoolError::Connection(err)
    }
}
