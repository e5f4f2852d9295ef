use super::PoolError;
use crate::config::DatabaseConfig;
use crate::connection::connect;
use crate::executor::{DbError, DbExecutor, PgExecutor};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Idle connections older than this are probed with `SELECT 1` before reuse.
const IDLE_PROBE_AFTER: Duration = Duration::from_secs(30);

struct IdleConnection {
    executor: PgExecutor,
    idle_since: Instant,
}

struct PoolInner {
    url: String,
    max_size: usize,
    acquire_timeout: Duration,
    open: AtomicUsize,
    idle_tx: Sender<IdleConnection>,
    idle_rx: Receiver<IdleConnection>,
}

/// Shared handle to the pool. Cloning is cheap.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(config: &DatabaseConfig) -> Self {
        let max_size = config.max_connections.max(1);
        let (idle_tx, idle_rx) = bounded(max_size);
        Self {
            inner: Arc::new(PoolInner {
                url: config.url.clone(),
                max_size,
                acquire_timeout: Duration::from_secs(config.pool_timeout_seconds),
                open: AtomicUsize::new(0),
                idle_tx,
                idle_rx,
            }),
        }
    }

    /// Open one connection eagerly so a bad URL fails at startup.
    pub fn warm_up(&self) -> Result<(), PoolError> {
        let conn = self.get()?;
        drop(conn);
        Ok(())
    }

    /// Check out a connection, waiting up to the configured timeout.
    ///
    /// Waiting yields the current coroutine instead of blocking its worker thread.
    pub fn get(&self) -> Result<PooledConnection, PoolError> {
        let start = Instant::now();
        let deadline = start + self.inner.acquire_timeout;

        loop {
            match self.inner.idle_rx.try_recv() {
                Ok(idle) => {
                    if let Some(executor) = self.revalidate(idle) {
                        return Ok(self.checked_out(executor, start));
                    }
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            if self.try_reserve_slot() {
                match connect(&self.inner.url) {
                    Ok(client) => {
                        log::debug!(
                            "opened pooled connection ({}/{})",
                            self.inner.open.load(Ordering::Relaxed),
                            self.inner.max_size
                        );
                        return Ok(self.checked_out(PgExecutor::new(client), start));
                    }
                    Err(e) => {
                        self.inner.open.fetch_sub(1, Ordering::AcqRel);
                        return Err(PoolError::Connection(e));
                    }
                }
            }

            if Instant::now() >= deadline {
                #[cfg(feature = "metrics")]
                crate::metrics::METRICS.record_pool_timeout();
                log::warn!(
                    "connection pool exhausted ({} open), gave up after {:?}",
                    self.inner.max_size,
                    self.inner.acquire_timeout
                );
                return Err(PoolError::Timeout(self.inner.acquire_timeout));
            }
            may::coroutine::sleep(ACQUIRE_POLL_INTERVAL);
        }
    }

    /// Connections currently open (idle or checked out).
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::Relaxed)
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    fn try_reserve_slot(&self) -> bool {
        self.inner
            .open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < self.inner.max_size).then_some(open + 1)
            })
            .is_ok()
    }

    fn revalidate(&self, idle: IdleConnection) -> Option<PgExecutor> {
        if idle.idle_since.elapsed() < IDLE_PROBE_AFTER {
            return Some(idle.executor);
        }
        match idle.executor.check_health() {
            Ok(true) => Some(idle.executor),
            Ok(false) | Err(_) => {
                log::info!("discarding stale pooled connection");
                self.inner.open.fetch_sub(1, Ordering::AcqRel);
                None
            }
        }
    }

    fn checked_out(&self, executor: PgExecutor, start: Instant) -> PooledConnection {
        let waited = start.elapsed();
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_connection_wait(waited);
        #[cfg(not(feature = "metrics"))]
        let _ = waited;

        PooledConnection {
            executor: Some(executor),
            pool: Arc::clone(&self.inner),
        }
    }
}

/// A connection checked out of the pool; returned to it on drop.
pub struct PooledConnection {
    executor: Option<PgExecutor>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    /// Close this connection instead of returning it to the pool.
    pub fn discard(mut self) {
        if self.executor.take().is_some() {
            self.pool.open.fetch_sub(1, Ordering::AcqRel);
        }
    }

    fn executor(&self) -> Result<&PgExecutor, DbError> {
        self.executor
            .as_ref()
            .ok_or_else(|| DbError::Other("Pooled connection already released".to_string()))
    }
}

impl Deref for PooledConnection {
    type Target = PgExecutor;

    fn deref(&self) -> &PgExecutor {
        // Only `discard` and `drop` take the executor, and both consume `self`.
        match self.executor.as_ref() {
            Some(executor) => executor,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(executor) = self.executor.take() else {
            return;
        };
        let idle = IdleConnection {
            executor,
            idle_since: Instant::now(),
        };
        if self.pool.idle_tx.try_send(idle).is_err() {
            self.pool.open.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl DbExecutor for PooledConnection {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        self.executor()?.execute(query, params)
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, DbError> {
        self.executor()?.query_one(query, params)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        self.executor()?.query_all(query, params)
    }
}
