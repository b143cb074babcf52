//! Database connection pool management.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info, warn};

use creamery_core::defaults::{
    POOL_ACQUIRE_TIMEOUT_SECS, POOL_IDLE_TIMEOUT_SECS, POOL_MAX_CONNECTIONS,
    POOL_MAX_LIFETIME_SECS, POOL_MIN_CONNECTIONS, SQLITE_BUSY_TIMEOUT_MS,
};
use creamery_core::{Error, Result};

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// How long to wait for a free connection.
    pub acquire_timeout: Duration,
    /// Idle connection timeout. `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    /// Maximum connection lifetime.
    pub max_lifetime: Option<Duration>,
    /// How long a writer waits on SQLITE_BUSY before failing.
    pub busy_timeout: Duration,
    /// Use write-ahead logging. Ignored by in-memory databases.
    pub wal: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: POOL_MAX_CONNECTIONS,
            min_connections: POOL_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(POOL_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)),
            max_lifetime: Some(Duration::from_secs(POOL_MAX_LIFETIME_SECS)),
            busy_timeout: Duration::from_millis(SQLITE_BUSY_TIMEOUT_MS),
            wal: true,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a private `sqlite::memory:` database.
    ///
    /// Every connection to `:memory:` opens a distinct database, so the pool
    /// is pinned to one connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            idle_timeout: None,
            max_lifetime: None,
            wal: false,
            ..Self::default()
        }
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the minimum number of connections.
    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    /// Set the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable write-ahead logging.
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }
}

/// Create a new SQLite connection pool with default configuration.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Create a new SQLite connection pool with custom configuration.
///
/// Foreign keys are enforced on every connection; the catalog relies on
/// them for the certification reference and the edge tables.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<SqlitePool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        wal = config.wal,
        "Creating database connection pool"
    );

    let mut connect = SqliteConnectOptions::from_str(database_url)
        .map_err(Error::Database)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    if config.wal {
        connect = connect
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect_with(connect)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Log current pool health metrics.
///
/// Emits a debug-level event with pool size and idle count, and warns when
/// every connection is checked out.
pub fn log_pool_metrics(pool: &SqlitePool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections, writers may queue"
        );
    }
}
