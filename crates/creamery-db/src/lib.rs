//! # creamery-db
//!
//! SQLite storage layer for the creamery product catalog.
//!
//! This crate provides:
//! - Connection pool management
//! - Idempotent schema bootstrap
//! - Lookup resolution and relation diffing on a caller transaction
//! - The transactional [`CatalogRepository`] implementation
//! - Reclamation of unreferenced lookup rows
//!
//! ## Example
//!
//! ```rust,ignore
//! use creamery_db::{CatalogRepository, Database, Item};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://catalog.db").await?;
//!     db.ensure_schema().await?;
//!
//!     let mut item = Item::new("646");
//!     item.name = "Vermonty Python".to_string();
//!     item.ingredients = vec!["cream".to_string(), "sugar".to_string()];
//!
//!     let id = db.catalog.create_item(item).await?;
//!     println!("Created product row {}", id);
//!     Ok(())
//! }
//! ```
pub mod catalog;
pub mod items;
pub mod lookup;
pub mod pool;
pub mod read;
pub mod reclaim;
pub mod relations;
pub mod schema;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use them
pub mod test_fixtures;

// Re-export core types
pub use creamery_core::*;

pub use catalog::{guarded, SqliteCatalogRepository, TxPhase, UnitOfWork};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use schema::ensure_schema;

use sqlx::SqlitePool;

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: SqlitePool,
    /// Transactional catalog operations.
    pub catalog: SqliteCatalogRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            catalog: SqliteCatalogRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Create any missing catalog tables.
    pub async fn ensure_schema(&self) -> Result<()> {
        schema::ensure_schema(&self.pool).await
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
