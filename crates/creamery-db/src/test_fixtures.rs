//! Test fixtures for database integration tests.
//!
//! Provides isolated catalog stores and item builders so unit tests and the
//! integration tests in `tests/` share one setup path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use creamery_db::test_fixtures::{ItemBuilder, TestDatabase};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new().await;
//!     let item = ItemBuilder::new("p1")
//!         .name("Cherry Garcia")
//!         .sourcing_values(&["Fairtrade"])
//!         .build();
//!     test_db.db.catalog.create_item(item).await.unwrap();
//! }
//! ```

use sqlx::SqlitePool;
use tempfile::TempDir;

use creamery_core::{Item, LookupKind, RelationKind};

use crate::{create_pool_with_config, ensure_schema, Database, PoolConfig};

/// Isolated catalog store with its schema already created.
pub struct TestDatabase {
    pub pool: SqlitePool,
    pub db: Database,
    // Keeps the backing directory alive for file-backed stores.
    _dir: Option<TempDir>,
}

impl TestDatabase {
    /// Private in-memory store on a single pinned connection.
    pub async fn new() -> Self {
        let pool = create_pool_with_config("sqlite::memory:", PoolConfig::in_memory())
            .await
            .expect("Failed to create in-memory test pool");
        Self::with_pool(pool, None).await
    }

    /// File-backed store in a temporary directory, for tests that need
    /// several connections writing at once.
    pub async fn file_backed(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let config = PoolConfig::new()
            .max_connections(max_connections)
            .min_connections(1);
        let pool = create_pool_with_config(&url, config)
            .await
            .expect("Failed to create file-backed test pool");
        Self::with_pool(pool, Some(dir)).await
    }

    async fn with_pool(pool: SqlitePool, dir: Option<TempDir>) -> Self {
        ensure_schema(&pool)
            .await
            .expect("Failed to create test schema");
        Self {
            db: Database::new(pool.clone()),
            pool,
            _dir: dir,
        }
    }

    /// Row count of any catalog table.
    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows")
    }

    /// All names in a lookup table, sorted.
    pub async fn lookup_names(&self, kind: LookupKind) -> Vec<String> {
        sqlx::query_scalar(&format!("SELECT name FROM {} ORDER BY name", kind.table()))
            .fetch_all(&self.pool)
            .await
            .expect("Failed to list lookup names")
    }

    /// Active flag of a product row, ignoring soft deletion.
    pub async fn is_active(&self, product_id: &str) -> Option<bool> {
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM product WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .expect("Failed to read active flag")
    }

    /// Stored certification reference of a product row.
    pub async fn certification_id(&self, product_id: &str) -> Option<i64> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT dietary_certification_id FROM product WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .expect("Failed to read certification reference")
        .flatten()
    }

    /// Stored name and story of a product row.
    pub async fn name_and_story(&self, product_id: &str) -> Option<(String, String)> {
        sqlx::query_as::<_, (String, String)>(
            "SELECT name, story FROM product WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .expect("Failed to read product row")
    }

    /// Attribute ids linked to a product in one relation, sorted.
    pub async fn edge_ids(&self, kind: RelationKind, product_id: &str) -> Vec<i64> {
        sqlx::query_scalar(&format!(
            "SELECT e.{col} FROM {edge} e
             JOIN product p ON p.id = e.product_id
             WHERE p.product_id = ?
             ORDER BY e.{col}",
            col = kind.attribute_column(),
            edge = kind.edge_table(),
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .expect("Failed to list edges")
    }

    /// Install a trigger that aborts any statement matching `when`.
    ///
    /// Used to force a storage failure at a chosen step of a write.
    pub async fn fail_on(&self, name: &str, event: &str, when: &str) {
        sqlx::query(&format!(
            "CREATE TRIGGER {name} {event} WHEN {when}
             BEGIN SELECT RAISE(ABORT, 'injected failure: {name}'); END"
        ))
        .execute(&self.pool)
        .await
        .expect("Failed to install failure trigger");
    }
}

/// Fluent builder for test items.
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    pub fn new(product_id: &str) -> Self {
        Self {
            item: Item::new(product_id),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.item.name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.item.description = description.to_string();
        self
    }

    pub fn story(mut self, story: &str) -> Self {
        self.item.story = story.to_string();
        self
    }

    pub fn images(mut self, closed: &str, open: &str) -> Self {
        self.item.image_closed = closed.to_string();
        self.item.image_open = open.to_string();
        self
    }

    pub fn allergy_info(mut self, info: &str) -> Self {
        self.item.allergy_info = info.to_string();
        self
    }

    pub fn certification(mut self, name: &str) -> Self {
        self.item.dietary_certification = name.to_string();
        self
    }

    pub fn sourcing_values(mut self, names: &[&str]) -> Self {
        self.item.sourcing_values = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn ingredients(mut self, names: &[&str]) -> Self {
        self.item.ingredients = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
