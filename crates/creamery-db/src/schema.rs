//! Catalog schema bootstrap.
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements for a fresh store. This
//! is not a migration system: an existing schema is never altered.

use sqlx::SqlitePool;
use tracing::info;

use creamery_core::{Error, Result};

/// Statements creating the catalog tables, in dependency order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS dietary_certification (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sourcing_value (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingredient (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        story TEXT NOT NULL DEFAULT '',
        image_closed TEXT NOT NULL DEFAULT '',
        image_open TEXT NOT NULL DEFAULT '',
        allergy_info TEXT NOT NULL DEFAULT '',
        dietary_certification_id INTEGER NULL REFERENCES dietary_certification(id),
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_sourcing_value (
        product_id INTEGER NOT NULL REFERENCES product(id),
        sourcing_value_id INTEGER NOT NULL REFERENCES sourcing_value(id),
        PRIMARY KEY (product_id, sourcing_value_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_ingredient (
        product_id INTEGER NOT NULL REFERENCES product(id),
        ingredient_id INTEGER NOT NULL REFERENCES ingredient(id),
        PRIMARY KEY (product_id, ingredient_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_product_sourcing_value_attr ON product_sourcing_value (sourcing_value_id)",
    "CREATE INDEX IF NOT EXISTS idx_product_ingredient_attr ON product_ingredient (ingredient_id)",
    "CREATE INDEX IF NOT EXISTS idx_product_certification ON product (dietary_certification_id)",
];

/// Create any missing catalog tables and indexes.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await.map_err(Error::Database)?;
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(*statement)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
    }
    tx.commit().await.map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "schema",
        op = "ensure",
        statements = SCHEMA_STATEMENTS.len(),
        "Catalog schema ready"
    );
    Ok(())
}
