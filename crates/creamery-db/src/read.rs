//! Read assembly for active products.
//!
//! Reads are not transactional. All queries run on one acquired connection
//! and reflect whatever state is committed when each statement executes.

use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use creamery_core::{Error, ItemView, RelationKind, Result};

/// Read the denormalized view of an active product.
pub async fn read_item(pool: &SqlitePool, product_id: &str) -> Result<ItemView> {
    let mut conn = pool.acquire().await.map_err(Error::Database)?;

    let row = sqlx::query(
        "SELECT p.id, p.product_id, p.name, p.description, p.story, p.image_closed,
                p.image_open, p.allergy_info, c.name AS certification
         FROM product p
         LEFT JOIN dietary_certification c ON c.id = p.dietary_certification_id
         WHERE p.product_id = ? AND p.is_active = 1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?
    .ok_or_else(|| Error::ItemNotFound(product_id.to_string()))?;

    let row_id: i64 = row.get("id");
    let sourcing_values = linked_names(&mut conn, RelationKind::SourcingValue, row_id).await?;
    let ingredients = linked_names(&mut conn, RelationKind::Ingredient, row_id).await?;

    debug!(
        subsystem = "db",
        component = "read",
        op = "read_item",
        product_id,
        row_id,
        "Assembled product view"
    );

    Ok(ItemView {
        id: row_id,
        product_id: row.get("product_id"),
        name: row.get("name"),
        description: row.get("description"),
        story: row.get("story"),
        image_closed: row.get("image_closed"),
        image_open: row.get("image_open"),
        allergy_info: row.get("allergy_info"),
        dietary_certification: row.get("certification"),
        sourcing_values,
        ingredients,
    })
}

async fn linked_names(
    conn: &mut SqliteConnection,
    kind: RelationKind,
    row_id: i64,
) -> Result<Vec<String>> {
    let query = format!(
        "SELECT l.name FROM {edge} e
         JOIN {lookup} l ON l.id = e.{col}
         WHERE e.product_id = ?
         ORDER BY l.name",
        edge = kind.edge_table(),
        lookup = kind.lookup().table(),
        col = kind.attribute_column(),
    );
    sqlx::query_scalar::<_, String>(&query)
        .bind(row_id)
        .fetch_all(conn)
        .await
        .map_err(Error::Database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TestDatabase;

    #[tokio::test]
    async fn test_read_missing_product_is_not_found() {
        let test_db = TestDatabase::new().await;
        let err = read_item(&test_db.pool, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_joins_certification_and_sorts_names() {
        let test_db = TestDatabase::new().await;
        sqlx::query("INSERT INTO dietary_certification (name) VALUES ('Kosher')")
            .execute(&test_db.pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO product (product_id, name, dietary_certification_id)
             VALUES ('p1', 'Chunky Monkey', 1)",
        )
        .execute(&test_db.pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO sourcing_value (name) VALUES ('zeta'), ('alpha')")
            .execute(&test_db.pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO product_sourcing_value (product_id, sourcing_value_id)
             SELECT 1, id FROM sourcing_value",
        )
        .execute(&test_db.pool)
        .await
        .unwrap();

        let view = read_item(&test_db.pool, "p1").await.unwrap();
        assert_eq!(view.name, "Chunky Monkey");
        assert_eq!(view.dietary_certification.as_deref(), Some("Kosher"));
        assert_eq!(view.sourcing_values, vec!["alpha", "zeta"]);
        assert!(view.ingredients.is_empty());
    }

    #[tokio::test]
    async fn test_read_hides_inactive_rows() {
        let test_db = TestDatabase::new().await;
        sqlx::query("INSERT INTO product (product_id, is_active) VALUES ('p1', 0)")
            .execute(&test_db.pool)
            .await
            .unwrap();

        let err = read_item(&test_db.pool, "p1").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
