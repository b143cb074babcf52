//! Product row writes.
//!
//! Every function here runs on the caller's transaction and never commits.
//! Callers locate rows by business key first and then address them by
//! surrogate row id.

use sqlx::{QueryBuilder, Sqlite, Transaction};
use tracing::debug;

use creamery_core::{Error, FieldMask, Item, ItemField, LookupKind, Result};

use crate::lookup;

/// Find the row id for a business key.
///
/// With `active_only` set, soft-deleted rows are treated as absent.
pub async fn find_row_id_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    active_only: bool,
) -> Result<Option<i64>> {
    let query = if active_only {
        "SELECT id FROM product WHERE product_id = ? AND is_active = 1"
    } else {
        "SELECT id FROM product WHERE product_id = ?"
    };
    sqlx::query_scalar::<_, i64>(query)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)
}

/// Like [`find_row_id_tx`] but a missing row is [`Error::ItemNotFound`].
pub async fn require_row_id_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    active_only: bool,
) -> Result<i64> {
    find_row_id_tx(tx, product_id, active_only)
        .await?
        .ok_or_else(|| Error::ItemNotFound(product_id.to_string()))
}

/// Insert a new active product row and return its row id.
///
/// A duplicate business key surfaces as a database error and aborts the
/// caller's transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    item: &Item,
    certification_id: Option<i64>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO product (product_id, name, description, story, image_closed, image_open,
                              allergy_info, dietary_certification_id, is_active)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(item.product_id.trim())
    .bind(&item.name)
    .bind(&item.description)
    .bind(&item.story)
    .bind(&item.image_closed)
    .bind(&item.image_open)
    .bind(&item.allergy_info)
    .bind(certification_id)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    let row_id = result.last_insert_rowid();
    debug!(
        subsystem = "db",
        component = "items",
        op = "insert",
        product_id = %item.product_id,
        row_id,
        "Inserted product row"
    );
    Ok(row_id)
}

/// Resolve the certification id for an item, or `None` when it has none.
pub async fn certification_id_tx(
    tx: &mut Transaction<'_, Sqlite>,
    item: &Item,
) -> Result<Option<i64>> {
    match item.certification() {
        Some(name) => Ok(Some(
            lookup::resolve_one_tx(tx, LookupKind::DietaryCertification, name).await?,
        )),
        None => Ok(None),
    }
}

/// Overwrite the masked row-level fields of a product.
///
/// Fields outside the mask keep their stored values. A mask with no
/// row-level field issues no statement. A blank certification clears the
/// reference.
pub async fn update_tx(
    tx: &mut Transaction<'_, Sqlite>,
    row_id: i64,
    item: &Item,
    mask: FieldMask,
) -> Result<()> {
    if !mask.touches_row() {
        return Ok(());
    }

    let certification_id = if mask.contains(ItemField::DietaryCertification) {
        certification_id_tx(tx, item).await?
    } else {
        None
    };

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE product SET ");
    let mut assignments = qb.separated(", ");
    for field in mask.row_fields() {
        let Some(column) = field.column() else {
            continue;
        };
        assignments.push(format!("{} = ", column));
        match field {
            ItemField::Name => assignments.push_bind_unseparated(item.name.clone()),
            ItemField::Description => {
                assignments.push_bind_unseparated(item.description.clone())
            }
            ItemField::Story => assignments.push_bind_unseparated(item.story.clone()),
            ItemField::ImageClosed => {
                assignments.push_bind_unseparated(item.image_closed.clone())
            }
            ItemField::ImageOpen => assignments.push_bind_unseparated(item.image_open.clone()),
            ItemField::AllergyInfo => {
                assignments.push_bind_unseparated(item.allergy_info.clone())
            }
            ItemField::DietaryCertification => {
                assignments.push_bind_unseparated(certification_id)
            }
            ItemField::SourcingValues | ItemField::Ingredients => continue,
        };
    }
    qb.push(" WHERE id = ").push_bind(row_id);

    let result = qb
        .build()
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    if result.rows_affected() != 1 {
        return Err(Error::Internal(format!(
            "product row {} update touched {} rows",
            row_id,
            result.rows_affected()
        )));
    }

    debug!(
        subsystem = "db",
        component = "items",
        op = "update",
        row_id,
        fields = %mask,
        "Updated product row"
    );
    Ok(())
}

/// Mark a product inactive. Edges and lookups are left in place.
pub async fn deactivate_tx(tx: &mut Transaction<'_, Sqlite>, row_id: i64) -> Result<()> {
    let result = sqlx::query("UPDATE product SET is_active = 0 WHERE id = ?")
        .bind(row_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    if result.rows_affected() != 1 {
        return Err(Error::Internal(format!(
            "product row {} vanished during soft delete",
            row_id
        )));
    }
    Ok(())
}

/// Delete a product row. Its edges must already be gone.
pub async fn delete_row_tx(tx: &mut Transaction<'_, Sqlite>, row_id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(row_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    if result.rows_affected() != 1 {
        return Err(Error::Internal(format!(
            "product row {} vanished during delete",
            row_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ItemBuilder, TestDatabase};

    #[tokio::test]
    async fn test_insert_and_find_row() {
        let test_db = TestDatabase::new().await;
        let item = ItemBuilder::new("p1").name("Cherry Garcia").build();

        let mut tx = test_db.pool.begin().await.unwrap();
        let row_id = insert_tx(&mut tx, &item, None).await.unwrap();
        let found = find_row_id_tx(&mut tx, "p1", true).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(found, Some(row_id));
        assert!(test_db.is_active("p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_skips_inactive_rows_when_asked() {
        let test_db = TestDatabase::new().await;
        let item = ItemBuilder::new("p1").build();

        let mut tx = test_db.pool.begin().await.unwrap();
        let row_id = insert_tx(&mut tx, &item, None).await.unwrap();
        deactivate_tx(&mut tx, row_id).await.unwrap();

        assert_eq!(find_row_id_tx(&mut tx, "p1", true).await.unwrap(), None);
        assert_eq!(find_row_id_tx(&mut tx, "p1", false).await.unwrap(), Some(row_id));
        let err = require_row_id_tx(&mut tx, "p1", true).await.unwrap_err();
        assert!(err.is_not_found());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_business_key_is_database_error() {
        let test_db = TestDatabase::new().await;
        let item = ItemBuilder::new("p1").build();

        let mut tx = test_db.pool.begin().await.unwrap();
        insert_tx(&mut tx, &item, None).await.unwrap();
        let err = insert_tx(&mut tx, &item, None).await.unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_update_writes_only_masked_columns() {
        let test_db = TestDatabase::new().await;
        let original = ItemBuilder::new("p1")
            .name("Phish Food")
            .story("Original story")
            .build();

        let mut tx = test_db.pool.begin().await.unwrap();
        let row_id = insert_tx(&mut tx, &original, None).await.unwrap();

        let patch = ItemBuilder::new("p1").name("Renamed").story("").build();
        let mask = FieldMask::empty().with(ItemField::Name);
        update_tx(&mut tx, row_id, &patch, mask).await.unwrap();
        tx.commit().await.unwrap();

        let (name, story) = test_db.name_and_story("p1").await.unwrap();
        assert_eq!(name, "Renamed");
        assert_eq!(story, "Original story");
    }

    #[tokio::test]
    async fn test_update_blank_certification_clears_reference() {
        let test_db = TestDatabase::new().await;
        let item = ItemBuilder::new("p1").certification("Kosher").build();

        let mut tx = test_db.pool.begin().await.unwrap();
        let cert = certification_id_tx(&mut tx, &item).await.unwrap();
        let row_id = insert_tx(&mut tx, &item, cert).await.unwrap();

        let patch = ItemBuilder::new("p1").build();
        let mask = FieldMask::empty().with(ItemField::DietaryCertification);
        update_tx(&mut tx, row_id, &patch, mask).await.unwrap();
        tx.commit().await.unwrap();

        assert!(cert.is_some());
        assert_eq!(test_db.certification_id("p1").await, None);
    }

    #[tokio::test]
    async fn test_update_relation_only_mask_skips_row() {
        let test_db = TestDatabase::new().await;
        let item = ItemBuilder::new("p1").name("Keep").build();

        let mut tx = test_db.pool.begin().await.unwrap();
        let row_id = insert_tx(&mut tx, &item, None).await.unwrap();
        let patch = ItemBuilder::new("p1").name("Ignored").build();
        let mask = FieldMask::empty().with(ItemField::Ingredients);
        update_tx(&mut tx, row_id, &patch, mask).await.unwrap();
        tx.commit().await.unwrap();

        let (name, _) = test_db.name_and_story("p1").await.unwrap();
        assert_eq!(name, "Keep");
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_internal_error() {
        let test_db = TestDatabase::new().await;
        let mut tx = test_db.pool.begin().await.unwrap();
        let err = delete_row_tx(&mut tx, 9999).await.unwrap_err();
        tx.rollback().await.unwrap();
        assert!(matches!(err, Error::Internal(_)));
    }
}
