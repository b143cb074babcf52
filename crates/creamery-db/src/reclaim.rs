//! Reclamation of unreferenced lookup rows.
//!
//! Sweeps run on the pool, outside any caller transaction, and only after a
//! write has committed. An orphan lookup row left behind by a failed sweep is
//! harmless and is picked up by the next one.

use std::time::Instant;

use sqlx::SqlitePool;
use tracing::{debug, info};

use creamery_core::{Error, LookupKind, RelationKind, Result, SweepReport};

/// DELETE statement removing unreferenced rows of one lookup kind.
fn orphan_delete(kind: LookupKind) -> String {
    match kind {
        LookupKind::SourcingValue => edge_orphan_delete(RelationKind::SourcingValue),
        LookupKind::Ingredient => edge_orphan_delete(RelationKind::Ingredient),
        // Soft-deleted products still hold their certification reference.
        LookupKind::DietaryCertification => format!(
            "DELETE FROM {lookup} WHERE NOT EXISTS (
                 SELECT 1 FROM product p WHERE p.dietary_certification_id = {lookup}.id
             )",
            lookup = kind.table(),
        ),
    }
}

fn edge_orphan_delete(relation: RelationKind) -> String {
    format!(
        "DELETE FROM {lookup} WHERE NOT EXISTS (
             SELECT 1 FROM {edge} e WHERE e.{col} = {lookup}.id
         )",
        lookup = relation.lookup().table(),
        edge = relation.edge_table(),
        col = relation.attribute_column(),
    )
}

/// Prune unreferenced rows of one lookup kind. Returns the number removed.
pub async fn prune_orphans(pool: &SqlitePool, kind: LookupKind) -> Result<u64> {
    let result = sqlx::query(&orphan_delete(kind))
        .execute(pool)
        .await
        .map_err(|e| Error::Reclaim(format!("{} sweep failed: {}", kind, e)))?;

    debug!(
        subsystem = "db",
        component = "reclaim",
        op = "prune",
        kind = kind.as_str(),
        rows_reclaimed = result.rows_affected(),
        "Pruned orphaned lookup rows"
    );
    Ok(result.rows_affected())
}

/// Sweep all three lookup kinds.
///
/// Stops at the first failing kind; rows already pruned by earlier kinds
/// stay pruned.
pub async fn sweep(pool: &SqlitePool) -> Result<SweepReport> {
    let start = Instant::now();
    let mut report = SweepReport::default();

    for kind in LookupKind::ALL {
        let removed = prune_orphans(pool, kind).await?;
        report.record(kind, removed);
    }

    info!(
        subsystem = "db",
        component = "reclaim",
        op = "sweep",
        rows_reclaimed = report.total(),
        sourcing_values = report.sourcing_values,
        ingredients = report.ingredients,
        dietary_certifications = report.dietary_certifications,
        duration_ms = start.elapsed().as_millis() as u64,
        "Lookup sweep complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TestDatabase;

    #[test]
    fn test_orphan_delete_targets_matching_edge_table() {
        let sql = orphan_delete(LookupKind::Ingredient);
        assert!(sql.contains("DELETE FROM ingredient"));
        assert!(sql.contains("product_ingredient"));
        assert!(sql.contains("ingredient_id"));

        let sql = orphan_delete(LookupKind::DietaryCertification);
        assert!(sql.contains("dietary_certification_id"));
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store_removes_nothing() {
        let test_db = TestDatabase::new().await;
        let report = sweep(&test_db.pool).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_unreferenced_rows() {
        let test_db = TestDatabase::new().await;
        sqlx::query("INSERT INTO ingredient (name) VALUES ('used'), ('unused')")
            .execute(&test_db.pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO dietary_certification (name) VALUES ('Kosher'), ('Halal')")
            .execute(&test_db.pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO product (product_id, dietary_certification_id, is_active)
             SELECT 'p1', id, 0 FROM dietary_certification WHERE name = 'Kosher'",
        )
        .execute(&test_db.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO product_ingredient (product_id, ingredient_id)
             SELECT p.id, i.id FROM product p, ingredient i
             WHERE p.product_id = 'p1' AND i.name = 'used'",
        )
        .execute(&test_db.pool)
        .await
        .unwrap();

        let report = sweep(&test_db.pool).await.unwrap();

        assert_eq!(report.ingredients, 1);
        assert_eq!(report.dietary_certifications, 1);
        assert_eq!(report.sourcing_values, 0);
        assert_eq!(test_db.lookup_names(LookupKind::Ingredient).await, vec!["used"]);
        assert_eq!(
            test_db.lookup_names(LookupKind::DietaryCertification).await,
            vec!["Kosher"]
        );
    }

    #[tokio::test]
    async fn test_sweep_failure_is_reclaim_error() {
        let test_db = TestDatabase::new().await;
        sqlx::query("DROP TABLE product_sourcing_value")
            .execute(&test_db.pool)
            .await
            .unwrap();

        let err = sweep(&test_db.pool).await.unwrap_err();
        assert!(matches!(err, Error::Reclaim(_)));
    }
}
