//! Relation differ for the product ↔ sourcing value / ingredient edges.
//!
//! A write names the complete desired attribute set for a relation. The
//! differ turns that into the minimal edit: insert what is missing, delete
//! what is no longer wanted, leave the rest of the edges untouched.

use std::collections::{BTreeSet, HashMap, HashSet};

use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use creamery_core::{Edge, EdgeDiff, Error, LinkedAttribute, RelationKind, Result};

use crate::lookup;

/// Compute the edit that moves `current` to `desired`.
///
/// `resolved` must map every desired name that is not already linked to its
/// attribute id. An empty `desired` set detaches every current edge.
pub fn compute_diff(
    product_row_id: i64,
    current: &[LinkedAttribute],
    desired: &BTreeSet<String>,
    resolved: &HashMap<String, i64>,
) -> Result<EdgeDiff> {
    let mut diff = EdgeDiff::default();
    let mut linked: HashSet<&str> = HashSet::with_capacity(current.len());

    for attr in current {
        if desired.contains(&attr.name) {
            linked.insert(attr.name.as_str());
        } else {
            diff.to_remove
                .insert(Edge::new(product_row_id, attr.attribute_id));
        }
    }

    for name in desired {
        if linked.contains(name.as_str()) {
            continue;
        }
        let attribute_id = resolved
            .get(name)
            .copied()
            .ok_or_else(|| Error::Internal(format!("attribute '{}' was not resolved", name)))?;
        diff.to_add.insert(Edge::new(product_row_id, attribute_id));
    }

    Ok(diff)
}

/// Attributes currently linked to a product, sorted by name.
pub async fn current_edges_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    product_row_id: i64,
) -> Result<Vec<LinkedAttribute>> {
    let query = format!(
        "SELECT e.{col} AS attribute_id, l.name AS name
         FROM {edge} e
         JOIN {lookup} l ON l.id = e.{col}
         WHERE e.product_id = ?
         ORDER BY l.name",
        col = kind.attribute_column(),
        edge = kind.edge_table(),
        lookup = kind.lookup().table(),
    );
    let rows = sqlx::query(&query)
        .bind(product_row_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(rows
        .into_iter()
        .map(|row| LinkedAttribute {
            attribute_id: row.get("attribute_id"),
            name: row.get("name"),
        })
        .collect())
}

/// Read the current edges and diff them against `desired`.
///
/// Only names that are not already linked go through the lookup resolver,
/// so an unchanged relation issues no lookup writes.
pub async fn diff_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    product_row_id: i64,
    desired: &BTreeSet<String>,
) -> Result<EdgeDiff> {
    let current = current_edges_tx(tx, kind, product_row_id).await?;
    let linked: HashSet<&str> = current.iter().map(|a| a.name.as_str()).collect();
    let missing: BTreeSet<String> = desired
        .iter()
        .filter(|name| !linked.contains(name.as_str()))
        .cloned()
        .collect();

    let resolved = lookup::resolve_tx(tx, kind.lookup(), &missing).await?;
    compute_diff(product_row_id, &current, desired, &resolved)
}

/// Execute a diff: removes first, then adds, on the caller's transaction.
pub async fn apply_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    diff: &EdgeDiff,
) -> Result<()> {
    if !diff.to_remove.is_empty() {
        let delete = format!(
            "DELETE FROM {} WHERE product_id = ? AND {} = ?",
            kind.edge_table(),
            kind.attribute_column()
        );
        for edge in &diff.to_remove {
            sqlx::query(&delete)
                .bind(edge.product_row_id)
                .bind(edge.attribute_id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
    }

    if !diff.to_add.is_empty() {
        let insert = format!(
            "INSERT INTO {} (product_id, {}) VALUES (?, ?)",
            kind.edge_table(),
            kind.attribute_column()
        );
        for edge in &diff.to_add {
            sqlx::query(&insert)
                .bind(edge.product_row_id)
                .bind(edge.attribute_id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
    }
    Ok(())
}

/// Diff and apply in one step. Returns the diff that was applied.
pub async fn sync_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    product_row_id: i64,
    desired: &BTreeSet<String>,
) -> Result<EdgeDiff> {
    let diff = diff_tx(tx, kind, product_row_id, desired).await?;
    apply_tx(tx, kind, &diff).await?;

    debug!(
        subsystem = "db",
        component = "relations",
        op = "sync",
        kind = kind.as_str(),
        row_id = product_row_id,
        edges_added = diff.to_add.len(),
        edges_removed = diff.to_remove.len(),
        "Relation synchronized"
    );
    Ok(diff)
}

/// Remove every edge of a product in one relation.
pub async fn detach_all_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: RelationKind,
    product_row_id: i64,
) -> Result<u64> {
    let delete = format!("DELETE FROM {} WHERE product_id = ?", kind.edge_table());
    let result = sqlx::query(&delete)
        .bind(product_row_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(pairs: &[(i64, &str)]) -> Vec<LinkedAttribute> {
        pairs
            .iter()
            .map(|(id, name)| LinkedAttribute {
                attribute_id: *id,
                name: name.to_string(),
            })
            .collect()
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn ids(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(n, id)| (n.to_string(), *id)).collect()
    }

    fn attribute_ids(edges: &BTreeSet<Edge>) -> Vec<i64> {
        edges.iter().map(|e| e.attribute_id).collect()
    }

    #[test]
    fn test_diff_adds_missing_removes_stale_keeps_shared() {
        let current = linked(&[(1, "a"), (2, "b")]);
        let desired = names(&["b", "c"]);
        let resolved = ids(&[("c", 3)]);

        let diff = compute_diff(10, &current, &desired, &resolved).unwrap();

        assert_eq!(attribute_ids(&diff.to_remove), vec![1]);
        assert_eq!(attribute_ids(&diff.to_add), vec![3]);
        assert!(diff.to_add.iter().all(|e| e.product_row_id == 10));
    }

    #[test]
    fn test_diff_identical_sets_is_empty() {
        let current = linked(&[(1, "a"), (2, "b")]);
        let desired = names(&["a", "b"]);

        let diff = compute_diff(10, &current, &desired, &HashMap::new()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_empty_desired_detaches_everything() {
        let current = linked(&[(1, "a"), (2, "b"), (5, "e")]);

        let diff = compute_diff(10, &current, &BTreeSet::new(), &HashMap::new()).unwrap();

        assert!(diff.to_add.is_empty());
        assert_eq!(attribute_ids(&diff.to_remove), vec![1, 2, 5]);
    }

    #[test]
    fn test_diff_from_nothing_adds_everything() {
        let desired = names(&["x", "y"]);
        let resolved = ids(&[("x", 7), ("y", 8)]);

        let diff = compute_diff(3, &[], &desired, &resolved).unwrap();

        assert!(diff.to_remove.is_empty());
        assert_eq!(attribute_ids(&diff.to_add), vec![7, 8]);
    }

    #[test]
    fn test_diff_sets_are_disjoint() {
        let current = linked(&[(1, "a"), (2, "b"), (3, "c")]);
        let desired = names(&["c", "d"]);
        let resolved = ids(&[("d", 4)]);

        let diff = compute_diff(1, &current, &desired, &resolved).unwrap();
        assert!(diff.to_add.is_disjoint(&diff.to_remove));
    }

    #[test]
    fn test_diff_does_not_need_ids_for_already_linked_names() {
        let current = linked(&[(1, "a")]);
        let desired = names(&["a", "b"]);
        let resolved = ids(&[("b", 2)]);

        let diff = compute_diff(1, &current, &desired, &resolved).unwrap();
        assert_eq!(attribute_ids(&diff.to_add), vec![2]);
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn test_diff_unresolved_name_is_internal_error() {
        let desired = names(&["ghost"]);
        let err = compute_diff(1, &[], &desired, &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
