//! Lookup resolution for sourcing values, ingredients and certifications.
//!
//! Names are made to exist exactly once with an idempotent insert. The
//! UNIQUE constraint on `name` is the only synchronization between
//! concurrent writers; there is no application-level locking.

use std::collections::{BTreeSet, HashMap};

use sqlx::{QueryBuilder, Row, Sqlite, Transaction};
use tracing::debug;

use creamery_core::{Error, LookupKind, Result};

/// Upper bound on bound parameters per `IN (...)` lookup.
const SELECT_CHUNK: usize = 500;

/// Ensure every name exists in the lookup table and return name → id.
///
/// Must run inside the caller's transaction. An empty set issues no
/// statement. Existing names are neither duplicated nor an error; any other
/// insert failure propagates and aborts the caller's transaction.
pub async fn resolve_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: LookupKind,
    names: &BTreeSet<String>,
) -> Result<HashMap<String, i64>> {
    if names.is_empty() {
        return Ok(HashMap::new());
    }

    let insert = format!(
        "INSERT INTO {} (name) VALUES (?) ON CONFLICT (name) DO NOTHING",
        kind.table()
    );
    let mut created = 0u64;
    for name in names {
        let result = sqlx::query(&insert)
            .bind(name.as_str())
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        created += result.rows_affected();
    }

    let resolved = select_ids_tx(tx, kind, names).await?;
    if let Some(missing) = names.iter().find(|n| !resolved.contains_key(*n)) {
        return Err(Error::Internal(format!(
            "{} '{}' missing after insert",
            kind, missing
        )));
    }

    debug!(
        subsystem = "db",
        component = "lookup",
        op = "resolve",
        kind = kind.as_str(),
        requested = names.len(),
        created,
        "Resolved lookup names"
    );
    Ok(resolved)
}

/// Resolve a single name, creating it if absent.
pub async fn resolve_one_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: LookupKind,
    name: &str,
) -> Result<i64> {
    let names: BTreeSet<String> = std::iter::once(name.to_string()).collect();
    let resolved = resolve_tx(tx, kind, &names).await?;
    resolved
        .get(name)
        .copied()
        .ok_or_else(|| Error::Internal(format!("{} '{}' did not resolve", kind, name)))
}

/// Look up ids of existing names without creating anything.
pub async fn select_ids_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: LookupKind,
    names: &BTreeSet<String>,
) -> Result<HashMap<String, i64>> {
    let mut resolved = HashMap::with_capacity(names.len());
    let names: Vec<&String> = names.iter().collect();

    for chunk in names.chunks(SELECT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT id, name FROM {} WHERE name IN (", kind.table()));
        let mut separated = qb.separated(", ");
        for name in chunk {
            separated.push_bind(name.to_string());
        }
        separated.push_unseparated(")");

        let rows = qb
            .build()
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;
        for row in rows {
            resolved.insert(row.get::<String, _>("name"), row.get::<i64, _>("id"));
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TestDatabase;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_empty_set_is_noop() {
        let test_db = TestDatabase::new().await;
        let mut tx = test_db.pool.begin().await.unwrap();
        let resolved = resolve_tx(&mut tx, LookupKind::Ingredient, &BTreeSet::new())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(resolved.is_empty());
        assert_eq!(test_db.count("ingredient").await, 0);
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_and_reuses_existing() {
        let test_db = TestDatabase::new().await;

        let mut tx = test_db.pool.begin().await.unwrap();
        let first = resolve_tx(&mut tx, LookupKind::SourcingValue, &names(&["a", "b"]))
            .await
            .unwrap();
        let second = resolve_tx(&mut tx, LookupKind::SourcingValue, &names(&["b", "c"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first["b"], second["b"]);
        assert_ne!(first["a"], second["c"]);
        assert_eq!(
            test_db.lookup_names(LookupKind::SourcingValue).await,
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn test_resolve_is_scoped_to_kind() {
        let test_db = TestDatabase::new().await;

        let mut tx = test_db.pool.begin().await.unwrap();
        resolve_tx(&mut tx, LookupKind::SourcingValue, &names(&["vegan"]))
            .await
            .unwrap();
        resolve_tx(&mut tx, LookupKind::Ingredient, &names(&["vegan"]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(test_db.count("sourcing_value").await, 1);
        assert_eq!(test_db.count("ingredient").await, 1);
        assert_eq!(test_db.count("dietary_certification").await, 0);
    }

    #[tokio::test]
    async fn test_resolve_rolled_back_with_transaction() {
        let test_db = TestDatabase::new().await;

        let mut tx = test_db.pool.begin().await.unwrap();
        resolve_tx(&mut tx, LookupKind::Ingredient, &names(&["cream"]))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(test_db.count("ingredient").await, 0);
    }

    #[tokio::test]
    async fn test_resolve_one_returns_same_id_twice() {
        let test_db = TestDatabase::new().await;

        let mut tx = test_db.pool.begin().await.unwrap();
        let a = resolve_one_tx(&mut tx, LookupKind::DietaryCertification, "Kosher")
            .await
            .unwrap();
        let b = resolve_one_tx(&mut tx, LookupKind::DietaryCertification, "Kosher")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(a, b);
        assert_eq!(test_db.count("dietary_certification").await, 1);
    }

    #[tokio::test]
    async fn test_select_ids_handles_more_names_than_one_chunk() {
        let test_db = TestDatabase::new().await;
        let many: BTreeSet<String> = (0..(SELECT_CHUNK + 25))
            .map(|i| format!("ingredient-{:04}", i))
            .collect();

        let mut tx = test_db.pool.begin().await.unwrap();
        let resolved = resolve_tx(&mut tx, LookupKind::Ingredient, &many)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(resolved.len(), many.len());
    }
}
