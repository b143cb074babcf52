//! Transaction orchestration for catalog writes.
//!
//! Each write runs as one unit of work on a single transaction handle. The
//! first failing step aborts the unit and the remaining steps never run;
//! commit happens only after every step succeeded. A panic inside a unit is
//! fenced at the operation boundary and reported as an internal error, and
//! the dropped transaction rolls back.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};

use creamery_core::defaults::MAX_BULK_ITEMS;
use creamery_core::{
    validate_for_create, validate_for_update, validate_product_id, CatalogRepository, Edge,
    EdgeDiff, Error, FieldMask, Item, ItemView, LookupKind, Operation, RelationKind, Result,
    SweepReport,
};

use crate::{items, lookup, read, reclaim, relations};

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// Lifecycle of one write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Idle,
    TxOpen,
    Committing,
    Committed,
    Aborting,
    Aborted,
}

impl TxPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxPhase::Idle => "idle",
            TxPhase::TxOpen => "tx_open",
            TxPhase::Committing => "committing",
            TxPhase::Committed => "committed",
            TxPhase::Aborting => "aborting",
            TxPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxPhase::Committed | TxPhase::Aborted)
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_enter(&self, next: TxPhase) -> bool {
        matches!(
            (self, next),
            (TxPhase::Idle, TxPhase::TxOpen)
                | (TxPhase::Idle, TxPhase::Aborted)
                | (TxPhase::TxOpen, TxPhase::Committing)
                | (TxPhase::TxOpen, TxPhase::Aborting)
                | (TxPhase::Committing, TxPhase::Committed)
                | (TxPhase::Committing, TxPhase::Aborted)
                | (TxPhase::Aborting, TxPhase::Aborted)
        )
    }
}

/// One transaction handle shared by every step of a catalog write.
pub struct UnitOfWork {
    op: Operation,
    phase: TxPhase,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl UnitOfWork {
    /// Acquire a transaction handle for `op`.
    ///
    /// The transaction takes the write lock at `BEGIN`, so concurrent writers
    /// queue on the busy timeout instead of failing on a stale read snapshot.
    pub async fn begin(pool: &SqlitePool, op: Operation) -> Result<Self> {
        let mut uow = Self {
            op,
            phase: TxPhase::Idle,
            tx: None,
        };
        match pool.begin_with("BEGIN IMMEDIATE").await {
            Ok(tx) => {
                uow.tx = Some(tx);
                uow.enter(TxPhase::TxOpen);
                Ok(uow)
            }
            Err(e) => {
                uow.enter(TxPhase::Aborted);
                Err(Error::Database(e))
            }
        }
    }

    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    /// The open transaction. A missing handle is an internal fault.
    pub fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        let op = self.op;
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Internal(format!("{}: transaction handle missing", op)))
    }

    /// Commit on success, roll back on failure, and hand the outcome back.
    ///
    /// A commit failure replaces a successful outcome with the commit error.
    /// A rollback failure is logged; the original step error is returned.
    pub async fn finish<T>(mut self, outcome: Result<T>) -> Result<T> {
        let Some(tx) = self.tx.take() else {
            self.enter(TxPhase::Aborted);
            return Err(Error::Internal(format!(
                "{}: transaction handle missing at finish",
                self.op
            )));
        };

        match outcome {
            Ok(value) => {
                self.enter(TxPhase::Committing);
                if let Err(e) = tx.commit().await {
                    error!(
                        subsystem = "db",
                        component = "catalog",
                        op = self.op.as_str(),
                        error = %e,
                        "Commit failed"
                    );
                    self.enter(TxPhase::Aborted);
                    return Err(Error::Database(e));
                }
                self.enter(TxPhase::Committed);
                Ok(value)
            }
            Err(err) => {
                self.enter(TxPhase::Aborting);
                if let Err(e) = tx.rollback().await {
                    error!(
                        subsystem = "db",
                        component = "catalog",
                        op = self.op.as_str(),
                        error = %e,
                        "Rollback failed"
                    );
                }
                self.enter(TxPhase::Aborted);
                warn!(
                    subsystem = "db",
                    component = "catalog",
                    op = self.op.as_str(),
                    error = %err,
                    "Transaction aborted"
                );
                Err(err)
            }
        }
    }

    fn enter(&mut self, next: TxPhase) {
        if !self.phase.can_enter(next) {
            warn!(
                subsystem = "db",
                component = "catalog",
                op = self.op.as_str(),
                from = self.phase.as_str(),
                to = next.as_str(),
                "Unexpected transaction phase transition"
            );
        }
        debug!(
            subsystem = "db",
            component = "catalog",
            op = self.op.as_str(),
            tx_phase = next.as_str(),
            "Transaction phase"
        );
        self.phase = next;
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // sqlx queues a rollback when the transaction is dropped.
            warn!(
                subsystem = "db",
                component = "catalog",
                op = self.op.as_str(),
                tx_phase = self.phase.as_str(),
                "Unit of work dropped before finish, rolling back"
            );
        }
    }
}

/// Run `fut`, converting a panic into [`Error::Internal`].
pub async fn guarded<T, F>(op: Operation, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                subsystem = "db",
                component = "catalog",
                op = op.as_str(),
                error = %detail,
                "Panic contained at operation boundary"
            );
            Err(Error::Internal(format!("{} panicked: {}", op, detail)))
        }
    }
}

// =============================================================================
// STEP SEQUENCES
// =============================================================================

/// Insert every item with its row, certification and edges.
///
/// Lookup names are resolved once per kind for the whole batch, then rows
/// and edges are written item by item.
async fn create_items_tx(tx: &mut Transaction<'_, Sqlite>, batch: &[Item]) -> Result<Vec<i64>> {
    let mut names: HashMap<RelationKind, BTreeSet<String>> = HashMap::new();
    for kind in RelationKind::ALL {
        let union = batch.iter().flat_map(|item| item.names_for(kind)).collect();
        names.insert(kind, union);
    }
    let certifications: BTreeSet<String> = batch
        .iter()
        .filter_map(|item| item.certification().map(str::to_string))
        .collect();

    let mut resolved: HashMap<RelationKind, HashMap<String, i64>> = HashMap::new();
    for kind in RelationKind::ALL {
        let ids = lookup::resolve_tx(tx, kind.lookup(), &names[&kind]).await?;
        resolved.insert(kind, ids);
    }
    let certification_ids =
        lookup::resolve_tx(tx, LookupKind::DietaryCertification, &certifications).await?;

    let mut row_ids = Vec::with_capacity(batch.len());
    for item in batch {
        let certification_id = match item.certification() {
            Some(name) => Some(certification_ids.get(name).copied().ok_or_else(|| {
                Error::Internal(format!("certification '{}' was not resolved", name))
            })?),
            None => None,
        };
        let row_id = items::insert_tx(tx, item, certification_id).await?;

        for kind in RelationKind::ALL {
            let ids = &resolved[&kind];
            let mut diff = EdgeDiff::default();
            for name in item.names_for(kind) {
                let attribute_id = ids.get(&name).copied().ok_or_else(|| {
                    Error::Internal(format!("{} '{}' was not resolved", kind, name))
                })?;
                diff.to_add.insert(Edge::new(row_id, attribute_id));
            }
            relations::apply_tx(tx, kind, &diff).await?;
        }
        row_ids.push(row_id);
    }
    Ok(row_ids)
}

/// Overwrite the masked row fields and resynchronize the masked relations.
async fn update_item_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    item: &Item,
    mask: FieldMask,
) -> Result<i64> {
    let row_id = items::require_row_id_tx(tx, product_id, true).await?;
    items::update_tx(tx, row_id, item, mask).await?;
    for kind in mask.relations() {
        relations::sync_tx(tx, kind, row_id, &item.names_for(kind)).await?;
    }
    Ok(row_id)
}

async fn soft_delete_tx(tx: &mut Transaction<'_, Sqlite>, product_id: &str) -> Result<i64> {
    let row_id = items::require_row_id_tx(tx, product_id, true).await?;
    items::deactivate_tx(tx, row_id).await?;
    Ok(row_id)
}

/// Remove sourcing value edges, then ingredient edges, then the row.
async fn permanent_delete_tx(tx: &mut Transaction<'_, Sqlite>, product_id: &str) -> Result<i64> {
    let row_id = items::require_row_id_tx(tx, product_id, false).await?;
    for kind in RelationKind::ALL {
        let removed = relations::detach_all_tx(tx, kind, row_id).await?;
        debug!(
            subsystem = "db",
            component = "catalog",
            op = Operation::PermanentDeleteItem.as_str(),
            kind = kind.as_str(),
            row_id,
            edges_removed = removed,
            "Detached relation"
        );
    }
    items::delete_row_tx(tx, row_id).await?;
    Ok(row_id)
}

fn validate_batch(items: &[Item]) -> Result<()> {
    if items.len() > MAX_BULK_ITEMS {
        return Err(Error::InvalidInput(format!(
            "bulk load is limited to {} items",
            MAX_BULK_ITEMS
        )));
    }
    let mut seen = BTreeSet::new();
    for item in items {
        validate_for_create(item)?;
        let key = item.product_id.trim();
        if !seen.insert(key) {
            return Err(Error::InvalidInput(format!(
                "duplicate product id '{}' in batch",
                key
            )));
        }
    }
    Ok(())
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// SQLite-backed implementation of [`CatalogRepository`].
#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Sweep after a committed delete. Failures are logged, never returned.
    async fn sweep_best_effort(&self) {
        if let Err(e) = reclaim::sweep(&self.pool).await {
            warn!(
                subsystem = "db",
                component = "catalog",
                op = Operation::Sweep.as_str(),
                error = %e,
                "Lookup sweep failed, orphans remain until the next sweep"
            );
        }
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn create_item(&self, item: Item) -> Result<i64> {
        let start = Instant::now();
        validate_for_create(&item)?;

        let row_id = guarded(Operation::CreateItem, async {
            let mut uow = UnitOfWork::begin(&self.pool, Operation::CreateItem).await?;
            let outcome = create_items_tx(uow.tx()?, std::slice::from_ref(&item)).await;
            uow.finish(outcome).await
        })
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Internal("create produced no row id".to_string()))?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = Operation::CreateItem.as_str(),
            product_id = item.product_id.trim(),
            row_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Product created"
        );
        Ok(row_id)
    }

    async fn read_item(&self, product_id: &str) -> Result<ItemView> {
        validate_product_id(product_id)?;
        let product_id = product_id.trim();
        guarded(Operation::ReadItem, read::read_item(&self.pool, product_id)).await
    }

    async fn update_item(&self, product_id: &str, item: Item, mask: FieldMask) -> Result<i64> {
        let start = Instant::now();
        debug!(
            subsystem = "db",
            component = "catalog",
            op = Operation::UpdateItem.as_str(),
            product_id = product_id.trim(),
            fields = %mask,
            "Applying masked update"
        );
        validate_for_update(product_id, &item, mask)?;
        let product_id = product_id.trim();

        let row_id = guarded(Operation::UpdateItem, async {
            let mut uow = UnitOfWork::begin(&self.pool, Operation::UpdateItem).await?;
            let outcome = update_item_tx(uow.tx()?, product_id, &item, mask).await;
            uow.finish(outcome).await
        })
        .await?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = Operation::UpdateItem.as_str(),
            product_id,
            row_id,
            fields = %mask,
            duration_ms = start.elapsed().as_millis() as u64,
            "Product updated"
        );
        Ok(row_id)
    }

    async fn soft_delete_item(&self, product_id: &str) -> Result<i64> {
        let start = Instant::now();
        validate_product_id(product_id)?;
        let product_id = product_id.trim();

        let row_id = guarded(Operation::SoftDeleteItem, async {
            let mut uow = UnitOfWork::begin(&self.pool, Operation::SoftDeleteItem).await?;
            let outcome = soft_delete_tx(uow.tx()?, product_id).await;
            uow.finish(outcome).await
        })
        .await?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = Operation::SoftDeleteItem.as_str(),
            product_id,
            row_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Product deactivated"
        );
        Ok(row_id)
    }

    async fn permanent_delete_item(&self, product_id: &str) -> Result<i64> {
        let start = Instant::now();
        validate_product_id(product_id)?;
        let product_id = product_id.trim();

        let row_id = guarded(Operation::PermanentDeleteItem, async {
            let mut uow = UnitOfWork::begin(&self.pool, Operation::PermanentDeleteItem).await?;
            let outcome = permanent_delete_tx(uow.tx()?, product_id).await;
            uow.finish(outcome).await
        })
        .await?;

        self.sweep_best_effort().await;

        info!(
            subsystem = "db",
            component = "catalog",
            op = Operation::PermanentDeleteItem.as_str(),
            product_id,
            row_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Product deleted"
        );
        Ok(row_id)
    }

    async fn bulk_load(&self, items: Vec<Item>) -> Result<Vec<i64>> {
        let start = Instant::now();
        validate_batch(&items)?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let row_ids = guarded(Operation::BulkLoad, async {
            let mut uow = UnitOfWork::begin(&self.pool, Operation::BulkLoad).await?;
            let outcome = create_items_tx(uow.tx()?, &items).await;
            uow.finish(outcome).await
        })
        .await?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = Operation::BulkLoad.as_str(),
            item_count = row_ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Bulk load committed"
        );
        Ok(row_ids)
    }

    async fn sweep(&self) -> Result<SweepReport> {
        guarded(Operation::Sweep, reclaim::sweep(&self.pool)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(TxPhase::Idle.can_enter(TxPhase::TxOpen));
        assert!(TxPhase::TxOpen.can_enter(TxPhase::Committing));
        assert!(TxPhase::TxOpen.can_enter(TxPhase::Aborting));
        assert!(TxPhase::Committing.can_enter(TxPhase::Aborted));
        assert!(!TxPhase::Committed.can_enter(TxPhase::Aborting));
        assert!(!TxPhase::Idle.can_enter(TxPhase::Committing));
        assert!(!TxPhase::Aborted.can_enter(TxPhase::TxOpen));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(TxPhase::Committed.is_terminal());
        assert!(TxPhase::Aborted.is_terminal());
        assert!(!TxPhase::TxOpen.is_terminal());
    }

    #[test]
    fn test_batch_rejects_duplicate_keys() {
        let items = vec![Item::new("p1"), Item::new(" p1 ")];
        let err = validate_batch(&items).unwrap_err();
        assert!(err.to_string().contains("duplicate product id 'p1'"));
    }

    #[test]
    fn test_batch_rejects_any_invalid_item() {
        let items = vec![Item::new("p1"), Item::new("")];
        assert!(validate_batch(&items).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_guarded_passes_outcome_through() {
        let ok = guarded(Operation::ReadItem, async { Ok::<_, Error>(7) }).await.unwrap();
        assert_eq!(ok, 7);

        let err = guarded(Operation::ReadItem, async {
            Err::<i64, _>(Error::ItemNotFound("p1".to_string()))
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_guarded_converts_panic_to_internal_error() {
        let err = guarded(Operation::ReadItem, async {
            if true {
                panic!("handle vanished");
            }
            Ok::<i64, Error>(0)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Internal(ref m) if m.contains("handle vanished")));
        assert!(!err.is_validation());
    }
}
