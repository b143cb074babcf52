//! Core traits for creamery abstractions.
//!
//! The HTTP layer and the bulk loader program against these traits; the
//! storage-backed implementation lives in `creamery-db`.

use async_trait::async_trait;

use crate::error::Result;
use crate::field_mask::FieldMask;
use crate::models::{Item, ItemView, SweepReport};

// =============================================================================
// CATALOG REPOSITORY TRAITS
// =============================================================================

/// Transactional product catalog operations.
///
/// Every write is atomic: either every table reflects the new product state
/// or none does. Returned ids are surrogate row ids.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Create a product with all of its fields and relations.
    async fn create_item(&self, item: Item) -> Result<i64>;

    /// Read the active product with the given business key.
    async fn read_item(&self, product_id: &str) -> Result<ItemView>;

    /// Overwrite only the fields named in `mask`.
    async fn update_item(&self, product_id: &str, item: Item, mask: FieldMask) -> Result<i64>;

    /// Mark a product inactive, keeping its row and edges.
    async fn soft_delete_item(&self, product_id: &str) -> Result<i64>;

    /// Remove a product and its edges, then sweep unreferenced lookups.
    async fn permanent_delete_item(&self, product_id: &str) -> Result<i64>;

    /// Create many products inside one transaction.
    async fn bulk_load(&self, items: Vec<Item>) -> Result<Vec<i64>>;

    /// Delete lookup rows no product references.
    async fn sweep(&self) -> Result<SweepReport>;
}
