//! Core data models for the creamery catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::field_mask::ItemField;
use crate::messages;

// =============================================================================
// PRODUCT TYPES
// =============================================================================

/// Desired state of a product, as supplied by create, update and bulk load.
///
/// Serializes with the catalog's wire field names. An empty
/// `dietary_certification` means "no certification".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Business key, unique and immutable after creation.
    #[serde(rename = "productId", default)]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub image_closed: String,
    #[serde(default)]
    pub image_open: String,
    #[serde(default)]
    pub allergy_info: String,
    #[serde(rename = "dietary_certifications", default)]
    pub dietary_certification: String,
    #[serde(default)]
    pub sourcing_values: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl Item {
    /// Create an item with only its business key set.
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Default::default()
        }
    }

    /// The certification name, or `None` when the field is blank.
    pub fn certification(&self) -> Option<&str> {
        let trimmed = self.dietary_certification.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Deduplicated, trimmed attribute names for one relation kind.
    pub fn names_for(&self, kind: RelationKind) -> BTreeSet<String> {
        let source = match kind {
            RelationKind::SourcingValue => &self.sourcing_values,
            RelationKind::Ingredient => &self.ingredients,
        };
        normalize_names(source)
    }
}

/// Trim names and collapse duplicates. Blank entries are dropped here;
/// validation rejects them before this is reached on write paths.
pub fn normalize_names(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Denormalized read view of an active product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    /// Surrogate row id.
    pub id: i64,
    #[serde(rename = "productId")]
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub story: String,
    pub image_closed: String,
    pub image_open: String,
    pub allergy_info: String,
    #[serde(rename = "dietary_certifications")]
    pub dietary_certification: Option<String>,
    /// Sorted by name.
    pub sourcing_values: Vec<String>,
    /// Sorted by name.
    pub ingredients: Vec<String>,
}

// =============================================================================
// LOOKUP AND RELATION KINDS
// =============================================================================

/// One of the three name-keyed lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKind {
    SourcingValue,
    Ingredient,
    DietaryCertification,
}

impl LookupKind {
    pub const ALL: [LookupKind; 3] = [
        LookupKind::SourcingValue,
        LookupKind::Ingredient,
        LookupKind::DietaryCertification,
    ];

    /// Lookup table name.
    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::SourcingValue => "sourcing_value",
            LookupKind::Ingredient => "ingredient",
            LookupKind::DietaryCertification => "dietary_certification",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.table()
    }
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two many-to-many attribute relations of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    SourcingValue,
    Ingredient,
}

impl RelationKind {
    pub const ALL: [RelationKind; 2] = [RelationKind::SourcingValue, RelationKind::Ingredient];

    /// Lookup table holding the attribute names.
    pub fn lookup(&self) -> LookupKind {
        match self {
            RelationKind::SourcingValue => LookupKind::SourcingValue,
            RelationKind::Ingredient => LookupKind::Ingredient,
        }
    }

    /// Edge table linking products to attribute rows.
    pub fn edge_table(&self) -> &'static str {
        match self {
            RelationKind::SourcingValue => "product_sourcing_value",
            RelationKind::Ingredient => "product_ingredient",
        }
    }

    /// Attribute id column of the edge table.
    pub fn attribute_column(&self) -> &'static str {
        match self {
            RelationKind::SourcingValue => "sourcing_value_id",
            RelationKind::Ingredient => "ingredient_id",
        }
    }

    /// Field mask entry that makes this relation authoritative in an update.
    pub fn field(&self) -> ItemField {
        match self {
            RelationKind::SourcingValue => ItemField::SourcingValues,
            RelationKind::Ingredient => ItemField::Ingredients,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.lookup().as_str()
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// A row in an edge table: (product row id, attribute id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub product_row_id: i64,
    pub attribute_id: i64,
}

impl Edge {
    pub fn new(product_row_id: i64, attribute_id: i64) -> Self {
        Self {
            product_row_id,
            attribute_id,
        }
    }
}

/// An attribute currently linked to a product, with its resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAttribute {
    pub attribute_id: i64,
    pub name: String,
}

/// Minimal edit set that moves one relation to its desired state.
///
/// `to_add` and `to_remove` are disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDiff {
    pub to_add: BTreeSet<Edge>,
    pub to_remove: BTreeSet<Edge>,
}

impl EdgeDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Engine operations exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateItem,
    ReadItem,
    UpdateItem,
    SoftDeleteItem,
    PermanentDeleteItem,
    BulkLoad,
    Sweep,
}

impl Operation {
    /// Name used in the `op` log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateItem => "create_item",
            Operation::ReadItem => "read_item",
            Operation::UpdateItem => "update_item",
            Operation::SoftDeleteItem => "soft_delete_item",
            Operation::PermanentDeleteItem => "permanent_delete_item",
            Operation::BulkLoad => "bulk_load",
            Operation::Sweep => "sweep",
        }
    }

    /// Caller-facing message for a successful outcome.
    pub fn success_message(&self) -> &'static str {
        match self {
            Operation::CreateItem => messages::CREATE_SUCCESS,
            Operation::ReadItem => messages::READ_SUCCESS,
            Operation::UpdateItem => messages::UPDATE_SUCCESS,
            Operation::SoftDeleteItem => messages::SOFT_DELETE_SUCCESS,
            Operation::PermanentDeleteItem => messages::PERMANENT_DELETE_SUCCESS,
            Operation::BulkLoad => messages::BULK_LOAD_SUCCESS,
            Operation::Sweep => messages::SWEEP_SUCCESS,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RECLAMATION
// =============================================================================

/// Lookup rows removed by one reclamation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub sourcing_values: u64,
    pub ingredients: u64,
    pub dietary_certifications: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.sourcing_values + self.ingredients + self.dietary_certifications
    }

    /// Record the count for one lookup kind.
    pub fn record(&mut self, kind: LookupKind, removed: u64) {
        match kind {
            LookupKind::SourcingValue => self.sourcing_values = removed,
            LookupKind::Ingredient => self.ingredients = removed,
            LookupKind::DietaryCertification => self.dietary_certifications = removed,
        }
    }
}
