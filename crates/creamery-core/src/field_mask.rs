//! Field masks for partial product updates.
//!
//! An update names exactly which fields are authoritative. Unnamed fields
//! keep their stored value at both the row and the edge level.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::RelationKind;

/// A product field that an update may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemField {
    Name,
    Description,
    Story,
    ImageClosed,
    ImageOpen,
    AllergyInfo,
    DietaryCertification,
    SourcingValues,
    Ingredients,
}

impl ItemField {
    pub const ALL: [ItemField; 9] = [
        ItemField::Name,
        ItemField::Description,
        ItemField::Story,
        ItemField::ImageClosed,
        ItemField::ImageOpen,
        ItemField::AllergyInfo,
        ItemField::DietaryCertification,
        ItemField::SourcingValues,
        ItemField::Ingredients,
    ];

    /// Wire name, as used in the comma-separated field list.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Name => "name",
            ItemField::Description => "description",
            ItemField::Story => "story",
            ItemField::ImageClosed => "image_closed",
            ItemField::ImageOpen => "image_open",
            ItemField::AllergyInfo => "allergy_info",
            ItemField::DietaryCertification => "dietary_certifications",
            ItemField::SourcingValues => "sourcing_values",
            ItemField::Ingredients => "ingredients",
        }
    }

    /// Product table column written by this field, if it lives on the row.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            ItemField::Name => Some("name"),
            ItemField::Description => Some("description"),
            ItemField::Story => Some("story"),
            ItemField::ImageClosed => Some("image_closed"),
            ItemField::ImageOpen => Some("image_open"),
            ItemField::AllergyInfo => Some("allergy_info"),
            ItemField::DietaryCertification => Some("dietary_certification_id"),
            ItemField::SourcingValues | ItemField::Ingredients => None,
        }
    }

    /// Relation synchronized by this field, if it is an edge-level field.
    pub fn relation(&self) -> Option<RelationKind> {
        match self {
            ItemField::SourcingValues => Some(RelationKind::SourcingValue),
            ItemField::Ingredients => Some(RelationKind::Ingredient),
            _ => None,
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "productId" | "product_id" => Err(Error::InvalidInput(
                "product id cannot be changed by an update".to_string(),
            )),
            other => ItemField::ALL
                .iter()
                .copied()
                .find(|f| f.as_str() == other)
                .ok_or_else(|| Error::UnknownField(other.to_string())),
        }
    }
}

/// Set of [`ItemField`]s, stored as a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldMask(u16);

impl FieldMask {
    /// A mask naming no fields. Updates reject it.
    pub fn empty() -> Self {
        Self(0)
    }

    /// A mask naming every updatable field.
    pub fn all() -> Self {
        ItemField::ALL.into_iter().collect()
    }

    /// Parse a comma-separated field list such as `"name, story,ingredients"`.
    ///
    /// Whitespace around names is ignored. Unknown names, the business key,
    /// and an empty list are all rejected.
    pub fn parse(list: &str) -> Result<Self> {
        let mut mask = Self::empty();
        for raw in list.split(',') {
            let name: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            if name.is_empty() {
                continue;
            }
            mask.insert(name.parse()?);
        }
        if mask.is_empty() {
            return Err(Error::InvalidInput("field mask is empty".to_string()));
        }
        Ok(mask)
    }

    pub fn with(mut self, field: ItemField) -> Self {
        self.insert(field);
        self
    }

    pub fn insert(&mut self, field: ItemField) {
        self.0 |= field.bit();
    }

    pub fn contains(&self, field: ItemField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = ItemField> + '_ {
        ItemField::ALL.into_iter().filter(|f| self.contains(*f))
    }

    /// Fields that live on the product row.
    pub fn row_fields(&self) -> impl Iterator<Item = ItemField> + '_ {
        self.iter().filter(|f| f.column().is_some())
    }

    /// Relations this mask makes authoritative.
    pub fn relations(&self) -> impl Iterator<Item = RelationKind> + '_ {
        self.iter().filter_map(|f| f.relation())
    }

    pub fn touches_row(&self) -> bool {
        self.row_fields().next().is_some()
    }
}

impl FromIterator<ItemField> for FieldMask {
    fn from_iter<I: IntoIterator<Item = ItemField>>(iter: I) -> Self {
        let mut mask = Self::empty();
        for field in iter {
            mask.insert(field);
        }
        mask
    }
}

impl FromStr for FieldMask {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|field| field.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
