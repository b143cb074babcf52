//! Payload validation.
//!
//! Everything here runs before a storage handle is acquired, so a rejected
//! request never touches the database.

use crate::defaults::{MAX_LOOKUP_NAME_LEN, MAX_NAME_LEN, MAX_PRODUCT_ID_LEN, MAX_TEXT_LEN};
use crate::error::{Error, Result};
use crate::field_mask::{FieldMask, ItemField};
use crate::models::Item;

/// Validate a product business key.
pub fn validate_product_id(product_id: &str) -> Result<()> {
    if product_id.trim().is_empty() {
        return Err(Error::InvalidInput("product id is required".to_string()));
    }
    if product_id.len() > MAX_PRODUCT_ID_LEN {
        return Err(Error::InvalidInput(format!(
            "product id must be {} characters or less",
            MAX_PRODUCT_ID_LEN
        )));
    }
    Ok(())
}

/// Validate one lookup name (sourcing value, ingredient, certification).
///
/// Names are compared after trimming; a name that is blank once trimmed is
/// rejected rather than silently dropped.
pub fn validate_lookup_name(field: ItemField, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} contains a blank name",
            field
        )));
    }
    if trimmed.len() > MAX_LOOKUP_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "{} name must be {} characters or less",
            field, MAX_LOOKUP_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_len(field: ItemField, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(Error::InvalidInput(format!(
            "{} must be {} characters or less",
            field, max
        )));
    }
    Ok(())
}

fn validate_field(item: &Item, field: ItemField) -> Result<()> {
    match field {
        ItemField::Name => validate_len(field, &item.name, MAX_NAME_LEN),
        ItemField::Description => validate_len(field, &item.description, MAX_TEXT_LEN),
        ItemField::Story => validate_len(field, &item.story, MAX_TEXT_LEN),
        ItemField::ImageClosed => validate_len(field, &item.image_closed, MAX_TEXT_LEN),
        ItemField::ImageOpen => validate_len(field, &item.image_open, MAX_TEXT_LEN),
        ItemField::AllergyInfo => validate_len(field, &item.allergy_info, MAX_TEXT_LEN),
        ItemField::DietaryCertification => match item.certification() {
            Some(name) => validate_lookup_name(field, name),
            None => Ok(()),
        },
        ItemField::SourcingValues => item
            .sourcing_values
            .iter()
            .try_for_each(|n| validate_lookup_name(field, n)),
        ItemField::Ingredients => item
            .ingredients
            .iter()
            .try_for_each(|n| validate_lookup_name(field, n)),
    }
}

/// Validate a full create payload.
pub fn validate_for_create(item: &Item) -> Result<()> {
    validate_product_id(&item.product_id)?;
    ItemField::ALL
        .iter()
        .try_for_each(|field| validate_field(item, *field))
}

/// Validate a partial update payload addressed to `product_id`.
///
/// Only fields named in `mask` are checked. The payload may omit the
/// business key; if it carries one it must match the addressed key.
pub fn validate_for_update(product_id: &str, item: &Item, mask: FieldMask) -> Result<()> {
    validate_product_id(product_id)?;
    if mask.is_empty() {
        return Err(Error::InvalidInput("field mask is empty".to_string()));
    }
    let payload_key = item.product_id.trim();
    if !payload_key.is_empty() && payload_key != product_id.trim() {
        return Err(Error::InvalidInput(
            "product id cannot be changed by an update".to_string(),
        ));
    }
    mask.iter().try_for_each(|field| validate_field(item, field))
}
