//! # creamery-core
//!
//! Core types, traits, and abstractions for the creamery product catalog.
//!
//! This crate provides the data model, field masks, validation and error
//! taxonomy that the storage crate and its callers share.

pub mod defaults;
pub mod error;
pub mod field_mask;
pub mod logging;
pub mod messages;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use field_mask::{FieldMask, ItemField};
pub use models::*;
pub use traits::*;
pub use validation::{validate_for_create, validate_for_update, validate_product_id};
