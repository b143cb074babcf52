//! Centralized default constants for the creamery catalog.
//!
//! Storage column limits and pool defaults live here so the validation
//! layer and the pool builder agree on the same numbers.

// =============================================================================
// PAYLOAD LIMITS
// =============================================================================

/// Maximum length of a product business key.
pub const MAX_PRODUCT_ID_LEN: usize = 64;

/// Maximum length of a lookup name (sourcing value, ingredient, certification).
pub const MAX_LOOKUP_NAME_LEN: usize = 255;

/// Maximum length of the product name.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of long-form text fields (description, story, allergy info).
pub const MAX_TEXT_LEN: usize = 65_535;

/// Maximum number of items accepted by one bulk load call.
pub const MAX_BULK_ITEMS: usize = 10_000;

// =============================================================================
// CONNECTION POOL
// =============================================================================

/// Default maximum number of connections in the pool.
pub const POOL_MAX_CONNECTIONS: u32 = 8;

/// Default minimum number of connections kept open.
pub const POOL_MIN_CONNECTIONS: u32 = 1;

/// Default acquire timeout in seconds.
pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default maximum connection lifetime in seconds.
pub const POOL_MAX_LIFETIME_SECS: u64 = 1800;

/// Default SQLite busy timeout in milliseconds.
///
/// Concurrent writers wait this long for the write lock before the
/// statement fails with SQLITE_BUSY.
pub const SQLITE_BUSY_TIMEOUT_MS: u64 = 5000;
