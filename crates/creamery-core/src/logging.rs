//! Structured logging schema and field name constants for creamery.
//!
//! Every crate logs with these field names so log aggregation can query
//! the catalog engine the same way across components.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Rollback failed, panic caught at the operation boundary |
//! | WARN  | Transaction rolled back, best-effort sweep failed |
//! | INFO  | Lifecycle events (pool, schema), operation completions |
//! | DEBUG | Decision points: diff sizes, field masks, resolved lookups |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "loader"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "lookup", "relations", "items", "catalog", "reclaim", "read", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "soft_delete", "permanent_delete", "sweep"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Business key of the product being operated on.
pub const PRODUCT_ID: &str = "product_id";

/// Surrogate row id of the product.
pub const ROW_ID: &str = "row_id";

/// Lookup or relation kind ("sourcing_value", "ingredient", "dietary_certification").
pub const LOOKUP_KIND: &str = "kind";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Edges inserted by a relation diff.
pub const EDGES_ADDED: &str = "edges_added";

/// Edges deleted by a relation diff.
pub const EDGES_REMOVED: &str = "edges_removed";

/// Lookup rows removed by a sweep.
pub const ROWS_RECLAIMED: &str = "rows_reclaimed";

/// Number of items in a bulk load.
pub const ITEM_COUNT: &str = "item_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of open connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Transaction phase at the time of the event.
pub const TX_PHASE: &str = "tx_phase";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
