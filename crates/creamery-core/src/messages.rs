//! Caller-facing outcome messages.
//!
//! The HTTP layer pairs these with its own status codes; the engine only
//! guarantees that storage failures map to [`GENERIC_ERROR`].

pub const CREATE_SUCCESS: &str = "Successfully created";
pub const READ_SUCCESS: &str = "Successfully fetched";
pub const UPDATE_SUCCESS: &str = "Successfully updated";
pub const SOFT_DELETE_SUCCESS: &str = "Successfully soft deleted";
pub const PERMANENT_DELETE_SUCCESS: &str = "Successfully permanently deleted";
pub const BULK_LOAD_SUCCESS: &str = "Successfully loaded";
pub const SWEEP_SUCCESS: &str = "Successfully swept";

pub const NO_RECORDS_FOUND: &str = "No records found";
pub const REQUEST_INVALID: &str = "Request invalid";
pub const GENERIC_ERROR: &str = "Something went wrong";
