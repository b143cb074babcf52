//! Storage-level tests for the catalog orchestrator.
