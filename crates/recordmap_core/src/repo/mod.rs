//! Record managers and the registry that hands them out.
//!
//! # Responsibility
//! - Orchestrate create/read/update/delete/fetch for one entity type.
//! - Map logical manager names to manager instances for cross-entity lookups.
//!
//! # Invariants
//! - Managers are stateless between calls and safe to share across threads.
//! - Manager APIs return "not found"/"nothing to write" as values, and
//!   storage failures as `MapError::Storage`.

pub mod manager;
pub mod registry;
