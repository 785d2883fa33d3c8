//! Relationship resolution over registered managers.
//!
//! # Responsibility
//! - Materialize declared relations of one owning record on demand.
//!
//! # Invariants
//! - Resolved relations are cached per resolver only, never globally.

pub mod resolver;
