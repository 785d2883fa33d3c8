//! Record value model and static per-type declarations.
//!
//! # Responsibility
//! - Define scalar values, field schemas and the layered value store.
//! - Define relationship declarations and condition trees.
//!
//! # Invariants
//! - Schemas and relationship declarations are immutable once built.
//! - Per-record mutable state lives only in `ValueStore`.

pub mod record;
pub mod relation;
pub mod schema;
pub mod store;
pub mod value;
