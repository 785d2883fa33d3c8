//! Declarative condition translation.

pub mod condition;
