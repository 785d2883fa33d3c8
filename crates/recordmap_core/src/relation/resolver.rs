//! Lazy, per-owner relationship resolution.
//!
//! # Responsibility
//! - Resolve a named relation of one owning record into related records.
//! - Memoize each relation for the resolver's lifetime.
//!
//! # Invariants
//! - One resolver serves exactly one owning record; it is never shared.
//! - Owning-record references are read when a relation is first resolved,
//!   not when it is declared.
//! - Declarations are validated when the resolver is built.

use crate::error::{MapError, MapResult};
use crate::model::record::Record;
use crate::model::relation::{Cardinality, Relationships};
use crate::query::condition::translate;
use crate::repo::registry::ManagerRegistry;
use log::debug;
use std::collections::BTreeMap;

/// Resolved value of one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Record),
    Many(Vec<Record>),
    /// No matching row (for `One`) or no rows at all (for `Many`).
    NotFound,
}

impl Related {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Self::One(record) => Some(record),
            _ => None,
        }
    }

    /// Related records as a slice; a `One` result yields one element.
    pub fn records(&self) -> &[Record] {
        match self {
            Self::One(record) => std::slice::from_ref(record),
            Self::Many(records) => records,
            Self::NotFound => &[],
        }
    }
}

/// Relation cache bound to one owning record.
pub struct RelationshipResolver<'a> {
    declarations: &'a Relationships,
    owner: &'a Record,
    registry: &'a ManagerRegistry,
    resolved: BTreeMap<String, Related>,
}

impl<'a> RelationshipResolver<'a> {
    /// Builds a resolver for `owner`.
    ///
    /// # Errors
    /// - `MalformedDeclaration` when any declaration is invalid.
    pub fn new(
        declarations: &'a Relationships,
        owner: &'a Record,
        registry: &'a ManagerRegistry,
    ) -> MapResult<Self> {
        declarations.validate()?;
        Ok(Self {
            declarations,
            owner,
            registry,
            resolved: BTreeMap::new(),
        })
    }

    pub fn owner(&self) -> &Record {
        self.owner
    }

    /// Returns the relation `name`, fetching it on first access.
    ///
    /// # Errors
    /// - `UnknownRelation` when `name` is not declared.
    /// - `Registry` when the declared target manager is not registered.
    /// - `Storage` when the fetch fails; nothing is cached in that case.
    pub fn get(&mut self, name: &str) -> MapResult<&Related> {
        if !self.resolved.contains_key(name) {
            let related = self.load(name)?;
            self.resolved.insert(name.to_string(), related);
        }
        self.resolved
            .get(name)
            .ok_or_else(|| MapError::UnknownRelation(name.to_string()))
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    /// Drops the cached value of `name`; the next `get` fetches again.
    pub fn forget(&mut self, name: &str) -> bool {
        self.resolved.remove(name).is_some()
    }

    fn load(&self, name: &str) -> MapResult<Related> {
        let declaration = self
            .declarations
            .get(name)
            .ok_or_else(|| MapError::UnknownRelation(name.to_string()))?;
        let target = self.registry.resolve(&declaration.target)?;

        let translated = translate(&declaration.condition, target.query_builder())?;
        let params = translated.bind(Some(self.owner))?;

        let related = match declaration.cardinality {
            Cardinality::One => target
                .fetch_record(translated.query(), &params)?
                .map_or(Related::NotFound, Related::One),
            Cardinality::Many => {
                let records = target.fetch_all_records(translated.query(), &params)?;
                if records.is_empty() {
                    Related::NotFound
                } else {
                    Related::Many(records)
                }
            }
        };

        debug!(
            "event=relation_resolve module=relation status=ok relation={name} target={} params={} found={}",
            declaration.target,
            params.len(),
            related.records().len()
        );
        Ok(related)
    }
}
