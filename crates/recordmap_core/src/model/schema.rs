//! Field schema for one record type.
//!
//! # Responsibility
//! - Hold the ordered list of persisted field names for a table.
//! - Validate declaration-level schema invariants once, at manager build time.
//!
//! # Invariants
//! - Field names are identifier-shaped and unique.
//! - The primary key is one of the declared fields.
//! - A schema is immutable after construction and shared via `Arc`.

use crate::error::{MapError, MapResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Storage type hint for one field.
///
/// Hints are informational only; values are not checked against them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldType {
    #[default]
    Any,
    Integer,
    Real,
    Text,
    Blob,
}

/// Declared field in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl From<&str> for FieldDescriptor {
    fn from(value: &str) -> Self {
        Self::new(value, FieldType::Any)
    }
}

/// Ordered, validated field list for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    table: String,
    primary_key: String,
    fields: Vec<FieldDescriptor>,
    index: BTreeMap<String, usize>,
}

impl FieldSchema {
    /// Builds a schema for `table`.
    ///
    /// # Errors
    /// - `MalformedDeclaration` when the table or a field name is not an
    ///   identifier, a field is declared twice, no field is declared, or
    ///   `primary_key` is not a declared field.
    pub fn new<I, F>(table: &str, primary_key: &str, fields: I) -> MapResult<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldDescriptor>,
    {
        if !is_identifier(table) {
            return Err(MapError::MalformedDeclaration(format!(
                "table name `{table}` is not a valid identifier"
            )));
        }

        let mut descriptors = Vec::new();
        let mut index = BTreeMap::new();
        for field in fields {
            let descriptor = field.into();
            if !is_identifier(&descriptor.name) {
                return Err(MapError::MalformedDeclaration(format!(
                    "field name `{}` on `{table}` is not a valid identifier",
                    descriptor.name
                )));
            }
            if index.contains_key(&descriptor.name) {
                return Err(MapError::MalformedDeclaration(format!(
                    "field `{}` declared twice on `{table}`",
                    descriptor.name
                )));
            }
            index.insert(descriptor.name.clone(), descriptors.len());
            descriptors.push(descriptor);
        }

        if descriptors.is_empty() {
            return Err(MapError::MalformedDeclaration(format!(
                "schema for `{table}` declares no fields"
            )));
        }
        if !index.contains_key(primary_key) {
            return Err(MapError::MalformedDeclaration(format!(
                "primary key `{primary_key}` is not a field of `{table}`"
            )));
        }

        Ok(Self {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            fields: descriptors,
            index,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|position| &self.fields[*position])
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub(crate) fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}
