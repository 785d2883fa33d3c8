//! Relationship declarations and condition trees.
//!
//! # Responsibility
//! - Describe, per record type, how to find related records of another type.
//! - Accept the same declarations from Rust builders or from JSON/serde
//!   (`manager`/`relation`/`conditions.where`/`condition`/`value`/`type`).
//!
//! # Invariants
//! - A clause carries at most one `?` placeholder.
//! - A clause with a placeholder always carries a bound value.
//! - Declarations are validated before first use, never at fetch time.

use crate::error::{MapError, MapResult};
use crate::model::value::Value;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Prefix marking a deferred owning-record field reference in serialized
/// declarations, e.g. `entity.id`.
pub const OWNER_FIELD_PREFIX: &str = "entity.";

/// How many related records a relation yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "one", alias = "HasOne", alias = "has_one")]
    One,
    #[serde(rename = "many", alias = "HasMany", alias = "has_many")]
    Many,
}

/// How a clause combines with the predicate accumulated before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Join {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

/// Parameter bound to a clause.
///
/// In serialized form any text starting with `entity.` reads as an
/// owning-record reference, so such a literal cannot be declared in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum BoundValue {
    Literal(Value),
    /// Resolved against the owning record when the query is bound.
    OwnerField(String),
}

impl BoundValue {
    pub fn owner_field(name: impl Into<String>) -> Self {
        Self::OwnerField(name.into())
    }
}

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Text(text) if text.starts_with(OWNER_FIELD_PREFIX) => {
                Self::OwnerField(text[OWNER_FIELD_PREFIX.len()..].to_string())
            }
            other => Self::Literal(other),
        }
    }
}

impl From<BoundValue> for Value {
    fn from(value: BoundValue) -> Self {
        match value {
            BoundValue::Literal(value) => value,
            BoundValue::OwnerField(name) => Value::Text(format!("{OWNER_FIELD_PREFIX}{name}")),
        }
    }
}

/// One predicate fragment, e.g. `t.user_id` or `t.score > ?`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(alias = "condition", default)]
    pub expression: String,
    #[serde(
        alias = "value",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bound_value: Option<BoundValue>,
    #[serde(alias = "type", default)]
    pub join: Join,
}

impl Clause {
    /// Clause without a parameter, e.g. `t.deleted_at IS NULL`.
    pub fn expr(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            bound_value: None,
            join: Join::And,
        }
    }

    /// Clause compared against a literal.
    pub fn value(expression: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::bound(expression, BoundValue::Literal(value.into()))
    }

    /// Clause compared against a field of the owning record.
    pub fn owner_field(expression: impl Into<String>, field: impl Into<String>) -> Self {
        Self::bound(expression, BoundValue::OwnerField(field.into()))
    }

    pub fn bound(expression: impl Into<String>, bound_value: BoundValue) -> Self {
        Self {
            expression: expression.into(),
            bound_value: Some(bound_value),
            join: Join::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.join = Join::Or;
        self
    }

    pub fn has_placeholder(&self) -> bool {
        self.expression.contains('?')
    }

    fn validate(&self, path: &str) -> MapResult<()> {
        if self.expression.trim().is_empty() {
            return Err(MapError::MalformedDeclaration(format!(
                "{path}: clause is missing its expression"
            )));
        }
        let placeholders = self.expression.matches('?').count();
        if placeholders > 1 {
            return Err(MapError::MalformedDeclaration(format!(
                "{path}: expression `{}` has {placeholders} placeholders; at most one is allowed",
                self.expression
            )));
        }
        if placeholders == 1 && self.bound_value.is_none() {
            return Err(MapError::MalformedDeclaration(format!(
                "{path}: expression `{}` has a placeholder but no bound value",
                self.expression
            )));
        }
        if let Some(BoundValue::OwnerField(field)) = &self.bound_value {
            if field.trim().is_empty() {
                return Err(MapError::MalformedDeclaration(format!(
                    "{path}: owning-record reference names no field"
                )));
            }
        }
        Ok(())
    }
}

/// Node of a condition tree: a clause or an ordered group of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Clause(Clause),
    Group(Vec<ConditionNode>),
}

impl ConditionNode {
    pub fn all(nodes: impl IntoIterator<Item = impl Into<ConditionNode>>) -> Self {
        Self::Group(nodes.into_iter().map(Into::into).collect())
    }

    /// Checks every clause of the tree.
    ///
    /// # Errors
    /// - `MalformedDeclaration` for a blank expression, an empty group, more
    ///   than one placeholder, or a placeholder with no bound value.
    pub fn validate(&self) -> MapResult<()> {
        self.validate_at("where")
    }

    fn validate_at(&self, path: &str) -> MapResult<()> {
        match self {
            Self::Clause(clause) => clause.validate(path),
            Self::Group(nodes) => {
                if nodes.is_empty() {
                    return Err(MapError::MalformedDeclaration(format!(
                        "{path}: condition group is empty"
                    )));
                }
                for (position, node) in nodes.iter().enumerate() {
                    node.validate_at(&format!("{path}[{position}]"))?;
                }
                Ok(())
            }
        }
    }

    /// Clauses in depth-first declaration order.
    pub fn clauses(&self) -> Vec<&Clause> {
        let mut out = Vec::new();
        self.collect_clauses(&mut out);
        out
    }

    fn collect_clauses<'a>(&'a self, out: &mut Vec<&'a Clause>) {
        match self {
            Self::Clause(clause) => out.push(clause),
            Self::Group(nodes) => {
                for node in nodes {
                    node.collect_clauses(out);
                }
            }
        }
    }
}

impl From<Clause> for ConditionNode {
    fn from(value: Clause) -> Self {
        Self::Clause(value)
    }
}

/// Static description of one named relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDeclaration {
    /// Logical manager name resolved through the registry.
    #[serde(alias = "manager")]
    pub target: String,
    #[serde(alias = "relation")]
    pub cardinality: Cardinality,
    #[serde(
        rename = "conditions",
        deserialize_with = "where_block",
        serialize_with = "to_where_block"
    )]
    pub condition: ConditionNode,
}

impl RelationshipDeclaration {
    pub fn one(target: impl Into<String>, condition: impl Into<ConditionNode>) -> Self {
        Self {
            target: target.into(),
            cardinality: Cardinality::One,
            condition: condition.into(),
        }
    }

    pub fn many(target: impl Into<String>, condition: impl Into<ConditionNode>) -> Self {
        Self {
            target: target.into(),
            cardinality: Cardinality::Many,
            condition: condition.into(),
        }
    }

    fn validate(&self, name: &str) -> MapResult<()> {
        if self.target.trim().is_empty() {
            return Err(MapError::MalformedDeclaration(format!(
                "relation `{name}` names no target manager"
            )));
        }
        self.condition
            .validate_at(&format!("relation `{name}` where"))
    }
}

#[derive(Deserialize, Serialize)]
struct WhereBlock<T> {
    #[serde(rename = "where")]
    filter: T,
}

fn where_block<'de, D>(deserializer: D) -> Result<ConditionNode, D::Error>
where
    D: Deserializer<'de>,
{
    WhereBlock::<ConditionNode>::deserialize(deserializer).map(|block| block.filter)
}

fn to_where_block<S>(condition: &ConditionNode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    WhereBlock { filter: condition }.serialize(serializer)
}

/// Relation name to declaration map for one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relationships {
    entries: BTreeMap<String, RelationshipDeclaration>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, declaration: RelationshipDeclaration) -> Self {
        self.entries.insert(name.into(), declaration);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RelationshipDeclaration> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates every declaration.
    pub fn validate(&self) -> MapResult<()> {
        for (name, declaration) in &self.entries {
            declaration.validate(name)?;
        }
        Ok(())
    }
}
