//! Condition tree to query translation.
//!
//! # Responsibility
//! - Turn a declarative `ConditionNode` into `WHERE` fragments on a storage
//!   query builder plus an ordered parameter list.
//! - Bind deferred owning-record references to concrete values on demand.
//!
//! # Invariants
//! - Parameters follow depth-first declaration order of the clauses.
//! - A clause with a bound value and no `?` is compared with `= ?`.
//! - A clause without a bound value is emitted verbatim and adds no parameter.
//! - A nested group renders as one parenthesized sub-predicate, joined to
//!   its siblings by the join of its first clause.

use crate::error::{MapError, MapResult};
use crate::model::record::Record;
use crate::model::relation::{BoundValue, Clause, ConditionNode, Join};
use crate::model::value::Value;
use crate::storage::query::{SelectBuilder, SelectQuery};

/// Query produced from a condition tree, with unbound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    query: SelectQuery,
    where_sql: Option<String>,
    params: Vec<BoundValue>,
}

impl TranslatedQuery {
    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    /// Rendered predicate, e.g. `t.user_id = ?`.
    pub fn where_sql(&self) -> Option<&str> {
        self.where_sql.as_deref()
    }

    pub fn params(&self) -> &[BoundValue] {
        &self.params
    }

    /// Resolves parameters, reading owning-record references from `owner`.
    ///
    /// References are read when this is called, so one translation can be
    /// bound against different owners.
    ///
    /// # Errors
    /// - `InvalidArgument` when a parameter references the owning record and
    ///   no owner is given.
    pub fn bind(&self, owner: Option<&Record>) -> MapResult<Vec<Value>> {
        self.params
            .iter()
            .map(|param| match (param, owner) {
                (BoundValue::Literal(value), _) => Ok(value.clone()),
                (BoundValue::OwnerField(field), Some(owner)) => Ok(owner.get(field).clone()),
                (BoundValue::OwnerField(field), None) => Err(MapError::InvalidArgument(format!(
                    "condition references owning-record field `{field}` but no owning record was given"
                ))),
            })
            .collect()
    }
}

/// Applies `tree` to `builder` and returns the finished query.
///
/// # Errors
/// - `MalformedDeclaration` when the tree fails `ConditionNode::validate`.
pub fn translate(tree: &ConditionNode, mut builder: SelectBuilder) -> MapResult<TranslatedQuery> {
    tree.validate()?;

    let mut params = Vec::new();
    match tree {
        ConditionNode::Clause(clause) => apply_clause(clause, &mut builder, &mut params),
        ConditionNode::Group(nodes) => apply_nodes(nodes, &mut builder, &mut params),
    }

    Ok(TranslatedQuery {
        query: builder.build(),
        where_sql: builder.where_sql(),
        params,
    })
}

fn apply_nodes(
    nodes: &[ConditionNode],
    builder: &mut SelectBuilder,
    params: &mut Vec<BoundValue>,
) {
    for node in nodes {
        match node {
            ConditionNode::Clause(clause) => apply_clause(clause, builder, params),
            ConditionNode::Group(children) => {
                let mut nested = SelectBuilder::new(builder.table());
                apply_nodes(children, &mut nested, params);
                if let Some(fragment) = nested.where_sql() {
                    push_fragment(builder, leading_join(node), fragment);
                }
            }
        }
    }
}

fn apply_clause(clause: &Clause, builder: &mut SelectBuilder, params: &mut Vec<BoundValue>) {
    push_fragment(builder, clause.join, clause_fragment(clause));
    if let Some(bound) = &clause.bound_value {
        params.push(bound.clone());
    }
}

fn push_fragment(builder: &mut SelectBuilder, join: Join, fragment: String) {
    match join {
        Join::And => builder.and_where(fragment),
        Join::Or => builder.or_where(fragment),
    };
}

// A nested group attaches with the join of its first clause.
fn leading_join(node: &ConditionNode) -> Join {
    node.clauses().first().map_or(Join::And, |clause| clause.join)
}

fn clause_fragment(clause: &Clause) -> String {
    let expression = clause.expression.trim();
    if clause.bound_value.is_some() && !clause.has_placeholder() {
        format!("{expression} = ?")
    } else {
        expression.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::translate;
    use crate::error::MapError;
    use crate::model::relation::{BoundValue, Clause, ConditionNode};
    use crate::model::value::Value;
    use crate::storage::query::SelectBuilder;

    #[test]
    fn appends_equality_for_bare_column() {
        let tree = ConditionNode::from(Clause::owner_field("t.user_id", "id"));
        let translated = translate(&tree, SelectBuilder::new("posts")).unwrap();

        assert_eq!(translated.where_sql(), Some("t.user_id = ?"));
        assert_eq!(
            translated.query().as_str(),
            "SELECT t.* FROM \"posts\" t WHERE t.user_id = ?"
        );
        assert_eq!(
            translated.params(),
            &[BoundValue::OwnerField("id".to_string())]
        );
    }

    #[test]
    fn keeps_explicit_placeholders_and_pure_expressions() {
        let tree = ConditionNode::all([
            Clause::value("t.score > ?", 10),
            Clause::expr("t.deleted_at IS NULL"),
            Clause::value("t.kind", "a").or(),
        ]);
        let translated = translate(&tree, SelectBuilder::new("posts")).unwrap();

        assert_eq!(
            translated.where_sql(),
            Some("((t.score > ?) AND (t.deleted_at IS NULL)) OR (t.kind = ?)")
        );
        assert_eq!(
            translated.bind(None).unwrap(),
            vec![Value::Integer(10), Value::from("a")]
        );
    }

    #[test]
    fn parameters_follow_depth_first_order() {
        let tree = ConditionNode::all([
            ConditionNode::from(Clause::value("t.a", 1)),
            ConditionNode::all([Clause::value("t.b", 2), Clause::value("t.c", 3)]),
            ConditionNode::from(Clause::value("t.d", 4)),
        ]);
        let translated = translate(&tree, SelectBuilder::new("x")).unwrap();
        assert_eq!(
            translated.bind(None).unwrap(),
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4)
            ]
        );
    }

    #[test]
    fn nested_group_stays_a_sub_predicate() {
        let tree = ConditionNode::all([
            ConditionNode::from(Clause::value("t.a", 1)),
            ConditionNode::all([Clause::value("t.b", 2), Clause::value("t.c", 3).or()]),
        ]);
        let translated = translate(&tree, SelectBuilder::new("x")).unwrap();

        assert_eq!(
            translated.where_sql(),
            Some("(t.a = ?) AND ((t.b = ?) OR (t.c = ?))")
        );
        assert_eq!(
            translated.bind(None).unwrap(),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn nested_group_can_attach_with_or() {
        let tree = ConditionNode::all([
            ConditionNode::from(Clause::expr("t.archived = 0")),
            ConditionNode::all([
                Clause::value("t.owner", "a").or(),
                Clause::value("t.shared", 1),
            ]),
        ]);
        let translated = translate(&tree, SelectBuilder::new("x")).unwrap();

        assert_eq!(
            translated.where_sql(),
            Some("(t.archived = 0) OR ((t.owner = ?) AND (t.shared = ?))")
        );
    }

    #[test]
    fn owner_reference_without_owner_is_invalid_argument() {
        let tree = ConditionNode::from(Clause::owner_field("t.user_id", "id"));
        let translated = translate(&tree, SelectBuilder::new("posts")).unwrap();
        assert!(matches!(
            translated.bind(None),
            Err(MapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn malformed_tree_is_rejected_before_building() {
        let tree = ConditionNode::from(Clause::expr("   "));
        let err = translate(&tree, SelectBuilder::new("posts")).unwrap_err();
        assert!(matches!(err, MapError::MalformedDeclaration(_)));
    }
}
