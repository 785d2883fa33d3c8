//! Minimal `SELECT` builder handed out by storage backends.
//!
//! # Responsibility
//! - Accumulate `WHERE` fragments with AND/OR composition.
//! - Render a final SQL string for `Storage::fetch_one`/`fetch_all`.
//!
//! # Invariants
//! - The builder never inspects or rewrites fragments; placeholder handling
//!   belongs to the condition translator.
//! - Rows are always selected as `t.*` from the table aliased `t`.

use std::fmt::{Display, Formatter};

/// Alias every builder gives the queried table.
pub const TABLE_ALIAS: &str = "t";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Leaf(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    fn and(self, fragment: String) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(Self::Leaf(fragment));
                Self::And(parts)
            }
            other => Self::And(vec![other, Self::Leaf(fragment)]),
        }
    }

    fn or(self, fragment: String) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(Self::Leaf(fragment));
                Self::Or(parts)
            }
            other => Self::Or(vec![other, Self::Leaf(fragment)]),
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (parts, separator) = match self {
            Self::Leaf(fragment) => return write!(f, "{fragment}"),
            Self::And(parts) => (parts, " AND "),
            Self::Or(parts) => (parts, " OR "),
        };
        for (position, part) in parts.iter().enumerate() {
            if position > 0 {
                f.write_str(separator)?;
            }
            write!(f, "({part})")?;
        }
        Ok(())
    }
}

/// Incremental `SELECT t.* FROM <table> t` builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectBuilder {
    table: String,
    predicate: Option<Predicate>,
    limit: Option<u32>,
}

impl SelectBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicate: None,
            limit: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Conjoins `fragment` with everything added so far.
    pub fn and_where(&mut self, fragment: impl Into<String>) -> &mut Self {
        let fragment = fragment.into();
        self.predicate = Some(match self.predicate.take() {
            None => Predicate::Leaf(fragment),
            Some(current) => current.and(fragment),
        });
        self
    }

    /// Disjoins `fragment` with everything added so far.
    pub fn or_where(&mut self, fragment: impl Into<String>) -> &mut Self {
        let fragment = fragment.into();
        self.predicate = Some(match self.predicate.take() {
            None => Predicate::Leaf(fragment),
            Some(current) => current.or(fragment),
        });
        self
    }

    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Rendered `WHERE` body, if any fragment was added.
    pub fn where_sql(&self) -> Option<String> {
        self.predicate.as_ref().map(ToString::to_string)
    }

    pub fn build(&self) -> SelectQuery {
        let mut sql = format!(
            "SELECT {TABLE_ALIAS}.* FROM {} {TABLE_ALIAS}",
            quote_ident(&self.table)
        );
        if let Some(predicate) = &self.predicate {
            sql.push_str(&format!(" WHERE {predicate}"));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        SelectQuery { sql }
    }
}

/// Final query text ready for execution with positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    sql: String,
}

impl SelectQuery {
    /// Wraps caller-written SQL.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl Display for SelectQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Double-quotes an identifier for SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
