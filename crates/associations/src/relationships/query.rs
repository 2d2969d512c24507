//! Accessor Outcomes - Query descriptions handed to the SQL layer
//!
//! Accessors never talk to a database. They describe the statement that
//! would satisfy the call and leave execution to the query layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::operators::Op;

/// Statement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOperation {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperation::Select => write!(f, "SELECT"),
            QueryOperation::Count => write!(f, "SELECT COUNT(*)"),
            QueryOperation::Insert => write!(f, "INSERT"),
            QueryOperation::Update => write!(f, "UPDATE"),
            QueryOperation::Delete => write!(f, "DELETE"),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Op,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Op, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Op::Eq, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// Inner join on a single column pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    pub table: String,
    /// Qualified column on the joined table
    pub left: String,
    /// Qualified column on the queried table
    pub right: String,
}

/// A statement description produced by an accessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationQuery {
    pub operation: QueryOperation,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Column values for inserts and updates
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub values: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl AssociationQuery {
    pub fn new(operation: QueryOperation, table: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            join: None,
            conditions: Vec::new(),
            values: Map::new(),
            limit: None,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(QueryOperation::Select, table)
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(QueryOperation::Count, table)
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(QueryOperation::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(QueryOperation::Update, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(QueryOperation::Delete, table)
    }

    pub fn join(mut self, table: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.join = Some(JoinClause {
            table: table.into(),
            left: left.into(),
            right: right.into(),
        });
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }

    pub fn where_op(mut self, column: impl Into<String>, operator: Op, value: Value) -> Self {
        self.conditions.push(Condition::new(column, operator, value));
        self
    }

    pub fn value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    pub fn values(mut self, values: Map<String, Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Condition on `column`, if any
    pub fn condition(&self, column: &str) -> Option<&Condition> {
        self.conditions.iter().find(|condition| condition.column == column)
    }
}

impl fmt::Display for AssociationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.table)?;
        if let Some(join) = &self.join {
            write!(f, " INNER JOIN {} ON {} = {}", join.table, join.left, join.right)?;
        }
        if !self.values.is_empty() {
            let columns: Vec<&str> = self.values.keys().map(String::as_str).collect();
            write!(f, " ({})", columns.join(", "))?;
        }
        if !self.conditions.is_empty() {
            let conditions: Vec<String> = self.conditions.iter().map(ToString::to_string).collect();
            write!(f, " WHERE {}", conditions.join(" AND "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

/// Result of calling a method from a model's method table
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorOutcome {
    Query(AssociationQuery),
    Queries(Vec<AssociationQuery>),
    /// In-memory assignment on the calling instance
    Assigned { attribute: String, value: Value },
    Value(Value),
}

impl AccessorOutcome {
    pub fn query(&self) -> Option<&AssociationQuery> {
        match self {
            AccessorOutcome::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn queries(&self) -> &[AssociationQuery] {
        match self {
            AccessorOutcome::Query(query) => std::slice::from_ref(query),
            AccessorOutcome::Queries(queries) => queries,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_select_with_join() {
        let query = AssociationQuery::select("Tags")
            .join("PostTags", "PostTags.tagId", "Tags.id")
            .where_eq("PostTags.postId", json!(7));

        assert_eq!(
            query.to_string(),
            "SELECT Tags INNER JOIN PostTags ON PostTags.tagId = Tags.id WHERE PostTags.postId = 7"
        );
    }

    #[test]
    fn test_display_update_with_limit() {
        let query = AssociationQuery::update("Posts")
            .value("userId", json!(1))
            .where_op("id", Op::In, json!([3, 4]))
            .limit(2);

        assert_eq!(query.to_string(), "UPDATE Posts (userId) WHERE id IN [3,4] LIMIT 2");
    }

    #[test]
    fn test_outcome_queries() {
        let outcome = AccessorOutcome::Query(AssociationQuery::count("Posts"));
        assert_eq!(outcome.queries().len(), 1);
        assert!(AccessorOutcome::Value(json!(true)).queries().is_empty());
    }
}
