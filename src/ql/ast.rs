//! Parsed statement model.
//!
//! Statements arrive from a compiler outside this crate; everything here is
//! owned data, so `Clone` is the explicit structural copy the join engine
//! relies on when it derives one joiner clone per main row.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed select statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// Data sources, in declaration order. Each entry resolves independently.
    pub from_clause: Vec<TableRef>,
    /// Predicates, in declaration order. A joiner's first predicate must be
    /// a join predicate (`PredicateRhs::Join`).
    pub where_criteria: Vec<Predicate>,
    /// Column specs, possibly template-bearing (`{variable}` references).
    pub columns: Vec<Column>,
    /// Columns selected across a join, in output order.
    pub selected: Vec<SelectedColumn>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Variable name to assign the result body to, if any.
    pub assign: Option<String>,
    /// Dependent sub-statement evaluated once per main row.
    pub joiner: Option<Box<Statement>>,
    /// Source line, for diagnostics only.
    pub line: u32,
}

impl Statement {
    /// The joining column declared by this statement's join predicate.
    pub fn joining_column(&self) -> Option<&str> {
        self.where_criteria.first().and_then(|p| match &p.rhs {
            PredicateRhs::Join {
                joining_column, ..
            } => Some(joining_column.as_str()),
            PredicateRhs::Literal(_) => None,
        })
    }

    /// Overwrite the join predicate's injected value. No-op when the first
    /// predicate is not a join predicate.
    pub fn set_join_value(&mut self, value: Value) {
        if let Some(predicate) = self.where_criteria.first_mut() {
            if let PredicateRhs::Join { value: slot, .. } = &mut predicate.rhs {
                *slot = Some(value);
            }
        }
    }
}

/// A single data-source reference within a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The compiler wraps variable references in braces (`{orders}`); strip
    /// them for context lookup. Literal table names pass through unchanged.
    pub fn variable_name(&self) -> &str {
        let name = self.name.as_str();
        if name.len() >= 2 && name.starts_with('{') && name.ends_with('}') {
            &name[1..name.len() - 1]
        } else {
            name
        }
    }
}

/// A column spec. The name may embed `{variable}` references which the
/// evaluator resolves best-effort before execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    pub name: String,
}

impl Column {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A column selected across a join. Exactly one of `name`/`index` is
/// meaningful; `from` picks which side of the join supplies the value.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedColumn {
    pub name: Option<String>,
    pub index: Option<usize>,
    pub from: JoinSide,
}

impl SelectedColumn {
    pub fn main(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            index: None,
            from: JoinSide::Main,
        }
    }

    pub fn joiner(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            index: None,
            from: JoinSide::Joiner,
        }
    }

    pub fn main_index(index: usize) -> Self {
        Self {
            name: None,
            index: Some(index),
            from: JoinSide::Main,
        }
    }

    pub fn joiner_index(index: usize) -> Self {
        Self {
            name: None,
            index: Some(index),
            from: JoinSide::Joiner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Main,
    Joiner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub lhs: String,
    pub op: PredicateOp,
    pub rhs: PredicateRhs,
}

impl Predicate {
    pub fn eq(lhs: impl Into<String>, value: Value) -> Self {
        Self {
            lhs: lhs.into(),
            op: PredicateOp::Eq,
            rhs: PredicateRhs::Literal(value),
        }
    }

    pub fn in_values(lhs: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            lhs: lhs.into(),
            op: PredicateOp::In,
            rhs: PredicateRhs::Literal(Value::Array(values)),
        }
    }

    /// A join predicate: `joining_column` is read from each parent row and
    /// injected into `value` on the per-row clone.
    pub fn join(lhs: impl Into<String>, joining_column: impl Into<String>) -> Self {
        Self {
            lhs: lhs.into(),
            op: PredicateOp::Eq,
            rhs: PredicateRhs::Join {
                joining_column: joining_column.into(),
                value: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Eq,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateRhs {
    Literal(Value),
    Join {
        joining_column: String,
        /// Filled per clone by the join engine; `None` on the template.
        value: Option<Value>,
    },
}

/// The result of any statement or verb execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub headers: HashMap<String, String>,
    /// Scalar, ordered sequence, or keyed map of rows; `None` when the
    /// statement produced no data.
    pub body: Option<Value>,
}

impl Envelope {
    pub fn json(body: Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            headers,
            body: Some(body),
        }
    }

    pub fn empty() -> Self {
        Self {
            headers: HashMap::new(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variable_name_strips_braces() {
        assert_eq!(TableRef::named("{ordersVar}").variable_name(), "ordersVar");
        assert_eq!(TableRef::named("orders").variable_name(), "orders");
        assert_eq!(TableRef::named("{").variable_name(), "{");
        assert_eq!(TableRef::named("{}").variable_name(), "");
    }

    #[test]
    fn joining_column_reads_first_predicate() {
        let mut joiner = Statement::default();
        joiner.where_criteria.push(Predicate::join("id", "orderId"));
        assert_eq!(joiner.joining_column(), Some("orderId"));

        let mut plain = Statement::default();
        plain.where_criteria.push(Predicate::eq("id", json!(1)));
        assert_eq!(plain.joining_column(), None);
    }

    #[test]
    fn clones_are_isolated() {
        let mut template = Statement::default();
        template.where_criteria.push(Predicate::join("id", "id"));

        let mut cloned = template.clone();
        cloned.set_join_value(json!(42));

        assert_eq!(
            template.where_criteria[0].rhs,
            PredicateRhs::Join {
                joining_column: "id".to_string(),
                value: None,
            }
        );
        assert_eq!(
            cloned.where_criteria[0].rhs,
            PredicateRhs::Join {
                joining_column: "id".to_string(),
                value: Some(json!(42)),
            }
        );
    }
}
