//! Row filtering for already-materialized values.
//!
//! When a from-clause entry names a context variable, no verb is invoked;
//! the statement's predicates are applied directly to the in-memory value.
//! Synchronous and pure.

use serde_json::Value;

use crate::context::VariableContext;
use crate::ql::ast::{PredicateOp, PredicateRhs, Statement, TableRef};

pub trait RowFilter: Send + Sync {
    fn filter(
        &self,
        value: &Value,
        statement: &Statement,
        context: &VariableContext,
        from: &TableRef,
    ) -> Value;
}

#[derive(Debug, Default)]
pub struct DefaultRowFilter;

impl RowFilter for DefaultRowFilter {
    fn filter(
        &self,
        value: &Value,
        statement: &Statement,
        _context: &VariableContext,
        from: &TableRef,
    ) -> Value {
        // Scalars and single objects pass through untouched.
        let Value::Array(rows) = value else {
            return value.clone();
        };

        let mut kept: Vec<Value> = rows
            .iter()
            .filter(|row| matches(row, statement, from))
            .cloned()
            .collect();

        let offset = statement.offset.unwrap_or(0) as usize;
        if offset > 0 {
            kept = kept.into_iter().skip(offset).collect();
        }
        if let Some(limit) = statement.limit {
            kept.truncate(limit as usize);
        }
        Value::Array(kept)
    }
}

fn matches(row: &Value, statement: &Statement, from: &TableRef) -> bool {
    for predicate in &statement.where_criteria {
        let target = match &predicate.rhs {
            PredicateRhs::Literal(value) => value,
            PredicateRhs::Join {
                value: Some(value), ..
            } => value,
            // An uninstantiated join predicate constrains nothing.
            PredicateRhs::Join { value: None, .. } => continue,
        };
        let field = strip_alias(&predicate.lhs, from);
        let actual = match row.get(field) {
            Some(actual) => actual,
            None => return false,
        };
        let ok = match predicate.op {
            PredicateOp::Eq => actual == target,
            PredicateOp::In => target
                .as_array()
                .map(|choices| choices.contains(actual))
                .unwrap_or(false),
        };
        if !ok {
            return false;
        }
    }
    true
}

fn strip_alias<'a>(lhs: &'a str, from: &TableRef) -> &'a str {
    if let Some(alias) = &from.alias {
        if let Some(rest) = lhs.strip_prefix(alias.as_str()) {
            if let Some(rest) = rest.strip_prefix('.') {
                return rest;
            }
        }
    }
    lhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ql::ast::Predicate;
    use serde_json::json;

    fn users() -> Value {
        json!([
            {"id": 1, "age": 30},
            {"id": 2, "age": 25},
            {"id": 3, "age": 30},
        ])
    }

    #[test]
    fn applies_equality_predicates() {
        let mut statement = Statement::default();
        statement.where_criteria.push(Predicate::eq("age", json!(30)));

        let out = DefaultRowFilter.filter(
            &users(),
            &statement,
            &VariableContext::new(),
            &TableRef::named("{users}"),
        );
        assert_eq!(out, json!([{"id": 1, "age": 30}, {"id": 3, "age": 30}]));
    }

    #[test]
    fn strips_the_entry_alias() {
        let mut statement = Statement::default();
        statement.where_criteria.push(Predicate::eq("u.id", json!(2)));

        let out = DefaultRowFilter.filter(
            &users(),
            &statement,
            &VariableContext::new(),
            &TableRef::aliased("{users}", "u"),
        );
        assert_eq!(out, json!([{"id": 2, "age": 25}]));
    }

    #[test]
    fn applies_offset_then_limit() {
        let mut statement = Statement::default();
        statement.offset = Some(1);
        statement.limit = Some(1);

        let out = DefaultRowFilter.filter(
            &users(),
            &statement,
            &VariableContext::new(),
            &TableRef::named("{users}"),
        );
        assert_eq!(out, json!([{"id": 2, "age": 25}]));
    }

    #[test]
    fn scalars_pass_through() {
        let out = DefaultRowFilter.filter(
            &json!(42),
            &Statement::default(),
            &VariableContext::new(),
            &TableRef::named("{n}"),
        );
        assert_eq!(out, json!(42));
    }
}
