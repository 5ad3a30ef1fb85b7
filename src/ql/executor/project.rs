//! Column projection for materialized values.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::VariableContext;
use crate::error::QlResult;
use crate::ql::ast::Statement;

#[async_trait]
pub trait Projector: Send + Sync {
    async fn project(
        &self,
        prefix: &str,
        statement: &Statement,
        value: Value,
        context: &VariableContext,
    ) -> QlResult<Value>;
}

#[derive(Debug, Default)]
pub struct DefaultProjector;

#[async_trait]
impl Projector for DefaultProjector {
    async fn project(
        &self,
        prefix: &str,
        statement: &Statement,
        value: Value,
        _context: &VariableContext,
    ) -> QlResult<Value> {
        // `select *` (or no columns at all) is a passthrough.
        if statement.columns.is_empty() || statement.columns.iter().any(|c| c.name == "*") {
            return Ok(value);
        }
        Ok(match value {
            Value::Array(rows) => Value::Array(
                rows.into_iter()
                    .map(|row| project_row(prefix, statement, row))
                    .collect(),
            ),
            other => project_row(prefix, statement, other),
        })
    }
}

fn project_row(prefix: &str, statement: &Statement, row: Value) -> Value {
    let Value::Object(fields) = row else {
        // Non-composite rows have no columns to pick from.
        return row;
    };
    let mut projected = Map::new();
    for column in &statement.columns {
        let name = column.name.strip_prefix(prefix).unwrap_or(&column.name);
        if let Some(value) = fields.get(name) {
            projected.insert(name.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}
