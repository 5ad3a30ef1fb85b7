//! Join-merge engine.
//!
//! Extends a main result by substituting a correlated sub-statement per row:
//! one clone of the joiner statement per main row, bounded-parallel fan-out,
//! then a row-shape-agnostic merge back into the envelope in main-row order.

use std::collections::HashMap;

use futures::future::join_all;
use serde_json::{Map, Value};

use super::Engine;
use crate::context::VariableContext;
use crate::error::{QlError, QlResult};
use crate::ql::ast::{Envelope, JoinSide, SelectedColumn, Statement};
use crate::resource::TempResources;

impl Engine {
    /// Fan the joiner out per main row, capped by `max_nested_requests`
    /// (rows past the cap are shed, never queued), and merge joined rows
    /// back into `results`. Returns the per-clone failures: the merge runs
    /// to completion even when some clones failed, so callers get both the
    /// errors and the best-effort body.
    pub(crate) async fn exec_join(
        &self,
        statement: &Statement,
        results: &mut Envelope,
        context: &VariableContext,
        temp: &TempResources,
    ) -> QlResult<Vec<QlError>> {
        let joiner = match &statement.joiner {
            Some(joiner) => joiner.as_ref(),
            None => return Ok(Vec::new()),
        };
        let joining_column = joiner
            .joining_column()
            .ok_or(QlError::MissingJoinPredicate)?
            .to_string();

        let rows = match results.body.take() {
            Some(Value::Array(rows)) => rows,
            // No row sequence to join against; leave the body untouched.
            other => {
                results.body = other;
                return Ok(Vec::new());
            }
        };

        let max = self.config.max_nested_requests;
        let mut scheduled = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if scheduled.len() >= max {
                tracing::warn!(
                    max_nested_requests = max,
                    dropped = rows.len() - index,
                    "Pruning nested join requests beyond the configured limit"
                );
                break;
            }
            let mut cloned = joiner.clone();
            let join_value = match row {
                Value::Array(_) | Value::Object(_) => row
                    .get(joining_column.as_str())
                    .cloned()
                    .unwrap_or(Value::Null),
                scalar => scalar.clone(),
            };
            cloned.set_join_value(join_value);
            scheduled.push((index, cloned));
        }

        // All scheduled clones run concurrently and settle before the merge.
        // Completion order is unconstrained, so outcomes stay keyed by the
        // originating row index.
        let settled = join_all(scheduled.into_iter().map(|(index, cloned)| async move {
            let outcome = self.exec_single(&cloned, context, temp).await;
            (index, outcome)
        }))
        .await;

        let mut outcomes: HashMap<usize, Value> = HashMap::new();
        let mut errors = Vec::new();
        for (index, outcome) in settled {
            match outcome {
                Ok(envelope) => {
                    if let Some(body) = envelope.body {
                        outcomes.insert(index, body);
                    }
                }
                Err(err) => errors.push(err),
            }
        }

        // Inner-join semantics: rows without joined data are dropped, never
        // padded; surviving rows keep their original order.
        let keyed = statement
            .selected
            .first()
            .map(|column| column.name.is_some())
            .unwrap_or(false);
        let mut merged = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let Some(other) = outcomes.get(&index) else {
                continue;
            };
            if !joined_has_rows(other) {
                continue;
            }
            merged.push(merge_row(row, other, &statement.selected, keyed));
        }
        results.body = Some(Value::Array(merged));
        Ok(errors)
    }
}

fn joined_has_rows(other: &Value) -> bool {
    match other {
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => false,
    }
}

fn merge_row(row: &Value, other: &Value, selected: &[SelectedColumn], keyed: bool) -> Value {
    // A non-composite main row projects as a single-element sequence.
    let wrapped;
    let row = match row {
        Value::Array(_) | Value::Object(_) => row,
        scalar => {
            wrapped = Value::Array(vec![scalar.clone()]);
            &wrapped
        }
    };
    let first = match other {
        Value::Array(items) => items.first(),
        // A keyed map of joined rows merges as a single row.
        other => Some(other),
    };

    let mut object = Map::new();
    let mut sequence = Vec::new();
    for column in selected {
        let value = match column.from {
            JoinSide::Main => main_value(row, column),
            JoinSide::Joiner => first.and_then(|first| joined_value(first, column)),
        };
        if keyed {
            // Unresolved values surface as absent fields.
            if let (Some(name), Some(value)) = (&column.name, value) {
                object.insert(name.clone(), value);
            }
        } else {
            sequence.push(value.unwrap_or(Value::Null));
        }
    }
    if keyed {
        Value::Object(object)
    } else {
        Value::Array(sequence)
    }
}

fn main_value(row: &Value, column: &SelectedColumn) -> Option<Value> {
    if let Some(name) = &column.name {
        row.get(name.as_str()).cloned()
    } else if let Some(index) = column.index {
        row.get(index).cloned()
    } else {
        None
    }
}

/// Fallback chain for joiner fields: field name, then positional index,
/// then the raw first element itself when it is a scalar.
fn joined_value(first: &Value, column: &SelectedColumn) -> Option<Value> {
    if let Some(name) = &column.name {
        if let Some(value) = first.get(name.as_str()) {
            return Some(value.clone());
        }
    }
    if let Some(index) = column.index {
        let positional = match first {
            Value::Array(items) => items.get(index),
            Value::Object(fields) => fields.values().nth(index),
            _ => None,
        };
        if let Some(value) = positional {
            return Some(value.clone());
        }
    }
    match first {
        Value::Array(_) | Value::Object(_) => None,
        scalar => Some(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joined_value_falls_back_to_positional_index() {
        let first = json!({"id": 1, "name": "x"});
        assert_eq!(
            joined_value(&first, &SelectedColumn::joiner_index(1)),
            Some(json!("x"))
        );
    }

    #[test]
    fn joined_value_falls_back_to_raw_scalar() {
        let column = SelectedColumn::joiner("total");
        assert_eq!(joined_value(&json!(9), &column), Some(json!(9)));
        assert_eq!(joined_value(&json!({"other": 1}), &column), None);
    }

    #[test]
    fn merge_row_is_keyed_when_first_selection_has_a_name() {
        let merged = merge_row(
            &json!({"id": 1}),
            &json!([{"total": 9}]),
            &[SelectedColumn::main("id"), SelectedColumn::joiner("total")],
            true,
        );
        assert_eq!(merged, json!({"id": 1, "total": 9}));
    }

    #[test]
    fn merge_row_is_positional_otherwise() {
        let merged = merge_row(
            &json!({"id": 1}),
            &json!([{"id": 1, "name": "x"}]),
            &[SelectedColumn::main_index(0), SelectedColumn::joiner_index(1)],
            false,
        );
        // The object main row has no positional fields; unresolved values
        // surface as nulls in a positional merge.
        assert_eq!(merged, json!([null, "x"]));
    }

    #[test]
    fn merge_row_wraps_scalar_main_rows() {
        let merged = merge_row(
            &json!(7),
            &json!(["joined"]),
            &[
                SelectedColumn::main_index(0),
                SelectedColumn::joiner_index(0),
            ],
            false,
        );
        assert_eq!(merged, json!([7, "joined"]));
    }

    #[test]
    fn empty_joined_bodies_count_as_no_rows() {
        assert!(!joined_has_rows(&json!([])));
        assert!(!joined_has_rows(&json!({})));
        assert!(!joined_has_rows(&json!(5)));
        assert!(joined_has_rows(&json!([1])));
        assert!(joined_has_rows(&json!({"a": 1})));
    }
}
