//! In-memory resource over a fixed row set.
//!
//! Exposes a `select` verb whose parameter handling mirrors what a remote
//! resource would do: equality filtering on flat fields, membership tests
//! for array-valued parameters, and pagination under the verb's declared
//! alias names. The natural temp-resource binding, and the workhorse of the
//! engine's test suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Envelope, ParamAliases, QlResult, Resource, Verb, VerbRequest};

#[derive(Clone)]
pub struct MemoryResource {
    select: Arc<MemorySelect>,
}

struct MemorySelect {
    rows: Vec<Value>,
    aliases: ParamAliases,
    invocations: AtomicUsize,
}

impl MemoryResource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self::with_aliases(rows, ParamAliases::default())
    }

    pub fn with_aliases(rows: Vec<Value>, aliases: ParamAliases) -> Self {
        Self {
            select: Arc::new(MemorySelect {
                rows,
                aliases,
                invocations: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of times the select verb has been invoked.
    pub fn invocations(&self) -> usize {
        self.select.invocations.load(Ordering::SeqCst)
    }
}

impl Resource for MemoryResource {
    fn verb(&self, name: &str) -> Option<Arc<dyn Verb>> {
        if name == "select" {
            Some(self.select.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl Verb for MemorySelect {
    fn aliases(&self) -> ParamAliases {
        self.aliases.clone()
    }

    async fn invoke(&self, request: VerbRequest) -> QlResult<Envelope> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let limit = request
            .params
            .get(self.aliases.limit_name())
            .and_then(Value::as_u64);
        let offset = request
            .params
            .get(self.aliases.offset_name())
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let mut rows: Vec<Value> = self
            .rows
            .iter()
            .filter(|row| self.matches(row, &request))
            .cloned()
            .collect();

        if offset > 0 {
            rows = rows.into_iter().skip(offset).collect();
        }
        if let Some(limit) = limit {
            rows.truncate(limit as usize);
        }
        Ok(Envelope::json(Value::Array(rows)))
    }
}

impl MemorySelect {
    fn matches(&self, row: &Value, request: &VerbRequest) -> bool {
        request.params.iter().all(|(key, expected)| {
            if key == self.aliases.limit_name() || key == self.aliases.offset_name() {
                return true;
            }
            // Null parameters carry no constraint.
            if expected.is_null() {
                return true;
            }
            match row.get(key.as_str()) {
                // Array-valued parameters are membership tests ("in").
                Some(actual) => match expected {
                    Value::Array(choices) => choices.contains(actual),
                    other => actual == other,
                },
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::VariableContext;
    use crate::ql::ast::Statement;
    use serde_json::json;
    use std::collections::HashMap;

    fn request(params: Vec<(&str, Value)>) -> VerbRequest {
        VerbRequest {
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
            statement: Arc::new(Statement::default()),
            context: VariableContext::new(),
            config: Arc::new(EngineConfig::default()),
        }
    }

    fn people() -> MemoryResource {
        MemoryResource::new(vec![
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b"}),
            json!({"id": 3, "name": "c"}),
        ])
    }

    #[tokio::test]
    async fn filters_by_equality() {
        let resource = people();
        let verb = resource.verb("select").unwrap();
        let envelope = verb.invoke(request(vec![("id", json!(2))])).await.unwrap();
        assert_eq!(envelope.body, Some(json!([{"id": 2, "name": "b"}])));
        assert_eq!(resource.invocations(), 1);
    }

    #[tokio::test]
    async fn array_parameters_are_membership_tests() {
        let resource = people();
        let verb = resource.verb("select").unwrap();
        let envelope = verb
            .invoke(request(vec![("id", json!([1, 3]))]))
            .await
            .unwrap();
        assert_eq!(
            envelope.body,
            Some(json!([{"id": 1, "name": "a"}, {"id": 3, "name": "c"}]))
        );
    }

    #[tokio::test]
    async fn paginates_under_alias_names() {
        let resource = MemoryResource::with_aliases(
            vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})],
            ParamAliases {
                limit: Some("count".to_string()),
                offset: Some("start".to_string()),
            },
        );
        let verb = resource.verb("select").unwrap();
        let envelope = verb
            .invoke(request(vec![("count", json!(1)), ("start", json!(1))]))
            .await
            .unwrap();
        assert_eq!(envelope.body, Some(json!([{"id": 2}])));
    }

    #[test]
    fn only_select_is_exposed() {
        let resource = people();
        assert!(resource.verb("select").is_some());
        assert!(resource.verb("delete").is_none());
    }
}
