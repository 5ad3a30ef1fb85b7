//! Shared variable bindings for one query run.
//!
//! Statements write into the context through `assign`, which also publishes
//! the assigned value on a per-variable broadcast channel so dependent
//! statements can react without polling.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

const ASSIGNMENT_CHANNEL_CAPACITY: usize = 64;

/// Variable name to last-computed value, shared by every statement fragment
/// of a run. Cloning is cheap; clones share the same underlying map and
/// assignment channels. Writes are last-write-wins per key.
#[derive(Clone, Default)]
pub struct VariableContext {
    vars: Arc<DashMap<String, Value>>,
    channels: Arc<DashMap<String, broadcast::Sender<Value>>>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is an own key, regardless of the stored value.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).map(|entry| entry.value().clone())
    }

    /// Seed a variable without notifying subscribers. Used for bindings that
    /// exist before execution starts (compiler-provided values, fixtures).
    pub fn insert(&self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Assignment side effect: store the value and publish it to any
    /// subscriber of `name`. Publishing never blocks and never fails the
    /// assignment, even with no live subscribers.
    pub fn assign(&self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value.clone());
        if let Some(tx) = self.channels.get(name) {
            let _ = tx.send(value);
        }
    }

    /// Subscribe to assignments of `name`. Values assigned after this call
    /// are delivered in assignment order; slow consumers may observe lag.
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<Value> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(ASSIGNMENT_CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn own_key_check_sees_null_values() {
        let context = VariableContext::new();
        context.insert("empty", Value::Null);
        assert!(context.contains("empty"));
        assert_eq!(context.get("empty"), Some(Value::Null));
        assert!(!context.contains("missing"));
    }

    #[test]
    fn last_write_wins() {
        let context = VariableContext::new();
        context.assign("a", json!(1));
        context.assign("a", json!(2));
        assert_eq!(context.get("a"), Some(json!(2)));
    }

    #[tokio::test]
    async fn assignment_publishes_to_subscribers() {
        let context = VariableContext::new();
        let mut rx = context.subscribe("orders");
        context.assign("orders", json!([{"id": 1}]));
        assert_eq!(rx.recv().await.unwrap(), json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn assignment_without_subscribers_is_silent() {
        let context = VariableContext::new();
        context.assign("orders", json!(1));
        assert_eq!(context.get("orders"), Some(json!(1)));
    }

    #[test]
    fn clones_share_state() {
        let context = VariableContext::new();
        let other = context.clone();
        other.assign("a", json!(true));
        assert_eq!(context.get("a"), Some(json!(true)));
    }
}
