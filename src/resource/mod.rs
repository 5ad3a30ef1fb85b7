//! Data-source bindings.
//!
//! A registry maps table names to resources; a resource exposes named verbs
//! (`select` is the one this engine drives) that are invoked asynchronously.
//! Temp resources are a second, run-scoped registry consulted first.

pub mod memory;

pub use memory::MemoryResource;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::context::VariableContext;
use crate::error::QlResult;
use crate::ql::ast::{Envelope, Statement};

/// Resolved parameters handed to a verb invocation.
pub type Params = HashMap<String, Value>;

/// Resource-specific names for the abstract pagination parameters. A verb
/// that declares `limit: Some("count")` receives the statement's limit under
/// the key `count`.
#[derive(Debug, Clone, Default)]
pub struct ParamAliases {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ParamAliases {
    pub fn limit_name(&self) -> &str {
        self.limit.as_deref().unwrap_or("limit")
    }

    pub fn offset_name(&self) -> &str {
        self.offset.as_deref().unwrap_or("offset")
    }
}

/// Everything a verb sees for one invocation.
pub struct VerbRequest {
    pub params: Params,
    /// The originating statement, columns already template-resolved.
    pub statement: Arc<Statement>,
    pub context: VariableContext,
    pub config: Arc<EngineConfig>,
}

/// A named, invocable capability of a resource. Verbs own their transport,
/// timeout, and retry behavior; the engine never retries.
#[async_trait]
pub trait Verb: Send + Sync {
    fn aliases(&self) -> ParamAliases {
        ParamAliases::default()
    }

    async fn invoke(&self, request: VerbRequest) -> QlResult<Envelope>;
}

pub trait Resource: Send + Sync {
    fn verb(&self, name: &str) -> Option<Arc<dyn Verb>>;
}

/// Table name to resource bindings. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    entries: Arc<DashMap<String, Arc<dyn Resource>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, resource: Arc<dyn Resource>) {
        self.entries.insert(name.into(), resource);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Resource>> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }
}

/// Ephemeral, run-scoped bindings consulted before the persistent registry.
pub type TempResources = ResourceRegistry;
