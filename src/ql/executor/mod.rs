//! Statement execution engine.
//!
//! `Engine` evaluates one parsed statement against its data sources and,
//! when the statement carries a joiner, runs the join-merge fan-out. The
//! predicate resolver, row filter, and projector are trait seams with
//! in-crate defaults; embedders swap in their own via the builder methods.

mod filter;
mod join;
mod project;
mod select;
mod template;
mod where_clause;

pub use filter::{DefaultRowFilter, RowFilter};
pub use project::{DefaultProjector, Projector};
pub use template::{Template, TemplateError};
pub use where_clause::{DefaultWhereResolver, WhereResolver};

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::context::VariableContext;
use crate::error::{QlError, QlResult};
use crate::ql::ast::{Envelope, Statement};
use crate::resource::{ResourceRegistry, TempResources};

pub struct Engine {
    pub(crate) registry: ResourceRegistry,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) where_resolver: Arc<dyn WhereResolver>,
    pub(crate) filter: Arc<dyn RowFilter>,
    pub(crate) projector: Arc<dyn Projector>,
}

impl Engine {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: ResourceRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            where_resolver: Arc::new(DefaultWhereResolver),
            filter: Arc::new(DefaultRowFilter),
            projector: Arc::new(DefaultProjector),
        }
    }

    /// Plug in the real predicate resolver.
    pub fn with_where_resolver(mut self, resolver: Arc<dyn WhereResolver>) -> Self {
        self.where_resolver = resolver;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn RowFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_projector(mut self, projector: Arc<dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    /// Execute a statement end to end: single-statement evaluation, then the
    /// join-merge fan-out when a joiner is present. Delivers exactly one
    /// terminal outcome. When joiner clones fail the merge still runs; the
    /// merged envelope travels inside `QlError::JoinClones`.
    pub async fn execute(
        &self,
        statement: &Statement,
        context: &VariableContext,
        temp: &TempResources,
    ) -> QlResult<Envelope> {
        let span = tracing::info_span!("select", line = statement.line);
        self.execute_inner(statement, context, temp)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        statement: &Statement,
        context: &VariableContext,
        temp: &TempResources,
    ) -> QlResult<Envelope> {
        let mut results = self.exec_single(statement, context, temp).await?;
        if statement.joiner.is_some() {
            let errors = self.exec_join(statement, &mut results, context, temp).await?;
            // The merged body, not the pre-join body, is what assignment
            // publishes downstream.
            if let Some(assign) = &statement.assign {
                context.assign(assign, results.body.clone().unwrap_or(Value::Null));
            }
            if !errors.is_empty() {
                return Err(QlError::JoinClones {
                    errors,
                    partial: Box::new(results),
                });
            }
        }
        Ok(results)
    }
}
