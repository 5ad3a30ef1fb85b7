//! Single-statement evaluation.
//!
//! Resolves each from-clause entry against the variable context, temp
//! resources, and the resource registry, invoking `select` verbs or the
//! filter/project pipeline. Entries fan out concurrently with no bound at
//! this layer.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use super::template::Template;
use super::Engine;
use crate::context::VariableContext;
use crate::error::{QlError, QlResult};
use crate::ql::ast::{Envelope, Statement, TableRef};
use crate::resource::{Params, TempResources, VerbRequest};

impl Engine {
    /// Execute one statement, ignoring any joiner it carries.
    pub(crate) async fn exec_single(
        &self,
        statement: &Statement,
        context: &VariableContext,
        temp: &TempResources,
    ) -> QlResult<Envelope> {
        let mut statement = statement.clone();
        prefill_columns(&mut statement, context);

        let resolved = self
            .where_resolver
            .resolve(context, &statement.where_criteria)
            .await?;

        // Entries are independent; all of them fan out simultaneously.
        let statement = Arc::new(statement);
        let entries = statement.from_clause.clone();
        let outcomes = join_all(entries.into_iter().map(|from| {
            let statement = statement.clone();
            let resolved = &resolved;
            async move {
                self.exec_from_entry(statement, from, resolved, context, temp)
                    .await
            }
        }))
        .await;

        let mut envelopes = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            envelopes.push(outcome?);
        }
        // Every entry runs (and performs its side effects); the first
        // entry's envelope, by clause position, is the statement's result.
        Ok(envelopes.into_iter().next().unwrap_or_else(Envelope::empty))
    }

    async fn exec_from_entry(
        &self,
        statement: Arc<Statement>,
        from: TableRef,
        resolved: &[Params],
        context: &VariableContext,
        temp: &TempResources,
    ) -> QlResult<Envelope> {
        // Collapse the ordered predicate maps into one parameter map; keys
        // carrying this entry's alias prefix land on plain field names.
        let mut params: Params = HashMap::new();
        for map in resolved {
            for (key, value) in map {
                let key = strip_alias_prefix(key, &from);
                params.insert(key.to_string(), value.clone());
            }
        }

        // Context variables shadow resources, even when holding null.
        let variable = from.variable_name();
        if context.contains(variable) {
            tracing::debug!(
                table = variable,
                line = statement.line,
                "resolving from-clause entry against the context"
            );
            let value = context.get(variable).unwrap_or(Value::Null);
            let filtered = self.filter.filter(&value, &statement, context, &from);
            let projected = self
                .projector
                .project("", &statement, filtered, context)
                .await?;
            if let Some(assign) = &statement.assign {
                context.assign(assign, projected.clone());
            }
            return Ok(Envelope::json(projected));
        }

        // Temp resources shadow the registry; both are keyed by the literal
        // (unstripped) name.
        let resource = temp
            .lookup(&from.name)
            .or_else(|| self.registry.lookup(&from.name))
            .ok_or_else(|| QlError::NoSuchTable(from.name.clone()))?;
        let verb = resource
            .verb("select")
            .ok_or_else(|| QlError::UnsupportedOperation {
                table: from.name.clone(),
                verb: "select".to_string(),
            })?;

        let aliases = verb.aliases();
        if let Some(limit) = statement.limit {
            params.insert(aliases.limit_name().to_string(), Value::from(limit));
        }
        if let Some(offset) = statement.offset {
            params.insert(aliases.offset_name().to_string(), Value::from(offset));
        }

        tracing::debug!(
            table = %from.name,
            line = statement.line,
            "invoking select verb"
        );
        let envelope = verb
            .invoke(VerbRequest {
                params,
                statement: statement.clone(),
                context: context.clone(),
                config: self.config.clone(),
            })
            .await?;
        if let Some(assign) = &statement.assign {
            context.assign(assign, envelope.body.clone().unwrap_or(Value::Null));
        }
        Ok(envelope)
    }
}

/// Best-effort column aliasing: parse or render failures keep the original
/// column name.
fn prefill_columns(statement: &mut Statement, context: &VariableContext) {
    for column in statement.columns.iter_mut() {
        let Ok(template) = Template::compile(&column.name) else {
            continue;
        };
        if !template.has_references() {
            continue;
        }
        if let Ok(rendered) = template.render(context) {
            column.name = rendered;
        }
    }
}

fn strip_alias_prefix<'a>(key: &'a str, from: &TableRef) -> &'a str {
    if let Some(alias) = &from.alias {
        if let Some(rest) = key.strip_prefix(alias.as_str()) {
            if let Some(rest) = rest.strip_prefix('.') {
                return rest;
            }
        }
    }
    key
}
