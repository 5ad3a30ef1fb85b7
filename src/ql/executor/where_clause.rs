//! Predicate resolution.
//!
//! Turns a statement's predicate list into an ordered sequence of flat
//! parameter maps. The trait seam lets embedders plug in a resolver that can
//! fetch dependent data; the default flattens literal predicates in
//! declaration order.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::context::VariableContext;
use crate::error::QlResult;
use crate::ql::ast::{Predicate, PredicateRhs};
use crate::resource::Params;

#[async_trait]
pub trait WhereResolver: Send + Sync {
    async fn resolve(
        &self,
        context: &VariableContext,
        criteria: &[Predicate],
    ) -> QlResult<Vec<Params>>;
}

#[derive(Debug, Default)]
pub struct DefaultWhereResolver;

#[async_trait]
impl WhereResolver for DefaultWhereResolver {
    async fn resolve(
        &self,
        _context: &VariableContext,
        criteria: &[Predicate],
    ) -> QlResult<Vec<Params>> {
        let mut resolved = Vec::with_capacity(criteria.len());
        for predicate in criteria {
            let mut params = HashMap::new();
            match &predicate.rhs {
                PredicateRhs::Literal(value) => {
                    params.insert(predicate.lhs.clone(), value.clone());
                }
                // A join predicate contributes its injected value; on the
                // uninstantiated template it contributes nothing.
                PredicateRhs::Join { value, .. } => {
                    if let Some(value) = value {
                        params.insert(predicate.lhs.clone(), value.clone());
                    }
                }
            }
            resolved.push(params);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ql::ast::Predicate;
    use serde_json::json;

    #[tokio::test]
    async fn flattens_predicates_in_order() {
        let criteria = vec![
            Predicate::eq("o.id", json!(7)),
            Predicate::in_values("state", vec![json!("CA"), json!("OR")]),
        ];
        let resolved = DefaultWhereResolver
            .resolve(&VariableContext::new(), &criteria)
            .await
            .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].get("o.id"), Some(&json!(7)));
        assert_eq!(resolved[1].get("state"), Some(&json!(["CA", "OR"])));
    }

    #[tokio::test]
    async fn uninstantiated_join_predicate_contributes_nothing() {
        let criteria = vec![Predicate::join("id", "orderId")];
        let resolved = DefaultWhereResolver
            .resolve(&VariableContext::new(), &criteria)
            .await
            .unwrap();
        assert!(resolved[0].is_empty());
    }

    #[tokio::test]
    async fn injected_join_value_surfaces_under_lhs() {
        let mut predicate = Predicate::join("id", "orderId");
        if let PredicateRhs::Join { value, .. } = &mut predicate.rhs {
            *value = Some(json!(42));
        }
        let resolved = DefaultWhereResolver
            .resolve(&VariableContext::new(), &[predicate])
            .await
            .unwrap();
        assert_eq!(resolved[0].get("id"), Some(&json!(42)));
    }
}
