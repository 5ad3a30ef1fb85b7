//! Column-name templates.
//!
//! Column specs may embed `{variable}` references that are resolved against
//! the run's variable context before execution. Resolution is advisory: the
//! evaluator keeps the original name whenever compilation or rendering fails.

use thiserror::Error;

use crate::context::VariableContext;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unterminated variable reference at offset {0}")]
    Unterminated(usize),

    #[error("Empty variable reference at offset {0}")]
    EmptyVariable(usize),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Variable '{0}' does not render to a scalar")]
    NotScalar(String),
}

impl Template {
    pub fn compile(text: &str) -> Result<Template, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices();

        while let Some((offset, ch)) = chars.next() {
            if ch != '{' {
                literal.push(ch);
                continue;
            }
            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((nested, '{')) => return Err(TemplateError::Unterminated(nested)),
                    Some((_, ch)) => name.push(ch),
                    None => return Err(TemplateError::Unterminated(offset)),
                }
            }
            if name.is_empty() {
                return Err(TemplateError::EmptyVariable(offset));
            }
            parts.push(Part::Variable(name));
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Template { parts })
    }

    /// Whether the template references any variable at all.
    pub fn has_references(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Variable(_)))
    }

    pub fn render(&self, context: &VariableContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Variable(name) => {
                    let value = context
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownVariable(name.clone()))?;
                    match value {
                        Value::String(s) => out.push_str(&s),
                        Value::Number(n) => out.push_str(&n.to_string()),
                        Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                        _ => return Err(TemplateError::NotScalar(name.clone())),
                    }
                }
            }
        }
        Ok(out)
    }
}
