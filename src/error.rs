use thiserror::Error;

use crate::ql::ast::Envelope;

#[derive(Error, Debug)]
pub enum QlError {
    #[error("No such table '{0}'")]
    NoSuchTable(String),

    #[error("Table '{table}' does not support {verb}")]
    UnsupportedOperation { table: String, verb: String },

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("Resource verb failed: {0}")]
    Verb(String),

    #[error("Joiner statement carries no join predicate")]
    MissingJoinPredicate,

    /// One or more joiner clones failed. The merge still ran over whatever
    /// clone outcomes were available; `partial` carries that best-effort
    /// envelope, so callers receive both the error and the merged body.
    #[error("Join failed for {} nested statement(s)", .errors.len())]
    JoinClones {
        errors: Vec<QlError>,
        partial: Box<Envelope>,
    },
}

pub type QlResult<T> = Result<T, QlError>;

impl serde::Serialize for QlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
