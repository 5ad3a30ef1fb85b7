pub mod config;
pub mod context;
pub mod error;
pub mod ql;
pub mod resource;

pub use config::EngineConfig;
pub use context::VariableContext;
pub use error::{QlError, QlResult};
pub use ql::{
    Column, Engine, Envelope, JoinSide, Predicate, PredicateOp, PredicateRhs, SelectedColumn,
    Statement, TableRef,
};
pub use resource::{
    MemoryResource, ParamAliases, Params, Resource, ResourceRegistry, TempResources, Verb,
    VerbRequest,
};
