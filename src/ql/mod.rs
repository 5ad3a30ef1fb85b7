pub mod ast;
pub mod executor;

pub use ast::*;
pub use executor::{
    DefaultProjector, DefaultRowFilter, DefaultWhereResolver, Engine, Projector, RowFilter,
    Template, TemplateError, WhereResolver,
};
