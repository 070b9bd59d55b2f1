//! # querylite core
//!
//! Typed schema descriptors, predicate and ordering expressions, the
//! immutable query builder and the executor that runs built queries
//! against a [`StoreSession`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod eval;
pub mod executor;
pub mod expr;
pub mod jpql;
pub mod query;
pub mod schema;
pub mod session;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use error::{Error, Result};
pub use executor::{Page, TotalCount};
pub use expr::{
    CompareOp, Direction, Expr, FieldRef, NullOrdering, Operand, Order, OrderSpecifier, Predicate,
};
pub use jpql::{ParseError, TypedQuery};
pub use query::{
    Projection, Query, QueryBuilder, QueryDescriptor, QuerySpec, Select, SelectBuilder, SourceSpec,
};
pub use schema::{
    Entity, EntityDescriptor, EntityId, EntityPath, Field, FieldDef, FieldDescriptor, FieldType,
    Schema, SchemaBuilder,
};
pub use session::StoreSession;
pub use value::{Row, Value, ValueType};
