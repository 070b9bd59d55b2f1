//! Query builder and the immutable descriptors it produces.
//!
//! [`QuerySpec`] is the untyped value handed to a store; [`QueryDescriptor`]
//! wraps it together with the projection used to turn rows back into typed
//! results.

mod builder;
mod descriptor;
mod select;

pub use builder::{Query, QueryBuilder, SelectBuilder};
pub use descriptor::QueryDescriptor;
pub use select::Select;

use crate::expr::{Expr, FieldRef, Order};
use std::fmt;
use std::sync::Arc;

/// Source entity and the alias it is queried under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Entity name
    pub entity: String,
    /// Alias used in the rendered query
    pub alias: String,
}

/// What a query returns per matching row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every field of the source entity
    Entity,
    /// The listed fields, in order
    Fields(Vec<FieldRef>),
}

/// A fully built, untyped query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// FROM clause
    pub source: SourceSpec,
    /// SELECT clause
    pub projection: Projection,
    /// WHERE clause; `None` matches every row
    pub predicate: Option<Arc<Expr>>,
    /// Sort keys, primary first
    pub order: Vec<Order>,
    /// Maximum rows returned
    pub limit: Option<u64>,
    /// Rows skipped before the first result
    pub offset: Option<u64>,
}

impl QuerySpec {
    /// A query returning every row of `entity`, unfiltered and unordered.
    pub fn new(entity: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: SourceSpec {
                entity: entity.into(),
                alias: alias.into(),
            },
            projection: Projection::Entity,
            predicate: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Every field touched by the projection, predicate and ordering.
    pub fn referenced_fields(&self) -> Vec<&FieldRef> {
        let mut fields = Vec::new();
        if let Projection::Fields(projected) = &self.projection {
            fields.extend(projected.iter());
        }
        if let Some(predicate) = &self.predicate {
            fields.extend(predicate.fields());
        }
        fields.extend(self.order.iter().map(|o| &o.field));
        fields
    }

    /// Copy of this query with its paging replaced.
    pub fn with_paging(&self, offset: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            offset,
            limit,
            ..self.clone()
        }
    }

    /// Copy of this query without offset and limit.
    pub fn without_paging(&self) -> Self {
        self.with_paging(None, None)
    }

    /// Names of the parameters left unbound in the predicate.
    pub fn parameters(&self) -> Vec<&str> {
        self.predicate
            .as_deref()
            .map(Expr::parameters)
            .unwrap_or_default()
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = self.source.alias.as_str();

        write!(f, "select ")?;
        match &self.projection {
            Projection::Entity => write!(f, "{}", alias)?,
            Projection::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}.{}", alias, field.name())?;
                }
            }
        }
        write!(f, " from {} {}", self.source.entity, alias)?;

        if let Some(predicate) = &self.predicate {
            write!(f, " where {}", predicate.display_with(alias))?;
        }

        if !self.order.is_empty() {
            write!(f, " order by ")?;
            for (i, order) in self.order.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", order.display_with(alias))?;
            }
        }

        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " offset {}", offset)?;
        }
        Ok(())
    }
}
