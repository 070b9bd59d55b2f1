//! JPQL-style string queries.
//!
//! The string form is resolved against a [`Schema`] into the same
//! [`QuerySpec`] the typed builder produces, so both run through the same
//! store path:
//!
//! ```ignore
//! let members = TypedQuery::<Member>::parse(&schema,
//!         "select m from Member m where m.username = :username")?
//!     .bind("username", "member1")?
//!     .result_list(&store)?;
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::{Condition, OrderItem, Path, Statement};
pub use lexer::{Lexer, LexerError, Token};
pub use parser::{ParseError, Parser};

use crate::error::{Error, Result};
use crate::expr::{Expr, FieldRef, Operand, Order};
use crate::query::{Projection, QuerySpec, SourceSpec};
use crate::schema::{Entity, EntityDescriptor, Schema};
use crate::session::StoreSession;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A parsed string query returning entities of type `E`.
pub struct TypedQuery<E> {
    spec: QuerySpec,
    bindings: HashMap<String, Value>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> TypedQuery<E> {
    /// Parses `text` and resolves its entity and fields through `schema`.
    pub fn parse(schema: &Schema, text: &str) -> Result<Self> {
        let statement = Parser::new(text)?.parse()?;
        let descriptor = schema.describe_name(&statement.entity)?;
        if descriptor.name != E::NAME {
            return Err(Error::InvalidArgument(format!(
                "query selects {} but results are read as {}",
                descriptor.name,
                E::NAME
            )));
        }

        let spec = Resolver {
            descriptor: &descriptor,
            alias: &statement.alias,
        }
        .resolve(&statement)?;

        Ok(Self {
            spec,
            bindings: HashMap::new(),
            _marker: PhantomData,
        })
    }

    /// Binds a named parameter. Fails if the query has no such parameter.
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        if !self.spec.parameters().contains(&name) {
            return Err(Error::InvalidArgument(format!(
                "query has no parameter :{}",
                name
            )));
        }
        self.bindings.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// Skips the first `offset` results.
    pub fn first_result(mut self, offset: u64) -> Self {
        self.spec.offset = Some(offset);
        self
    }

    /// Returns at most `limit` results.
    pub fn max_results(mut self, limit: u64) -> Self {
        self.spec.limit = Some(limit);
        self
    }

    /// The resolved query, parameters still unbound.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Every matching entity, in query order.
    pub fn result_list<S>(&self, session: &S) -> Result<Vec<E>>
    where
        S: StoreSession + ?Sized,
    {
        self.run(session, self.bound_spec()?)
    }

    /// Exactly one matching entity.
    ///
    /// Fails with [`Error::NoResult`] when nothing matches and with
    /// [`Error::NonUniqueResult`] when more than one row does.
    pub fn single_result<S>(&self, session: &S) -> Result<E>
    where
        S: StoreSession + ?Sized,
    {
        let mut spec = self.bound_spec()?;
        spec.limit = Some(spec.limit.map_or(2, |limit| limit.min(2)));

        let mut results = self.run(session, spec)?;
        match results.len() {
            0 => Err(Error::NoResult {
                entity: E::NAME.to_string(),
            }),
            1 => Ok(results.remove(0)),
            _ => Err(Error::NonUniqueResult {
                entity: E::NAME.to_string(),
            }),
        }
    }

    fn run<S>(&self, session: &S, spec: QuerySpec) -> Result<Vec<E>>
    where
        S: StoreSession + ?Sized,
    {
        debug!(query = %spec, "string query");
        session
            .execute(&spec)?
            .iter()
            .map(E::from_row)
            .collect()
    }

    fn bound_spec(&self) -> Result<QuerySpec> {
        let mut spec = self.spec.clone();
        if let Some(predicate) = &spec.predicate {
            spec.predicate = Some(bind_parameters(predicate, &self.bindings)?);
        }
        Ok(spec)
    }
}

impl<E> Clone for TypedQuery<E> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            bindings: self.bindings.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for TypedQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedQuery")
            .field("spec", &self.spec)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl<E> fmt::Display for TypedQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.spec, f)
    }
}

/// Turns names in a parsed statement into schema-checked references.
struct Resolver<'a> {
    descriptor: &'a EntityDescriptor,
    alias: &'a str,
}

impl Resolver<'_> {
    fn resolve(&self, statement: &Statement) -> Result<QuerySpec> {
        if statement.projection != self.alias {
            return Err(Error::InvalidArgument(format!(
                "unknown alias {} in select list",
                statement.projection
            )));
        }

        let predicate = statement
            .condition
            .as_ref()
            .map(|condition| self.condition(condition).map(Arc::new))
            .transpose()?;

        let order = statement
            .order_by
            .iter()
            .map(|item| {
                Ok(Order {
                    field: self.field(&item.path)?,
                    direction: item.direction,
                    nulls: item.nulls,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(QuerySpec {
            source: SourceSpec {
                entity: self.descriptor.name.clone(),
                alias: self.alias.to_string(),
            },
            projection: Projection::Entity,
            predicate,
            order,
            limit: statement.limit,
            offset: statement.offset,
        })
    }

    fn condition(&self, condition: &Condition) -> Result<Expr> {
        Ok(match condition {
            Condition::Compare { left, op, right } => Expr::Compare {
                field: self.field(left)?,
                op: *op,
                operand: match right {
                    ast::Operand::Path(path) => Operand::Field(self.field(path)?),
                    ast::Operand::Literal(value) => Operand::Value(value.clone()),
                    ast::Operand::Parameter(name) => Operand::Parameter(name.clone()),
                },
            },
            Condition::IsNull { path, negated } => Expr::IsNull {
                field: self.field(path)?,
                negated: *negated,
            },
            Condition::And(operands) => Expr::and_all(self.conditions(operands)?),
            Condition::Or(operands) => Expr::or_all(self.conditions(operands)?),
            Condition::Not(inner) => Expr::Not(Arc::new(self.condition(inner)?)),
            // an empty conjunction always holds, an empty disjunction never does
            Condition::Constant(true) => Expr::And(Vec::new()),
            Condition::Constant(false) => Expr::Or(Vec::new()),
        })
    }

    fn conditions(&self, operands: &[Condition]) -> Result<Vec<Arc<Expr>>> {
        operands
            .iter()
            .map(|operand| self.condition(operand).map(Arc::new))
            .collect()
    }

    fn field(&self, path: &Path) -> Result<FieldRef> {
        if path.alias != self.alias {
            return Err(Error::InvalidArgument(format!(
                "unknown alias {} in {}.{}",
                path.alias, path.alias, path.field
            )));
        }
        let field = self.descriptor.field(&path.field).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} has no field {}",
                self.descriptor.name, path.field
            ))
        })?;
        Ok(FieldRef::new(field.entity.clone(), field.name.clone()))
    }
}

/// Copy of `expr` with every parameter replaced by its bound value.
fn bind_parameters(expr: &Arc<Expr>, bindings: &HashMap<String, Value>) -> Result<Arc<Expr>> {
    Ok(match expr.as_ref() {
        Expr::Compare {
            field,
            op,
            operand: Operand::Parameter(name),
        } => {
            let value = bindings
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnboundParameter(name.clone()))?;
            Arc::new(Expr::Compare {
                field: field.clone(),
                op: *op,
                operand: Operand::Value(value),
            })
        }
        Expr::Compare { .. } | Expr::IsNull { .. } => Arc::clone(expr),
        Expr::And(children) => Arc::new(Expr::And(
            children
                .iter()
                .map(|c| bind_parameters(c, bindings))
                .collect::<Result<_>>()?,
        )),
        Expr::Or(children) => Arc::new(Expr::Or(
            children
                .iter()
                .map(|c| bind_parameters(c, bindings))
                .collect::<Result<_>>()?,
        )),
        Expr::Not(inner) => Arc::new(Expr::Not(bind_parameters(inner, bindings)?)),
    })
}
