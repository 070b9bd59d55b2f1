use super::{QueryDescriptor, QuerySpec, Select, SourceSpec};
use crate::error::{Error, Result};
use crate::expr::{Expr, Order, OrderSpecifier, Predicate};
use crate::schema::{Entity, EntityPath};
use std::marker::PhantomData;
use std::sync::Arc;

/// Entry point of the query builder.
///
/// ```ignore
/// let query = Query::select_from(Member::path())
///     .filter(Member::AGE.gte(20))
///     .order_by(Member::AGE.desc())
///     .build();
/// ```
pub struct Query;

impl Query {
    /// Starts a query whose projection is `projection`; the FROM clause
    /// must follow.
    pub fn select<P: Select>(projection: P) -> SelectBuilder<P> {
        SelectBuilder { projection }
    }

    /// Starts a query selecting whole entities from `path`.
    pub fn select_from<E: Entity>(path: EntityPath<E>) -> QueryBuilder<E, EntityPath<E>> {
        QueryBuilder::new(path.clone(), path)
    }
}

/// SELECT stage; only `from` can follow.
#[derive(Debug, Clone)]
pub struct SelectBuilder<P> {
    projection: P,
}

impl<P: Select> SelectBuilder<P> {
    /// Names the queried entity and its alias.
    pub fn from(self, path: EntityPath<P::Entity>) -> QueryBuilder<P::Entity, P> {
        QueryBuilder::new(self.projection, path)
    }
}

/// WHERE / ORDER BY / LIMIT / OFFSET stage.
///
/// Every method consumes the builder and returns the next state, so a
/// builder never changes behind the back of a clone.
pub struct QueryBuilder<E, P> {
    projection: P,
    source: SourceSpec,
    predicate: Option<Arc<Expr>>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity, P: Select<Entity = E>> QueryBuilder<E, P> {
    fn new(projection: P, path: EntityPath<E>) -> Self {
        Self {
            projection,
            source: SourceSpec {
                entity: E::NAME.to_string(),
                alias: path.alias().to_string(),
            },
            predicate: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }

    /// Adds a WHERE condition. Calling it again conjoins the conditions.
    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        let expr = predicate.into_expr();
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Arc::new(Expr::and_all([existing, expr])),
            None => expr,
        });
        self
    }

    /// Conjoins every predicate, skipping `None` entries.
    ///
    /// Accepts plain predicates as well as `Option<Predicate<E>>`, so
    /// optional search conditions can be passed without branching.
    pub fn filter_all<I>(self, predicates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<Predicate<E>>>,
    {
        let parts: Vec<_> = predicates.into_iter().filter_map(Into::into).collect();
        if parts.is_empty() {
            return self;
        }
        self.filter(Predicate::all(parts))
    }

    /// Appends a sort key.
    pub fn order_by(mut self, order: OrderSpecifier<E>) -> Self {
        self.order.push(order.into_order());
        self
    }

    /// Appends sort keys, primary key first.
    pub fn order_by_all(mut self, orders: impl IntoIterator<Item = OrderSpecifier<E>>) -> Self {
        self.order
            .extend(orders.into_iter().map(OrderSpecifier::into_order));
        self
    }

    /// Returns at most `limit` rows.
    ///
    /// Fails on a negative value or when a limit is already set.
    pub fn limit(mut self, limit: i64) -> Result<Self> {
        self.limit = Some(Self::paging_value("limit", self.limit, limit)?);
        Ok(self)
    }

    /// Skips the first `offset` rows.
    ///
    /// Fails on a negative value or when an offset is already set.
    pub fn offset(mut self, offset: i64) -> Result<Self> {
        self.offset = Some(Self::paging_value("offset", self.offset, offset)?);
        Ok(self)
    }

    fn paging_value(clause: &'static str, current: Option<u64>, value: i64) -> Result<u64> {
        if current.is_some() {
            return Err(Error::DuplicateClause(clause));
        }
        u64::try_from(value)
            .map_err(|_| Error::InvalidArgument(format!("{} must not be negative: {}", clause, value)))
    }

    /// Snapshot of the current state as an immutable descriptor.
    pub fn build(&self) -> QueryDescriptor<E, P> {
        let spec = QuerySpec {
            source: self.source.clone(),
            projection: self.projection.projection(),
            predicate: self.predicate.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
        };
        QueryDescriptor::new(spec, self.projection.clone())
    }
}

impl<E, P: Clone> Clone for QueryBuilder<E, P> {
    fn clone(&self) -> Self {
        Self {
            projection: self.projection.clone(),
            source: self.source.clone(),
            predicate: self.predicate.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            _marker: PhantomData,
        }
    }
}

impl<E, P> std::fmt::Debug for QueryBuilder<E, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("source", &self.source)
            .field("predicate", &self.predicate)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}
