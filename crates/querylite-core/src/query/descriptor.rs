use super::{QuerySpec, Select};
use std::fmt;
use std::marker::PhantomData;

/// An immutable, fully built query over entity `E` with projection `P`.
///
/// Produced by [`QueryBuilder::build`](super::QueryBuilder::build) and run
/// by the fetch methods in [`executor`](crate::executor).
pub struct QueryDescriptor<E, P> {
    spec: QuerySpec,
    projection: P,
    _marker: PhantomData<fn() -> E>,
}

impl<E, P: Select> QueryDescriptor<E, P> {
    pub(crate) fn new(spec: QuerySpec, projection: P) -> Self {
        Self {
            spec,
            projection,
            _marker: PhantomData,
        }
    }

    /// The untyped query handed to the store.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// The projection that turns rows into results.
    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Consumes the descriptor, returning the untyped query.
    pub fn into_spec(self) -> QuerySpec {
        self.spec
    }
}

impl<E, P: Clone> Clone for QueryDescriptor<E, P> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            projection: self.projection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, P> PartialEq for QueryDescriptor<E, P> {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl<E, P> fmt::Debug for QueryDescriptor<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueryDescriptor").field(&self.spec).finish()
    }
}

impl<E, P> fmt::Display for QueryDescriptor<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.spec, f)
    }
}
