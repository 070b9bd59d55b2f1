//! Contract of the entity store the executor runs against.

use crate::error::Result;
use crate::query::QuerySpec;
use crate::value::Row;

/// A store able to execute built queries.
///
/// Implementations must honor projection, predicate, ordering, limit and
/// offset exactly; failures are reported as [`Error::Store`](crate::Error)
/// and are passed to the caller untouched.
pub trait StoreSession {
    /// Runs the query and returns the projected rows, in order.
    fn execute(&self, spec: &QuerySpec) -> Result<Vec<Row>>;

    /// Counts the rows the query would return without materializing them.
    fn execute_count(&self, spec: &QuerySpec) -> Result<u64>;
}

impl<S: StoreSession + ?Sized> StoreSession for &S {
    fn execute(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        (**self).execute(spec)
    }

    fn execute_count(&self, spec: &QuerySpec) -> Result<u64> {
        (**self).execute_count(spec)
    }
}
