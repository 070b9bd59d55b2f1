use super::Projection;
use crate::error::Result;
use crate::schema::{Entity, EntityPath, Field, FieldType};
use crate::value::Row;

/// Something that can appear in a SELECT clause.
///
/// The associated entity ties the projection to the FROM clause at compile
/// time; `Output` is what each result row turns into.
pub trait Select: Clone {
    /// Entity named in the FROM clause.
    type Entity: Entity;
    /// Value produced per result row.
    type Output;

    /// Columns the store must return.
    fn projection(&self) -> Projection;

    /// Converts one projected row into the output value.
    fn materialize(&self, row: Row) -> Result<Self::Output>;
}

impl<E: Entity> Select for EntityPath<E> {
    type Entity = E;
    type Output = E;

    fn projection(&self) -> Projection {
        Projection::Entity
    }

    fn materialize(&self, row: Row) -> Result<E> {
        E::from_row(&row)
    }
}

impl<E: Entity, T: FieldType> Select for Field<E, T> {
    type Entity = E;
    type Output = T;

    fn projection(&self) -> Projection {
        Projection::Fields(vec![self.to_ref()])
    }

    fn materialize(&self, row: Row) -> Result<T> {
        row.get(self)
    }
}

impl<E: Entity, A: FieldType, B: FieldType> Select for (Field<E, A>, Field<E, B>) {
    type Entity = E;
    type Output = (A, B);

    fn projection(&self) -> Projection {
        Projection::Fields(vec![self.0.to_ref(), self.1.to_ref()])
    }

    fn materialize(&self, row: Row) -> Result<(A, B)> {
        Ok((row.get(&self.0)?, row.get(&self.1)?))
    }
}
