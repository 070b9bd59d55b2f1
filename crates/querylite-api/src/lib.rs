//! # querylite
//!
//! Type-safe query building and execution over an embedded entity store.
//!
//! Entities declare their fields once as typed [`Field`] constants. Queries
//! are composed from those fields, checked by the compiler, frozen into an
//! immutable [`QueryDescriptor`] and executed against any [`StoreSession`],
//! such as the bundled [`MemoryStore`].
//!
//! ## Quick start
//!
//! ```rust
//! use querylite::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Member {
//!     id: Option<EntityId>,
//!     username: Option<String>,
//!     age: i32,
//! }
//!
//! impl Member {
//!     const ID: Field<Member, Option<EntityId>> = Field::new("id");
//!     const USERNAME: Field<Member, Option<String>> = Field::new("username");
//!     const AGE: Field<Member, i32> = Field::new("age");
//! }
//!
//! impl Entity for Member {
//!     const NAME: &'static str = "Member";
//!     const FIELDS: &'static [FieldDef] =
//!         &[Member::ID.def(), Member::USERNAME.def(), Member::AGE.def()];
//!
//!     fn id(&self) -> Option<EntityId> {
//!         self.id
//!     }
//!
//!     fn set_id(&mut self, id: EntityId) {
//!         self.id = Some(id);
//!     }
//!
//!     fn to_row(&self) -> Row {
//!         Row::new()
//!             .with(&Self::ID, self.id)
//!             .with(&Self::USERNAME, self.username.clone())
//!             .with(&Self::AGE, self.age)
//!     }
//!
//!     fn from_row(row: &Row) -> querylite::Result<Self> {
//!         Ok(Self {
//!             id: row.get(&Self::ID)?,
//!             username: row.get(&Self::USERNAME)?,
//!             age: row.get(&Self::AGE)?,
//!         })
//!     }
//! }
//!
//! fn main() -> querylite::Result<()> {
//!     let schema = Arc::new(Schema::builder().register::<Member>().build()?);
//!     let store = MemoryStore::new(schema);
//!     store.persist(&mut Member { id: None, username: Some("member1".into()), age: 10 })?;
//!
//!     let found = Query::select_from(Member::path())
//!         .filter(Member::USERNAME.eq("member1").and(Member::AGE.eq(10)))
//!         .build()
//!         .fetch_one(&store)?;
//!     assert_eq!(found.map(|m| m.age), Some(10));
//!     Ok(())
//! }
//! ```
//!
//! ## String queries
//!
//! ```rust,ignore
//! let member = TypedQuery::<Member>::parse(&schema, "select m from Member m where m.username = :username")?
//!     .bind("username", "member1")?
//!     .single_result(&store)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod logging;

pub use querylite_core::{
    eval, jpql, Direction, Entity, EntityDescriptor, EntityId, EntityPath, Error, Expr, Field,
    FieldDef, FieldDescriptor, FieldRef, FieldType, NullOrdering, Order, OrderSpecifier, Page,
    ParseError, Predicate, Projection, Query, QueryBuilder, QueryDescriptor, QuerySpec, Result,
    Row, Schema, SchemaBuilder, Select, SelectBuilder, StoreSession, TotalCount, TypedQuery, Value,
    ValueType,
};
pub use querylite_store::{MemoryStore, StoreConfig, StoreError, Transaction};

/// Everything needed to declare entities and run queries
pub mod prelude {
    pub use crate::{
        Entity, EntityId, EntityPath, Field, FieldDef, MemoryStore, Page, Predicate, Query, Row,
        Schema, StoreSession, TotalCount, TypedQuery,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
