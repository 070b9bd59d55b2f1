//! Schema descriptors.
//!
//! Entities describe themselves through the [`Entity`] trait and expose one
//! [`Field`] constant per column. Those constants are the compile-time
//! equivalent of generated "Q-types": a `Field<Member, i32>` can only be
//! compared with an `i32` and only used in a query over `Member`.
//!
//! A [`Schema`] is the registry of entity types known to a store. Lookups are
//! memoized: a descriptor is computed the first time it is asked for and the
//! same `Arc` is handed out afterwards.

use crate::error::{Error, Result};
use crate::expr::FieldRef;
use crate::query::QuerySpec;
use crate::value::{Row, Value, ValueType};
use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Identifier assigned to a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::Integer(id.0)
    }
}

/// Rust types that can back an entity field.
///
/// `Operand` is what comparisons accept; for `Option<T>` it is `T`'s operand
/// so that a nullable `username` is still compared against a plain string.
pub trait FieldType: Clone + Send + Sync + 'static {
    /// Type accepted on the right-hand side of comparisons.
    type Operand: Into<Value>;

    /// Stored value type.
    const VALUE_TYPE: ValueType;
    /// Whether null is a valid value.
    const NULLABLE: bool = false;

    /// Converts into a stored value.
    fn into_value(self) -> Value;

    /// Reads a stored value of `column`, failing on a type mismatch.
    fn from_value(column: &str, value: Value) -> Result<Self>;
}

impl FieldType for String {
    type Operand = String;
    const VALUE_TYPE: ValueType = ValueType::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl FieldType for i64 {
    type Operand = i64;
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl FieldType for i32 {
    type Operand = i32;
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i).map_err(|_| Error::Mapping {
                column: column.to_string(),
                expected: Self::VALUE_TYPE,
                found: format!("out of range integer {}", i),
            }),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl FieldType for f64 {
    type Operand = f64;
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl FieldType for bool {
    type Operand = bool;
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl FieldType for EntityId {
    type Operand = EntityId;
    const VALUE_TYPE: ValueType = ValueType::Reference;

    fn into_value(self) -> Value {
        Value::Integer(self.0)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(EntityId(i)),
            other => Err(Error::mapping(column, Self::VALUE_TYPE, &other)),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    type Operand = T::Operand;
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const NULLABLE: bool = true;

    fn into_value(self) -> Value {
        self.map_or(Value::Null, FieldType::into_value)
    }

    fn from_value(column: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

/// Static description of one field, as listed in [`Entity::FIELDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name
    pub name: &'static str,
    /// Stored value type
    pub value_type: ValueType,
    /// Whether the field accepts null
    pub nullable: bool,
}

/// Typed reference to a field `T` of entity `E`.
pub struct Field<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Field<E, T> {
    /// Field named `name`. The name must match a column written by [`Entity::to_row`].
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Column name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, T: FieldType> Field<E, T> {
    /// Static definition used to build the owning entity's `FIELDS` list.
    pub const fn def(&self) -> FieldDef {
        FieldDef {
            name: self.name,
            value_type: T::VALUE_TYPE,
            nullable: T::NULLABLE,
        }
    }
}

impl<E: Entity, T> Field<E, T> {
    /// Untyped reference, qualified by the entity name.
    pub fn to_ref(&self) -> FieldRef {
        FieldRef::new(E::NAME, self.name)
    }
}

impl<E, T> Clone for Field<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Field<E, T> {}

impl<E, T> PartialEq for Field<E, T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<E, T> fmt::Debug for Field<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({}: {})", self.name, type_name::<T>())
    }
}

/// A persistable type.
///
/// Implementations list their fields once in `FIELDS` and convert to and
/// from [`Row`]s; everything else (ids, ordering of columns in storage) is
/// derived from that.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Entity name used in queries and storage keys.
    const NAME: &'static str;
    /// Every persisted field, the id field included.
    const FIELDS: &'static [FieldDef];

    /// Assigned id; `None` until first persisted.
    fn id(&self) -> Option<EntityId>;

    /// Called by the store when it assigns an id.
    fn set_id(&mut self, id: EntityId);

    /// One column per entry of `FIELDS`.
    fn to_row(&self) -> Row;

    /// Rebuilds the entity from a stored row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Default query path, aliased by the lowercased entity name.
    fn path() -> EntityPath<Self> {
        EntityPath::new(Self::NAME.to_lowercase())
    }
}

/// An aliased query source for entity `E` (`Member m`).
pub struct EntityPath<E> {
    alias: Cow<'static, str>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> EntityPath<E> {
    /// Path with the given alias.
    pub fn new(alias: impl Into<Cow<'static, str>>) -> Self {
        Self {
            alias: alias.into(),
            _marker: PhantomData,
        }
    }

    /// Alias used when rendering the query.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl<E> Clone for EntityPath<E> {
    fn clone(&self) -> Self {
        Self::new(self.alias.clone())
    }
}

impl<E> PartialEq for EntityPath<E> {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
    }
}

impl<E> fmt::Debug for EntityPath<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityPath({} {})", type_name::<E>(), self.alias)
    }
}

/// Runtime metadata for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Owning entity name
    pub entity: String,
    /// Column name
    pub name: String,
    /// Stored value type
    pub value_type: ValueType,
    /// Whether the field accepts null
    pub nullable: bool,
}

/// Runtime metadata for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity name used in queries
    pub name: String,
    /// Rust type name
    pub type_name: &'static str,
    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Describes entity `E` from its static field list.
    pub fn of<E: Entity>() -> Self {
        let fields = E::FIELDS
            .iter()
            .map(|def| FieldDescriptor {
                entity: E::NAME.to_string(),
                name: def.name.to_string(),
                value_type: def.value_type,
                nullable: def.nullable,
            })
            .collect();

        Self {
            name: E::NAME.to_string(),
            type_name: type_name::<E>(),
            fields,
        }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Checks that every field the query touches belongs to this entity.
    pub fn validate(&self, spec: &QuerySpec) -> Result<()> {
        if spec.source.entity != self.name {
            return Err(Error::InvalidArgument(format!(
                "query over {} validated against {}",
                spec.source.entity, self.name
            )));
        }

        for field in spec.referenced_fields() {
            if field.entity() != self.name || self.field(field.name()).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "{} has no field {}",
                    self.name,
                    field.name()
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
struct Registration {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    compute: fn() -> EntityDescriptor,
    cached: OnceLock<Arc<EntityDescriptor>>,
}

impl Registration {
    fn descriptor(&self) -> Arc<EntityDescriptor> {
        self.cached
            .get_or_init(|| {
                tracing::debug!(entity = self.name, "computing entity descriptor");
                Arc::new((self.compute)())
            })
            .clone()
    }
}

/// Registry of entity types.
///
/// Immutable once built, so it can be shared behind an `Arc` by any number
/// of stores and queries.
#[derive(Debug, Default)]
pub struct Schema {
    entries: Vec<Registration>,
    by_type: HashMap<TypeId, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl Schema {
    /// Starts an empty schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Descriptor of a registered entity type.
    pub fn describe<E: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        self.by_type
            .get(&TypeId::of::<E>())
            .map(|&idx| self.entries[idx].descriptor())
            .ok_or_else(|| Error::UnknownEntity(type_name::<E>().to_string()))
    }

    /// Descriptor of a registered entity, by entity name.
    pub fn describe_name(&self, name: &str) -> Result<Arc<EntityDescriptor>> {
        self.by_name
            .get(name)
            .map(|&idx| self.entries[idx].descriptor())
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// True if `E` is registered.
    pub fn contains<E: Entity>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<E>())
    }

    /// Registered entity names, in registration order.
    pub fn entity_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }
}

/// Collects entity registrations for a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<Registration>,
}

impl SchemaBuilder {
    /// Registers `E`. Registering the same type twice is a no-op.
    pub fn register<E: Entity>(mut self) -> Self {
        let type_id = TypeId::of::<E>();
        if !self.entries.iter().any(|e| e.type_id == type_id) {
            self.entries.push(Registration {
                name: E::NAME,
                type_id,
                type_name: type_name::<E>(),
                compute: EntityDescriptor::of::<E>,
                cached: OnceLock::new(),
            });
        }
        self
    }

    /// Finishes the registry.
    ///
    /// Fails if two different types claim the same entity name.
    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema::default();

        for (idx, entry) in self.entries.into_iter().enumerate() {
            if let Some(&existing) = schema.by_name.get(entry.name) {
                return Err(Error::InvalidArgument(format!(
                    "entity name {} registered by both {} and {}",
                    entry.name, schema.entries[existing].type_name, entry.type_name
                )));
            }
            schema.by_type.insert(entry.type_id, idx);
            schema.by_name.insert(entry.name, idx);
            schema.entries.push(entry);
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{Hello, Member, Team};

    #[derive(Debug, Clone, PartialEq)]
    struct Impostor;

    impl Entity for Impostor {
        const NAME: &'static str = "Member";
        const FIELDS: &'static [FieldDef] = &[];

        fn id(&self) -> Option<EntityId> {
            None
        }

        fn set_id(&mut self, _id: EntityId) {}

        fn to_row(&self) -> Row {
            Row::new()
        }

        fn from_row(_row: &Row) -> Result<Self> {
            Ok(Impostor)
        }
    }

    fn schema() -> Schema {
        Schema::builder()
            .register::<Member>()
            .register::<Team>()
            .build()
            .unwrap()
    }

    #[test]
    fn test_describe_is_memoized() {
        let schema = schema();
        let first = schema.describe::<Member>().unwrap();
        let second = schema.describe::<Member>().unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &schema.describe_name("Member").unwrap()));
    }

    #[test]
    fn test_describe_fields() {
        let member = schema().describe::<Member>().unwrap();
        assert_eq!(member.name, "Member");
        assert_eq!(member.field_names(), vec!["id", "username", "age", "team"]);

        let username = member.field("username").unwrap();
        assert_eq!(username.value_type, ValueType::String);
        assert!(username.nullable);
        assert_eq!(username.entity, "Member");

        let age = member.field("age").unwrap();
        assert_eq!(age.value_type, ValueType::Integer);
        assert!(!age.nullable);

        assert_eq!(
            member.field("team").unwrap().value_type,
            ValueType::Reference
        );
    }

    #[test]
    fn test_unknown_entity() {
        let schema = schema();
        assert!(matches!(
            schema.describe::<Hello>(),
            Err(Error::UnknownEntity(_))
        ));
        assert!(matches!(
            schema.describe_name("Order"),
            Err(Error::UnknownEntity(name)) if name == "Order"
        ));
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let schema = Schema::builder()
            .register::<Member>()
            .register::<Member>()
            .build()
            .unwrap();
        assert_eq!(schema.entity_names().collect::<Vec<_>>(), vec!["Member"]);
    }

    #[test]
    fn test_conflicting_names_rejected() {
        let result = Schema::builder()
            .register::<Member>()
            .register::<Impostor>()
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_default_path_alias() {
        assert_eq!(Member::path().alias(), "member");
        assert_eq!(EntityPath::<Member>::new("m").alias(), "m");
    }
}
