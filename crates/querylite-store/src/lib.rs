//! # querylite store
//!
//! An in-memory entity store that executes querylite queries.
//!
//! Rows live in an ordered key-value map (see the `codec` module for the
//! layout) guarded by an `RwLock`. Query execution decodes the rows of the
//! source entity, filters them with three-valued logic, sorts, pages and
//! projects them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
pub mod error;
mod snapshot;
pub mod transaction;

pub use error::StoreError;
pub use transaction::Transaction;

use querylite_core::eval::sort_rows;
use querylite_core::{
    Entity, EntityDescriptor, EntityId, Error, Projection, QuerySpec, Result, Row, Schema,
    StoreSession, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// First id handed out by `persist`
    pub first_id: i64,
    /// Upper bound on the rows one query may return
    pub max_result_rows: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            first_id: 1,
            max_result_rows: None,
        }
    }
}

impl StoreConfig {
    /// Sets the first id handed out. Must be positive.
    pub fn with_first_id(mut self, first_id: i64) -> Self {
        self.first_id = first_id;
        self
    }

    /// Caps the rows one query may return.
    pub fn with_max_result_rows(mut self, max: usize) -> Self {
        self.max_result_rows = Some(max);
        self
    }
}

/// Everything a snapshot captures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub rows: BTreeMap<Vec<u8>, Vec<u8>>,
    pub next_id: i64,
}

#[derive(Debug)]
pub(crate) struct State {
    pub tables: Tables,
    /// Copy taken by an open transaction
    pub backup: Option<Tables>,
}

/// In-memory entity store.
#[derive(Debug)]
pub struct MemoryStore {
    schema: Arc<Schema>,
    config: StoreConfig,
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store with the default configuration.
    pub fn new(schema: Arc<Schema>) -> Self {
        let config = StoreConfig::default();
        let tables = Tables {
            rows: BTreeMap::new(),
            next_id: config.first_id,
        };
        Self {
            schema,
            config,
            state: RwLock::new(State {
                tables,
                backup: None,
            }),
        }
    }

    /// Creates an empty store. Fails if `first_id` is not positive.
    pub fn with_config(schema: Arc<Schema>, config: StoreConfig) -> Result<Self> {
        let tables = Tables {
            rows: BTreeMap::new(),
            next_id: config.first_id,
        };
        Self::from_tables(schema, config, tables)
    }

    pub(crate) fn from_tables(
        schema: Arc<Schema>,
        config: StoreConfig,
        mut tables: Tables,
    ) -> Result<Self> {
        if config.first_id <= 0 {
            return Err(Error::InvalidArgument(format!(
                "first id must be positive: {}",
                config.first_id
            )));
        }
        tables.next_id = tables.next_id.max(config.first_id);

        Ok(Self {
            schema,
            config,
            state: RwLock::new(State {
                tables,
                backup: None,
            }),
        })
    }

    /// Schema the store was created with.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Inserts a new entity, assigning the next id when it has none.
    ///
    /// Fails with [`StoreError::Constraint`] when the id is already taken or
    /// a non-nullable field is null.
    pub fn persist<E: Entity>(&self, entity: &mut E) -> Result<EntityId> {
        let descriptor = self.schema.describe::<E>()?;
        let mut state = self.write_state()?;

        let id = match entity.id() {
            Some(id) => {
                check_id(id)?;
                id
            }
            None => EntityId(state.tables.next_id),
        };

        let key = codec::encode_key(E::NAME, id);
        if state.tables.rows.contains_key(&key) {
            return Err(StoreError::Constraint(format!("{}#{} already exists", E::NAME, id)).into());
        }

        let mut stored = entity.clone();
        stored.set_id(id);
        let value = encode_checked(&descriptor, &stored.to_row())?;

        state.tables.rows.insert(key, value);
        state.tables.next_id = state.tables.next_id.max(id.0.saturating_add(1));
        entity.set_id(id);

        debug!(entity = E::NAME, %id, "persisted");
        Ok(id)
    }

    /// Inserts or replaces an entity by id.
    ///
    /// An entity without an id is persisted as new.
    pub fn merge<E: Entity>(&self, entity: &E) -> Result<EntityId> {
        let Some(id) = entity.id() else {
            let mut fresh = entity.clone();
            return self.persist(&mut fresh);
        };
        check_id(id)?;

        let descriptor = self.schema.describe::<E>()?;
        let value = encode_checked(&descriptor, &entity.to_row())?;

        let mut state = self.write_state()?;
        state
            .tables
            .rows
            .insert(codec::encode_key(E::NAME, id), value);
        state.tables.next_id = state.tables.next_id.max(id.0.saturating_add(1));

        debug!(entity = E::NAME, %id, "merged");
        Ok(id)
    }

    /// Loads an entity by id.
    pub fn find<E: Entity>(&self, id: EntityId) -> Result<Option<E>> {
        let descriptor = self.schema.describe::<E>()?;
        let state = self.read_state()?;
        match state.tables.rows.get(&codec::encode_key(E::NAME, id)) {
            Some(bytes) => {
                let row = codec::decode_row(&descriptor, bytes)?;
                Ok(Some(E::from_row(&row)?))
            }
            None => Ok(None),
        }
    }

    /// Deletes an entity. Returns whether it existed.
    pub fn remove<E: Entity>(&self, id: EntityId) -> Result<bool> {
        self.schema.describe::<E>()?;
        let mut state = self.write_state()?;
        let removed = state
            .tables
            .rows
            .remove(&codec::encode_key(E::NAME, id))
            .is_some();
        debug!(entity = E::NAME, %id, removed, "remove");
        Ok(removed)
    }

    /// Total number of stored rows across all entities.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_state()?.tables.rows.len())
    }

    /// True when no entity is stored.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Starts a transaction. Only one can be open at a time.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::begin(self)?)
    }

    pub(crate) fn read_state(&self) -> std::result::Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    pub(crate) fn write_state(
        &self,
    ) -> std::result::Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Decoded rows of the query's source entity that match its predicate,
    /// in id order.
    fn matching_rows(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        let descriptor = self.schema.describe_name(&spec.source.entity)?;
        descriptor.validate(spec)?;
        if let Some(name) = spec.parameters().first() {
            return Err(Error::UnboundParameter(name.to_string()));
        }

        let state = self.read_state()?;
        let (start, end) = codec::entity_range(&descriptor.name);
        let mut rows = Vec::new();
        for (_, bytes) in state.tables.rows.range(start..end) {
            let row = codec::decode_row(&descriptor, bytes)?;
            if spec.predicate.as_ref().map_or(true, |p| p.matches(&row)) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl StoreSession for MemoryStore {
    fn execute(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        let mut rows = self.matching_rows(spec)?;
        sort_rows(&mut rows, &spec.order);

        let offset = spec.offset.map_or(0, saturating_usize);
        let limit = spec.limit.map_or(usize::MAX, saturating_usize);
        let rows: Vec<Row> = rows.into_iter().skip(offset).take(limit).collect();

        if let Some(max) = self.config.max_result_rows {
            if rows.len() > max {
                return Err(StoreError::ResourceLimit {
                    limit: max,
                    found: rows.len(),
                }
                .into());
            }
        }

        trace!(entity = %spec.source.entity, rows = rows.len(), "executed");
        Ok(match &spec.projection {
            Projection::Entity => rows,
            Projection::Fields(fields) => rows
                .into_iter()
                .map(|row| {
                    let mut projected = Row::new();
                    for field in fields {
                        let value = row.value(field.name()).cloned().unwrap_or(Value::Null);
                        projected.push(field.name(), value);
                    }
                    projected
                })
                .collect(),
        })
    }

    fn execute_count(&self, spec: &QuerySpec) -> Result<u64> {
        let matched = self.matching_rows(spec)?.len() as u64;
        let after_offset = matched.saturating_sub(spec.offset.unwrap_or(0));
        let count = spec.limit.map_or(after_offset, |limit| after_offset.min(limit));
        trace!(entity = %spec.source.entity, count, "counted");
        Ok(count)
    }
}

fn check_id(id: EntityId) -> Result<()> {
    if id.0 <= 0 {
        return Err(Error::InvalidArgument(format!(
            "entity ids must be positive: {}",
            id
        )));
    }
    Ok(())
}

/// Encodes a row after checking that non-nullable fields are set.
fn encode_checked(descriptor: &EntityDescriptor, row: &Row) -> Result<Vec<u8>> {
    for field in descriptor.fields.iter().filter(|f| !f.nullable) {
        if row.value(&field.name).map_or(true, Value::is_null) {
            return Err(StoreError::Constraint(format!(
                "{}.{} must not be null",
                descriptor.name, field.name
            ))
            .into());
        }
    }
    Ok(codec::encode_row(descriptor, row)?)
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
