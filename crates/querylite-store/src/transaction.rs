//! Transaction scoping.
//!
//! A transaction keeps a copy of the tables taken at `begin`. Committing
//! drops the copy; rolling back, or dropping the guard without deciding,
//! puts it back. This gives tests rollback-by-default isolation.

use crate::error::StoreError;
use crate::MemoryStore;
use tracing::{debug, warn};

/// Guard for an open transaction on a [`MemoryStore`].
#[must_use = "dropping a transaction rolls it back"]
pub struct Transaction<'a> {
    store: &'a MemoryStore,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(store: &'a MemoryStore) -> Result<Self, StoreError> {
        let mut state = store.write_state()?;
        if state.backup.is_some() {
            return Err(StoreError::TransactionActive);
        }
        state.backup = Some(state.tables.clone());
        debug!(rows = state.tables.rows.len(), "transaction started");

        Ok(Self {
            store,
            finished: false,
        })
    }

    /// Keeps every change made since `begin`.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        let mut state = self.store.write_state()?;
        state.backup = None;
        debug!("transaction committed");
        Ok(())
    }

    /// Discards every change made since `begin`.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.restore()
    }

    fn restore(&self) -> Result<(), StoreError> {
        let mut state = self.store.write_state()?;
        if let Some(tables) = state.backup.take() {
            state.tables = tables;
        }
        debug!("transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("transaction dropped without commit, rolling back");
        if let Err(err) = self.restore() {
            warn!(error = %err, "rollback on drop failed");
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish()
    }
}
