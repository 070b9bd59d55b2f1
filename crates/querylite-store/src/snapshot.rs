// Snapshot file format
//
// [magic: 8 bytes "QLSNAP01"] [length: u32 LE] [bincode(Tables)] [crc32: u32 LE]
//
// The CRC covers the payload only. Files are written to a sibling temp
// file first and renamed into place.

use crate::error::StoreError;
use crate::{MemoryStore, StoreConfig, Tables};
use crc32fast::Hasher;
use querylite_core::Schema;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const MAGIC: &[u8; 8] = b"QLSNAP01";
const HEADER_LEN: usize = MAGIC.len() + 4;
const TRAILER_LEN: usize = 4;

pub(crate) fn encode(tables: &Tables) -> Result<Vec<u8>, StoreError> {
    let payload = bincode::serialize(tables)?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Corrupt(format!("payload of {} bytes", payload.len())))?;

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

pub(crate) fn decode(data: &[u8]) -> Result<Tables, StoreError> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(StoreError::Corrupt(format!(
            "file of {} bytes is too short",
            data.len()
        )));
    }
    if &data[..MAGIC.len()] != MAGIC {
        return Err(StoreError::Corrupt("bad magic".to_string()));
    }

    let length = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let expected_len = HEADER_LEN + length + TRAILER_LEN;
    if data.len() != expected_len {
        return Err(StoreError::Corrupt(format!(
            "expected {} bytes, found {}",
            expected_len,
            data.len()
        )));
    }

    let payload = &data[HEADER_LEN..HEADER_LEN + length];
    let crc_offset = HEADER_LEN + length;
    let expected_crc = u32::from_le_bytes([
        data[crc_offset],
        data[crc_offset + 1],
        data[crc_offset + 2],
        data[crc_offset + 3],
    ]);

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let actual_crc = hasher.finalize();
    if actual_crc != expected_crc {
        return Err(StoreError::Corrupt(format!(
            "CRC mismatch: expected {}, got {}",
            expected_crc, actual_crc
        )));
    }

    Ok(bincode::deserialize(payload)?)
}

impl MemoryStore {
    /// Writes the current tables to `path`.
    ///
    /// Changes of an open transaction are included.
    pub fn save(&self, path: impl AsRef<Path>) -> querylite_core::Result<()> {
        let path = path.as_ref();
        let frame = {
            let state = self.read_state()?;
            encode(&state.tables)?
        };

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &frame).map_err(StoreError::from)?;
        fs::rename(&tmp, path).map_err(StoreError::from)?;

        info!(path = %path.display(), bytes = frame.len(), "snapshot saved");
        Ok(())
    }

    /// Opens a store from a file written by [`save`](Self::save).
    pub fn load(
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        config: StoreConfig,
    ) -> querylite_core::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(StoreError::from)?;
        let tables = decode(&data)?;
        debug!(path = %path.display(), rows = tables.rows.len(), "snapshot loaded");
        Self::from_tables(schema, config, tables)
    }
}
