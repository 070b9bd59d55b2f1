// Key and row encoding
//
// Key:   [entity name bytes] [0x00] [id: u64 BE]
// Value: bincode(Vec<Value>) in the entity's declared field order
//
// Big-endian ids keep a prefix scan in id order, which is also insertion
// order for generated ids.

use crate::error::StoreError;
use querylite_core::{EntityDescriptor, EntityId, Row, Value};

const SEPARATOR: u8 = 0x00;

/// Storage key of one entity row.
pub(crate) fn encode_key(entity: &str, id: EntityId) -> Vec<u8> {
    let mut key = Vec::with_capacity(entity.len() + 9);
    key.extend_from_slice(entity.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(&(id.0 as u64).to_be_bytes());
    key
}

/// Half-open key range covering every row of `entity`.
pub(crate) fn entity_range(entity: &str) -> (Vec<u8>, Vec<u8>) {
    let mut start = entity.as_bytes().to_vec();
    start.push(SEPARATOR);
    let mut end = entity.as_bytes().to_vec();
    end.push(SEPARATOR + 1);
    (start, end)
}

/// Id stored in the last eight bytes of a key.
pub(crate) fn decode_key_id(key: &[u8]) -> Result<EntityId, StoreError> {
    let tail = key
        .len()
        .checked_sub(8)
        .and_then(|start| key.get(start..))
        .ok_or_else(|| StoreError::Corrupt(format!("key of {} bytes", key.len())))?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(tail);
    Ok(EntityId(u64::from_be_bytes(bytes) as i64))
}

/// Encodes `row` in the descriptor's field order; missing columns are null.
pub(crate) fn encode_row(descriptor: &EntityDescriptor, row: &Row) -> Result<Vec<u8>, StoreError> {
    let values: Vec<&Value> = descriptor
        .fields
        .iter()
        .map(|field| row.value(&field.name).unwrap_or(&Value::Null))
        .collect();
    Ok(bincode::serialize(&values)?)
}

pub(crate) fn decode_row(descriptor: &EntityDescriptor, bytes: &[u8]) -> Result<Row, StoreError> {
    let values: Vec<Value> = bincode::deserialize(bytes)?;
    if values.len() != descriptor.fields.len() {
        return Err(StoreError::Corrupt(format!(
            "{} row has {} values, expected {}",
            descriptor.name,
            values.len(),
            descriptor.fields.len()
        )));
    }
    let mut row = Row::new();
    for (field, value) in descriptor.fields.iter().zip(values) {
        row.push(field.name.clone(), value);
    }
    Ok(row)
}
