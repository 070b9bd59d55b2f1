#![no_main]

use libfuzzer_sys::fuzz_target;
use querylite_core::Schema;
use querylite_store::{MemoryStore, StoreConfig};
use std::io::Write;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    // Limit input size
    if data.len() > 10_000_000 {
        return;
    }

    // Arbitrary bytes must load or fail with an error, never panic
    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let schema = Arc::new(Schema::default());
            let _ = MemoryStore::load(temp_file.path(), schema, StoreConfig::default());
        }
    }
});
