//! Fuzz target for model JSON parsing.
//!
//! Parsed models are validated and exported to an in-memory store, so the
//! codec sees whatever shapes the parser lets through.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trackgeff::geff::{export, import, ExportOptions, ImportOptions};
use trackgeff::model::io_json::from_json_slice;
use trackgeff::store::MemoryStore;
use trackgeff::validation::{validate_model, ValidateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(model) = from_json_slice(data) else {
        return;
    };
    let _ = validate_model(&model, &ValidateOptions::default());

    let mut store = MemoryStore::new();
    if export(&model, &mut store, &ExportOptions::default()).is_ok() {
        let _ = import(&store, &ImportOptions::default());
    }
});
