//! Fuzz target for GEFF metadata parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the metadata parser,
//! checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trackgeff::geff::GeffMetadata;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    if let Ok(metadata) = GeffMetadata::from_json_slice(data) {
        let _ = metadata.is_known_version();
        let _ = metadata.space_unit();
        let _ = metadata.time_unit();
    }
});
