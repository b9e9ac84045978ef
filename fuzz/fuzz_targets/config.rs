//! Fuzz target for settings and language-table parsing.
//!
//! Malformed documents must come back as errors, never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use polyglot_config::{ConfigLoader, FileFormat, RawTables, Settings};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for format in [FileFormat::Json, FileFormat::Toml, FileFormat::Env] {
        if let Ok(value) = ConfigLoader::new(format).parse(text) {
            let _ = Settings::from_value(value.clone());
            let _ = RawTables::from_value(value);
        }
    }
});
