//! Loading per-language value records.
//!
//! A table is either one document keyed by language code:
//!
//! ```json
//! { "en": { "title": "Title" }, "zh": { "title": "标题" } }
//! ```
//!
//! or a directory holding one `<code>.json` / `<code>.toml` file per
//! language.

use crate::{ConfigError, ConfigLoader, FileFormat, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Field name to JSON value, for one language.
pub type RawRecord = Map<String, Value>;

/// Language records in configuration order. The first entry is the
/// language a store starts in when nothing else decides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    entries: Vec<(String, RawRecord)>,
}

impl RawTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a language, keeping its original position.
    pub fn insert(&mut self, code: impl Into<String>, record: RawRecord) {
        let code = code.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((code, record)),
        }
    }

    /// Interpret a `{code: {field: value}}` document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(languages) = value else {
            return Err(ConfigError::InvalidTable(
                "expected an object keyed by language code".to_string(),
            ));
        };

        let mut tables = Self::new();
        for (code, record) in languages {
            match record {
                Value::Object(fields) => tables.insert(code, fields),
                other => {
                    return Err(ConfigError::InvalidTable(format!(
                        "language `{}` must map to an object, found {}",
                        code,
                        kind_of(&other)
                    )));
                }
            }
        }
        Ok(tables)
    }

    /// Load a single table document.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        Self::from_value(value)
    }

    /// Load `<code>.json` and `<code>.toml` files from `dir`, ordered by
    /// file name. Other files are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Directory not found: {}", dir.display()),
            )));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let supported = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(FileFormat::from_extension)
                .is_some_and(|format| format != FileFormat::Env);
            if path.is_file() && supported {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tables = Self::new();
        for path in paths {
            let code = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| ConfigError::InvalidTable(format!("bad file name: {}", path.display())))?
                .to_string();

            if tables.contains(&code) {
                return Err(ConfigError::InvalidTable(format!(
                    "language `{}` defined by more than one file",
                    code
                )));
            }

            match ConfigLoader::auto(&path)?.load_file(&path)? {
                Value::Object(fields) => tables.insert(code, fields),
                other => {
                    return Err(ConfigError::InvalidTable(format!(
                        "{} must hold an object, found {}",
                        path.display(),
                        kind_of(&other)
                    )));
                }
            }
        }

        polyglot_log::debug!(
            target: "polyglot::config",
            "loaded {} language(s) from {}",
            tables.len(),
            dir.display()
        );
        Ok(tables)
    }

    /// Move `code` to the front. Returns false when it is not present.
    pub fn prefer(&mut self, code: &str) -> bool {
        match self.entries.iter().position(|(c, _)| c == code) {
            Some(index) => {
                let entry = self.entries.remove(index);
                self.entries.insert(0, entry);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|(c, _)| c == code)
    }

    pub fn get(&self, code: &str) -> Option<&RawRecord> {
        self.entries.iter().find(|(c, _)| c == code).map(|(_, r)| r)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawRecord)> {
        self.entries.iter().map(|(c, r)| (c.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RawTables {
    type Item = (String, RawRecord);
    type IntoIter = std::vec::IntoIter<(String, RawRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
