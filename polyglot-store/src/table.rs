//! The configured languages and their value records.

use crate::{Result, StoreError, Value, ValueRecord};
use polyglot_config::RawTables;
use serde_json::Value as Json;
use std::collections::{BTreeSet, HashMap};

/// Languages in configuration order, each with its value record.
///
/// The set of codes is fixed once a store is built from the table.
#[derive(Clone, Debug, Default)]
pub struct LanguageTable {
    codes: Vec<String>,
    records: HashMap<String, ValueRecord>,
}

/// Field-name differences between one language and the first one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMismatch {
    pub code: String,
    pub reference: String,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl From<FieldMismatch> for StoreError {
    fn from(m: FieldMismatch) -> Self {
        StoreError::FieldMismatch {
            code: m.code,
            reference: m.reference,
            missing: m.missing,
            extra: m.extra,
        }
    }
}

impl LanguageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<K, V>(mut self, code: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let record = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert(code, record);
        self
    }

    /// Builder-style insert of a JSON object. Non-object values are ignored
    /// with a warning.
    pub fn with_json(self, code: impl Into<String>, fields: Json) -> Self {
        let code = code.into();
        match fields {
            Json::Object(map) => self.with(code, map),
            other => {
                polyglot_log::warn!(
                    target: "polyglot::store",
                    "language \"{}\" ignored: expected an object, got {}",
                    code,
                    other
                );
                self
            }
        }
    }

    /// Add or replace a language. A replaced language keeps its position.
    pub fn insert(&mut self, code: impl Into<String>, record: ValueRecord) {
        let code = code.into();
        if !self.records.contains_key(&code) {
            self.codes.push(code.clone());
        }
        self.records.insert(code, record);
    }

    /// Parse `{code: {field: value}}`.
    pub fn from_json(value: Json) -> Result<Self> {
        Ok(Self::from_raw(RawTables::from_value(value)?))
    }

    pub fn from_raw(raw: RawTables) -> Self {
        raw.into_iter().fold(Self::new(), |table, (code, record)| table.with(code, record))
    }

    /// Move `code` to the front so it becomes the fallback language.
    pub fn prefer(&mut self, code: &str) -> bool {
        match self.codes.iter().position(|c| c == code) {
            Some(index) => {
                let code = self.codes.remove(index);
                self.codes.insert(0, code);
                true
            }
            None => false,
        }
    }

    pub fn record(&self, code: &str) -> Option<&ValueRecord> {
        self.records.get(code)
    }

    pub fn value(&self, key: &str, code: &str) -> Option<&Value> {
        self.records.get(code).and_then(|record| record.get(key))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.records.contains_key(code)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn first_code(&self) -> Option<&str> {
        self.codes.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Languages whose field names differ from the first language's.
    pub fn field_mismatches(&self) -> Vec<FieldMismatch> {
        let Some(reference) = self.first_code() else {
            return Vec::new();
        };
        let expected: BTreeSet<&str> = self.records[reference].keys().map(String::as_str).collect();

        self.codes
            .iter()
            .skip(1)
            .filter_map(|code| {
                let actual: BTreeSet<&str> = self.records[code].keys().map(String::as_str).collect();
                let missing: Vec<String> = expected.difference(&actual).map(|k| k.to_string()).collect();
                let extra: Vec<String> = actual.difference(&expected).map(|k| k.to_string()).collect();
                (!missing.is_empty() || !extra.is_empty()).then(|| FieldMismatch {
                    code: code.clone(),
                    reference: reference.to_string(),
                    missing,
                    extra,
                })
            })
            .collect()
    }

    /// First `(code, key)` holding [`Value::Undefined`].
    pub(crate) fn find_undefined(&self) -> Option<(&str, &str)> {
        self.codes.iter().find_map(|code| {
            self.records[code]
                .iter()
                .find(|(_, v)| v.is_undefined())
                .map(|(k, _)| (code.as_str(), k.as_str()))
        })
    }
}
