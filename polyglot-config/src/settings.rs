//! Store settings.
//!
//! [`Settings`] gathers every knob the store exposes so it can be kept in a
//! settings file next to the language tables:
//!
//! ```toml
//! debounce_ms = 0
//! platform = "ios"
//! default_code = "en"
//!
//! [scope]
//! zh = ["zh-Hans", "zh-Hant"]
//!
//! [code_map.zh]
//! ios = "zh-Hans"
//! android = "zh-CN"
//! ```

use crate::{ConfigError, ConfigLoader, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

/// Maps each language code to the native-code substrings it claims
/// (`langScope`). Document order is kept; it decides which entry wins
/// when several match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated code replaces the earlier patterns
    /// but keeps its position.
    pub fn with(mut self, code: impl Into<String>, patterns: &[&str]) -> Self {
        self.insert(code, patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn insert(&mut self, code: impl Into<String>, patterns: Vec<String>) {
        let code = code.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = patterns,
            None => self.entries.push((code, patterns)),
        }
    }

    pub fn get(&self, code: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, p)| p.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(c, p)| (c.as_str(), p.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-code, per-platform override of the string handed to the native
/// language bridge (`langMap`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMap {
    entries: Vec<(String, HashMap<String, String>)>,
}

impl CodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: impl Into<String>, platform: impl Into<String>, native: impl Into<String>) -> Self {
        self.insert(code, platform, native);
        self
    }

    pub fn insert(&mut self, code: impl Into<String>, platform: impl Into<String>, native: impl Into<String>) {
        let code = code.into();
        let index = match self.entries.iter().position(|(c, _)| *c == code) {
            Some(index) => index,
            None => {
                self.entries.push((code, HashMap::new()));
                self.entries.len() - 1
            }
        };
        self.entries[index].1.insert(platform.into(), native.into());
    }

    /// Native code for `code` on `platform`, if one is configured.
    pub fn lookup(&self, code: &str, platform: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .and_then(|(_, platforms)| platforms.get(platform))
            .map(String::as_str)
    }

    /// The code to send to the bridge: the mapped value or `code` itself.
    pub fn resolve<'a>(&'a self, code: &'a str, platform: &str) -> &'a str {
        self.lookup(code, platform).unwrap_or(code)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deserializes a map into an ordered `Vec` of pairs.
struct OrderedVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map keyed by language code")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate language code `{}`", key)));
            }
            entries.push((key, value));
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for ScopeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(OrderedVisitor::<Vec<String>>(PhantomData))?;
        Ok(Self { entries })
    }
}

impl Serialize for ScopeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(c, p)| (c, p)))
    }
}

impl<'de> Deserialize<'de> for CodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries =
            deserializer.deserialize_map(OrderedVisitor::<HashMap<String, String>>(PhantomData))?;
        Ok(Self { entries })
    }
}

impl Serialize for CodeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(c, p)| (c, p)))
    }
}

fn default_token_length() -> usize {
    8
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}

/// Every tunable of a store instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Label used in log lines; a serial label is generated when absent
    pub mark: Option<String>,
    /// Debounce window for value notifications, in milliseconds
    pub debounce_ms: u64,
    /// Leading-edge debounce instead of trailing; delivery still waits for the next scheduler turn
    pub immediate: bool,
    /// Length of listener and subscriber tokens
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Refuse tables whose languages disagree on field names
    pub strict_fields: bool,
    /// Platform key used when looking up `code_map`
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Language moved to the front of a loaded table
    pub default_code: Option<String>,
    pub scope: ScopeMap,
    pub code_map: CodeMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mark: None,
            debounce_ms: 0,
            immediate: false,
            token_length: default_token_length(),
            strict_fields: false,
            platform: default_platform(),
            default_code: None,
            scope: ScopeMap::default(),
            code_map: CodeMap::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON or TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let value = ConfigLoader::auto(path.as_ref())?.load_file(path.as_ref())?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `POLYGLOT_*` overrides. Keys are the lowercased names without
    /// the prefix, as produced by [`crate::EnvLoader::load`].
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, raw) in vars {
            match key.as_str() {
                "mark" => self.mark = Some(raw.clone()),
                "debounce_ms" => self.debounce_ms = parse_setting(key, raw)?,
                "immediate" => self.immediate = parse_bool(key, raw)?,
                "token_length" => self.token_length = parse_setting(key, raw)?,
                "strict_fields" => self.strict_fields = parse_bool(key, raw)?,
                "platform" => self.platform = raw.clone(),
                "default_code" => self.default_code = Some(raw.clone()),
                _ => {}
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_length == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "token_length".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.platform.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "platform".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidSetting {
            key: key.to_string(),
            reason: format!("expected a boolean, got `{}`", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileFormat;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.debounce_ms, 0);
        assert_eq!(settings.token_length, 8);
        assert!(!settings.immediate);
        assert!(settings.scope.is_empty());
        assert_eq!(settings.platform, std::env::consts::OS);
    }

    #[test]
    fn test_toml_settings_keep_scope_order() {
        let value = ConfigLoader::new(FileFormat::Toml)
            .parse(
                r#"
                platform = "ios"

                [scope]
                zh = ["zh-Hans", "zh-Hant"]
                en = ["en"]

                [code_map.zh]
                ios = "zh-Hans"
                android = "zh-CN"
            "#,
            )
            .unwrap();
        let settings = Settings::from_value(value).unwrap();

        let codes: Vec<&str> = settings.scope.iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["zh", "en"]);
        assert_eq!(settings.code_map.resolve("zh", "ios"), "zh-Hans");
        assert_eq!(settings.code_map.resolve("zh", "web"), "zh");
        assert_eq!(settings.code_map.resolve("en", "ios"), "en");
        assert_eq!(settings.token_length, 8);
    }

    #[test]
    fn test_duplicate_scope_code_in_json_last_wins() {
        let value = ConfigLoader::new(FileFormat::Json)
            .parse(r#"{"scope": {"zh": ["zh"], "zh": ["zh-Hans"]}}"#)
            .unwrap();
        // serde_json collapses duplicate keys while parsing, the last wins
        let settings = Settings::from_value(value).unwrap();
        assert_eq!(settings.scope.get("zh"), Some(&["zh-Hans".to_string()][..]));
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        let vars = HashMap::from([
            ("debounce_ms".to_string(), "16".to_string()),
            ("immediate".to_string(), "true".to_string()),
            ("platform".to_string(), "android".to_string()),
            ("unrelated".to_string(), "ignored".to_string()),
        ]);
        settings.apply_overrides(&vars).unwrap();

        assert_eq!(settings.debounce_ms, 16);
        assert!(settings.immediate);
        assert_eq!(settings.platform, "android");
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut settings = Settings::default();
        let vars = HashMap::from([("token_length".to_string(), "eight".to_string())]);
        let err = settings.apply_overrides(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref key, .. } if key == "token_length"));
    }

    #[test]
    fn test_zero_token_length_invalid() {
        let value = serde_json::json!({ "token_length": 0 });
        assert!(Settings::from_value(value).is_err());
    }

    #[test]
    fn test_scope_builder_replaces_in_place() {
        let scope = ScopeMap::new()
            .with("zh", &["zh"])
            .with("en", &["en"])
            .with("zh", &["zh-Hans", "zh-Hant"]);

        assert_eq!(scope.len(), 2);
        assert_eq!(scope.iter().next().unwrap().0, "zh");
        assert_eq!(scope.get("zh").unwrap().len(), 2);
    }
}
