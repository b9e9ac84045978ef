// Environment variable loading

use crate::{ConfigError, Result, Settings};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Prefix of every variable the store reads.
pub const ENV_PREFIX: &str = "POLYGLOT";

/// Reads prefixed environment variables, optionally after loading a
/// `.env` file.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Variables carrying the prefix, keyed by the lowercased remainder
    /// (`POLYGLOT_DEBOUNCE_MS` becomes `debounce_ms`).
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        let head = format!("{}_", self.prefix);
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&head)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect()
    }

    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(format!("{}_{}", self.prefix, key.to_uppercase())).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Load a `.env` file into the process environment. Without a path the
    /// nearest `.env` is used when present.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(())
    }

    /// `base` with every recognised variable applied on top.
    pub fn settings(&self, mut base: Settings) -> Result<Settings> {
        let vars = self.load();
        if !vars.is_empty() {
            polyglot_log::debug!(
                target: "polyglot::config",
                "applying {} {} override(s)",
                vars.len(),
                self.prefix
            );
        }
        base.apply_overrides(&vars)?;
        Ok(base)
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}
