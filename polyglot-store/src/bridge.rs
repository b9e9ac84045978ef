//! The device-level language preference.
//!
//! A host platform may report the user's preferred language and accept
//! updates when the app switches language. The store treats it as
//! best-effort: failures are logged, never propagated.

use crate::BridgeError;
use parking_lot::Mutex;
use polyglot_config::{CodeMap, ScopeMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Values the bridge reports once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConstants {
    pub lang_code: String,
}

/// Access to the platform's language preference.
pub trait LangCodeBridge: Send + Sync {
    /// Startup constants, or `None` when the platform reports nothing.
    fn constants(&self) -> Option<BridgeConstants>;

    /// Persist `code` as the preferred language.
    fn set_lang_code(&self, code: &str) -> Result<(), BridgeError>;
}

/// A bridge plus the maps that translate between store codes and the
/// platform's codes.
#[derive(Clone)]
pub struct BridgeBinding {
    bridge: Arc<dyn LangCodeBridge>,
    scope: ScopeMap,
    code_map: CodeMap,
    platform: String,
}

impl BridgeBinding {
    pub fn new(bridge: Arc<dyn LangCodeBridge>) -> Self {
        Self {
            bridge,
            scope: ScopeMap::default(),
            code_map: CodeMap::default(),
            platform: std::env::consts::OS.to_string(),
        }
    }

    pub fn scope(mut self, scope: ScopeMap) -> Self {
        self.scope = scope;
        self
    }

    pub fn code_map(mut self, code_map: CodeMap) -> Self {
        self.code_map = code_map;
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn native_code(&self) -> Option<String> {
        self.bridge
            .constants()
            .map(|constants| constants.lang_code)
            .filter(|code| !code.is_empty())
    }

    /// Starting language for a store configured with `codes`.
    pub fn initial_code(&self, codes: &[String]) -> Option<String> {
        resolve_initial_code(codes, self.native_code().as_deref(), &self.scope)
    }

    /// Code handed to the bridge for store code `code`.
    pub fn mapped_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.code_map.resolve(code, &self.platform)
    }

    /// Tell the bridge about `code`. Errors and panics are logged.
    pub fn push(&self, code: &str, mark: &str) {
        let native = self.mapped_code(code);
        let result = catch_unwind(AssertUnwindSafe(|| self.bridge.set_lang_code(native)));
        match result {
            Ok(Ok(())) => {
                polyglot_log::debug!(target: "polyglot::bridge", "{} bridge now at \"{}\"", mark, native);
            }
            Ok(Err(err)) => {
                polyglot_log::error!(target: "polyglot::bridge", "{} setLangCode({}) error: {}", mark, code, err);
            }
            Err(payload) => {
                polyglot_log::error!(
                    target: "polyglot::bridge",
                    "{} setLangCode({}) error: {}",
                    mark,
                    code,
                    crate::store::panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl std::fmt::Debug for BridgeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeBinding")
            .field("scope", &self.scope)
            .field("code_map", &self.code_map)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Pick the starting language.
///
/// 1. A native code equal to a configured code wins.
/// 2. Otherwise every scope entry is scanned; each pattern contained in
///    the native code selects its language, and the last selection stands.
/// 3. Otherwise the first configured code.
///
/// Returns `None` only when `codes` is empty.
pub fn resolve_initial_code(codes: &[String], native: Option<&str>, scope: &ScopeMap) -> Option<String> {
    let fallback = codes.first()?.clone();
    let Some(native) = native.filter(|n| !n.is_empty()) else {
        return Some(fallback);
    };

    if codes.iter().any(|c| c == native) {
        return Some(native.to_string());
    }

    let mut chosen = None;
    for (code, patterns) in scope.iter() {
        if !codes.iter().any(|c| c == code) {
            continue;
        }
        for pattern in patterns {
            if native.contains(pattern.as_str()) {
                chosen = Some(code);
            }
        }
    }

    Some(chosen.map(str::to_string).unwrap_or(fallback))
}

/// An in-process bridge that records every update.
#[derive(Debug, Default)]
pub struct MemoryBridge {
    native: Option<String>,
    history: Mutex<Vec<String>>,
    failing: bool,
}

impl MemoryBridge {
    pub fn new(native: Option<&str>) -> Self {
        Self {
            native: native.map(str::to_string),
            ..Self::default()
        }
    }

    /// A bridge whose `set_lang_code` always fails.
    pub fn failing(native: Option<&str>) -> Self {
        Self {
            failing: true,
            ..Self::new(native)
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl LangCodeBridge for MemoryBridge {
    fn constants(&self) -> Option<BridgeConstants> {
        self.native.clone().map(|lang_code| BridgeConstants { lang_code })
    }

    fn set_lang_code(&self, code: &str) -> Result<(), BridgeError> {
        if self.failing {
            return Err(BridgeError::Failed(format!("cannot persist \"{}\"", code)));
        }
        self.history.lock().push(code.to_string());
        Ok(())
    }
}
