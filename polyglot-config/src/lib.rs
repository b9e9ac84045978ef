//! Settings and language-table loading for Polyglot.
//!
//! ```rust,ignore
//! use polyglot_config::{EnvLoader, RawTables, Settings};
//!
//! let settings = EnvLoader::default().settings(Settings::load("polyglot.toml")?)?;
//! let mut tables = RawTables::load_dir("locales/")?;
//! if let Some(code) = &settings.default_code {
//!     tables.prefer(code);
//! }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod tables;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{CodeMap, ScopeMap, Settings};
pub use tables::{RawRecord, RawTables};
