//! Error types for the store and the language bridge.

use thiserror::Error;

/// Why a mutation was refused. Rejections are logged and reported through
/// [`crate::Outcome`]; they never abort the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("\"{key}\" value cannot be undefined")]
    UndefinedValue { key: String },

    #[error("\"{key}\" value cannot be a function")]
    FunctionValue { key: String },

    #[error("\"{key}\" is a read-only function")]
    ReadOnlyField { key: String },

    #[error("\"{key}\" is not a field of this store")]
    UnknownField { key: String },

    #[error("\"{code}\" not found")]
    UnknownCode { code: String },
}

/// Errors raised while building a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("language table is empty")]
    EmptyTable,

    #[error("field \"{key}\" of language \"{code}\" is undefined")]
    UndefinedField { code: String, key: String },

    #[error("language \"{code}\" disagrees with \"{reference}\" on fields (missing: {missing:?}, extra: {extra:?})")]
    FieldMismatch {
        code: String,
        reference: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error(transparent)]
    Config(#[from] polyglot_config::ConfigError),

    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Failures reported by a [`crate::LangCodeBridge`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("language bridge is unavailable")]
    Unavailable,

    #[error("language bridge failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
