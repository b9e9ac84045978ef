//! Reactive localized constants.
//!
//! A [`ReactiveConstant`] holds one value record per language and exposes
//! the record of the active language as a live [`Snapshot`]:
//!
//! - **Reads** are synchronous: [`ReactiveConstant::get`], [`ReactiveConstant::text`].
//! - **Writes** go through an equality check; only real changes count.
//! - **Value subscribers** are notified through a debounced notifier, once
//!   per burst, optionally filtered by the keys they care about.
//! - **Code listeners** hear about every effective language switch right away.
//! - A **language bridge** can choose the starting language and be told
//!   about later switches.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use polyglot_store::{LanguageTable, ListenerEvent, ReactiveConstant};
//! use serde_json::json;
//!
//! let store = ReactiveConstant::new(
//!     LanguageTable::new()
//!         .with_json("en", json!({ "title": "Settings", "save": "Save" }))
//!         .with_json("zh", json!({ "title": "设置", "save": "保存" })),
//! )?;
//!
//! let _on_code = store.add_listener(ListenerEvent::ChangeCode, |code| println!("now {code}"));
//! let _on_title = store.subscribe(|s| println!("{:?}", s.text("title")), Some(&["title"]));
//!
//! store.set_code("zh");
//! ```

pub mod bridge;
pub mod debounce;
mod error;
pub mod scheduler;
mod store;
mod table;
pub mod token;
mod value;

pub use bridge::{BridgeBinding, BridgeConstants, LangCodeBridge, MemoryBridge, resolve_initial_code};
pub use debounce::{DebounceOptions, Debouncer};
pub use error::{BridgeError, Rejection, Result, StoreError};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use store::{ListenerEvent, Outcome, ReactiveConstant, ReactiveConstantBuilder, Unsubscribe};
pub use table::{FieldMismatch, LanguageTable};
pub use token::{DEFAULT_TOKEN_LENGTH, TokenPool, unique_token, unique_token_with};
pub use value::{Method, Snapshot, Value, ValueRecord};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        LanguageTable, ListenerEvent, Outcome, ReactiveConstant, Snapshot, StoreError, Unsubscribe,
        Value,
    };
}
