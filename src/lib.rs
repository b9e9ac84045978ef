// Polyglot - reactive localized constants for Rust
//
// A store of per-language values that announces changes to its
// subscribers in debounced batches, and a formatter that fills
// `{placeholder}` templates with text or rich nodes.

// Re-export the store
pub use polyglot_store::*;

// Re-export the formatter
pub use polyglot_format::{Arg, Content, Element, Formatted, Piece, RichNode, format, format_named, number_text};

// Re-export logging
pub use polyglot_log;

#[cfg(feature = "config")]
pub use polyglot_config;

use serde_json::Value as Json;

/// Text of a scalar field: strings as-is, numbers as the formatter prints
/// them.
fn template_of(value: &Value) -> Option<String> {
    match value.as_data()? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => n.as_f64().map(number_text),
        _ => None,
    }
}

fn fill<N: RichNode>(template: String, args: &[Arg<N>]) -> Formatted<N> {
    if args.is_empty() {
        Formatted::Text(template)
    } else {
        format(&template, args)
    }
}

/// Look up `key` in the active language and fill its placeholders.
///
/// With no arguments the field is returned as text, untouched. Returns
/// `None` for unknown keys and for fields that are neither strings nor
/// numbers.
///
/// ```rust,ignore
/// let line = polyglot::translate::<Element>(&store, "items", &[3.into(), 10.into()]);
/// ```
pub fn translate<N: RichNode>(store: &ReactiveConstant, key: &str, args: &[Arg<N>]) -> Option<Formatted<N>> {
    let value = store.get(key)?;
    Some(fill(template_of(&value)?, args))
}

/// [`translate`] against the configured table of `code`, whatever the
/// active language is.
pub fn translate_in<N: RichNode>(
    store: &ReactiveConstant,
    key: &str,
    code: &str,
    args: &[Arg<N>],
) -> Option<Formatted<N>> {
    let value = store.get_value(key, code)?;
    Some(fill(template_of(&value)?, args))
}

/// Build a store from loaded settings and language tables.
#[cfg(feature = "config")]
pub fn from_config(
    settings: &polyglot_config::Settings,
    tables: polyglot_config::RawTables,
) -> Result<ReactiveConstant> {
    settings.validate()?;
    ReactiveConstant::builder(LanguageTable::from_raw(tables))
        .settings(settings)
        .build()
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Arg, Element, Formatted, LanguageTable, ListenerEvent, Outcome, ReactiveConstant, Snapshot,
        StoreError, Unsubscribe, Value, format, format_named, translate,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ReactiveConstant {
        ReactiveConstant::builder(
            LanguageTable::new()
                .with_json("en", json!({ "items": "Item {0} of {1}", "hello": "Hello {name}", "max": 5, "flag": true }))
                .with_json("zh", json!({ "items": "第{0}项，共{1}项", "hello": "你好，{name}", "max": 5, "flag": true })),
        )
        .scheduler(std::sync::Arc::new(ManualScheduler::new()))
        .build()
        .unwrap()
    }

    #[test]
    fn test_translate_positional_and_named() {
        let store = store();
        let items = translate::<Element>(&store, "items", &[3.into(), 10.into()]).unwrap();
        assert_eq!(items.into_text(), "Item 3 of 10");

        let hello = translate::<Element>(&store, "hello", &[Arg::map([("name", "Ann")])]).unwrap();
        assert_eq!(hello.as_text(), Some("Hello Ann"));
    }

    #[test]
    fn test_translate_without_args_is_raw() {
        let store = store();
        let raw = translate::<Element>(&store, "items", &[]).unwrap();
        assert_eq!(raw.as_text(), Some("Item {0} of {1}"));
        assert_eq!(translate::<Element>(&store, "max", &[]).unwrap().as_text(), Some("5"));
    }

    #[test]
    fn test_translate_unknown_or_non_scalar() {
        let store = store();
        assert!(translate::<Element>(&store, "nope", &[]).is_none());
        assert!(translate::<Element>(&store, "flag", &[]).is_none());
    }

    #[test]
    fn test_translate_follows_active_code() {
        let store = store();
        store.set_code("zh");
        let out = translate::<Element>(&store, "items", &[1.into(), 2.into()]).unwrap();
        assert_eq!(out.into_text(), "第1项，共2项");

        let en = translate_in::<Element>(&store, "items", "en", &[1.into(), 2.into()]).unwrap();
        assert_eq!(en.into_text(), "Item 1 of 2");
    }
}
