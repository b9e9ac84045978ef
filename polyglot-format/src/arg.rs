//! Placeholder arguments.

use crate::node::Element;
use serde_json::Value as Json;
use std::collections::HashMap;

/// A value supplied for placeholders.
///
/// A `Map` in first position also serves named placeholders: `{name}` reads
/// `map["name"]` when no positional argument answers it.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<N = Element> {
    Text(String),
    Number(f64),
    Node(N),
    /// A node that expands into several children.
    Nodes(Vec<N>),
    Map(HashMap<String, Arg<N>>),
    /// Explicitly absent. Renders as nothing.
    Missing,
}

impl<N> Arg<N> {
    pub fn node(node: N) -> Self {
        Arg::Node(node)
    }

    pub fn nodes(nodes: impl IntoIterator<Item = N>) -> Self {
        Arg::Nodes(nodes.into_iter().collect())
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Arg<N>>,
    {
        Arg::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Arg::Missing)
    }

    pub fn is_rich(&self) -> bool {
        matches!(self, Arg::Node(_) | Arg::Nodes(_))
    }

    /// Convert JSON. Objects become maps, `null` becomes `Missing`, arrays
    /// and booleans become their JSON text.
    pub fn from_json(value: Json) -> Self {
        match value {
            Json::Null => Arg::Missing,
            Json::String(s) => Arg::Text(s),
            Json::Number(n) => n.as_f64().map(Arg::Number).unwrap_or(Arg::Missing),
            Json::Object(map) => Arg::Map(map.into_iter().map(|(k, v)| (k, Arg::from_json(v))).collect()),
            other => Arg::Text(other.to_string()),
        }
    }
}

impl<N> From<&str> for Arg<N> {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl<N> From<String> for Arg<N> {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl<N> From<&String> for Arg<N> {
    fn from(s: &String) -> Self {
        Arg::Text(s.clone())
    }
}

macro_rules! number_arg {
    ($($t:ty),*) => {
        $(
            impl<N> From<$t> for Arg<N> {
                fn from(n: $t) -> Self {
                    Arg::Number(n as f64)
                }
            }
        )*
    };
}

number_arg!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl<N> From<Option<Arg<N>>> for Arg<N> {
    fn from(arg: Option<Arg<N>>) -> Self {
        arg.unwrap_or(Arg::Missing)
    }
}

impl<N> From<Json> for Arg<N> {
    fn from(value: Json) -> Self {
        Arg::from_json(value)
    }
}
