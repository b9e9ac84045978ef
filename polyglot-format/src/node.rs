//! Rich renderable nodes.

use serde::Serialize;
use std::collections::BTreeMap;

/// A non-text value that a formatted sequence can carry.
///
/// Placing a node into a sequence gives it a key derived from its
/// placeholder's position, so renderers that track list items by key see a
/// stable identity. `with_key` must leave `self` untouched.
pub trait RichNode: Clone {
    fn with_key(&self, key: String) -> Self;

    /// Plain-text rendering, used when a sequence is flattened.
    fn text_content(&self) -> String {
        String::new()
    }
}

/// Child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Element(Element),
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

impl From<Element> for Content {
    fn from(e: Element) -> Self {
        Content::Element(e)
    }
}

/// A minimal element tree: tag, optional key, string props and children.
///
/// ```rust,ignore
/// let link = Element::new("a").prop("href", "/terms").child("Terms");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Content>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key: None,
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Content>) -> Self {
        self.children.push(child.into());
        self
    }
}

impl RichNode for Element {
    fn with_key(&self, key: String) -> Self {
        Self {
            key: Some(key),
            ..self.clone()
        }
    }

    fn text_content(&self) -> String {
        self.children
            .iter()
            .map(|child| match child {
                Content::Text(text) => text.clone(),
                Content::Element(element) => element.text_content(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_key_is_shallow_relabel() {
        let original = Element::new("b").key("k").prop("class", "x").child("bold");
        let relabeled = original.with_key("3".to_string());

        assert_eq!(original.key.as_deref(), Some("k"));
        assert_eq!(relabeled.key.as_deref(), Some("3"));
        assert_eq!(relabeled.children, original.children);
        assert_eq!(relabeled.props, original.props);
    }

    #[test]
    fn test_text_content_is_recursive() {
        let node = Element::new("p")
            .child("Read the ")
            .child(Element::new("a").child("terms"))
            .child(".");
        assert_eq!(node.text_content(), "Read the terms.");
    }

    #[test]
    fn test_serializes_compactly() {
        let node = Element::new("i").child("x");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({ "tag": "i", "children": ["x"] }));
    }
}
