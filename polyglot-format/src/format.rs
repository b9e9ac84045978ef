//! Template substitution.

use crate::arg::Arg;
use crate::node::{Element, RichNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

const TARGET: &str = "polyglot::format";

/// `{` + one or more ASCII word characters or `|` + `}`.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[0-9A-Za-z_|]+\}").unwrap());

/// One element of a sequence result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Piece<N = Element> {
    Text(String),
    /// A numeric argument, kept as a number.
    Number(f64),
    Node(N),
    /// A placeholder nothing answered. Renders as nothing.
    Undefined,
}

/// Output of [`format`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Formatted<N = Element> {
    Text(String),
    /// Produced when any placeholder resolved to a rich node.
    Sequence(Vec<Piece<N>>),
}

impl<N: RichNode> Formatted<N> {
    pub fn is_sequence(&self) -> bool {
        matches!(self, Formatted::Sequence(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Formatted::Text(text) => Some(text),
            Formatted::Sequence(_) => None,
        }
    }

    /// Flatten to text. Nodes contribute their text content.
    pub fn into_text(self) -> String {
        match self {
            Formatted::Text(text) => text,
            Formatted::Sequence(pieces) => pieces
                .into_iter()
                .map(|piece| match piece {
                    Piece::Text(text) => text,
                    Piece::Number(n) => number_text(n),
                    Piece::Node(node) => node.text_content(),
                    Piece::Undefined => String::new(),
                })
                .collect(),
        }
    }
}

/// Template parts in order, with empty literal runs dropped.
enum Part<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn split(template: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for found in PLACEHOLDER.find_iter(template) {
        if found.start() > last {
            parts.push(Part::Literal(&template[last..found.start()]));
        }
        let text = found.as_str();
        parts.push(Part::Placeholder(&text[1..text.len() - 1]));
        last = found.end();
    }
    if last < template.len() {
        parts.push(Part::Literal(&template[last..]));
    }
    parts
}

/// Whether `arg` can stand in for a placeholder.
fn usable<N>(arg: &Arg<N>) -> bool {
    !matches!(arg, Arg::Missing | Arg::Map(_))
}

fn resolve<'a, N>(id: &str, args: &'a [Arg<N>]) -> Option<&'a Arg<N>> {
    let positional = id
        .parse::<usize>()
        .ok()
        .and_then(|index| args.get(index))
        .filter(|arg| usable(arg));
    if positional.is_some() {
        return positional;
    }

    match args.first() {
        Some(Arg::Map(map)) => map.get(id).filter(|arg| usable(arg)),
        _ => None,
    }
}

/// Number to text the way a browser prints it: shortest round-trip digits,
/// integers without a fraction, exponent form below `1e-6` and from `1e21`.
pub fn number_text(n: f64) -> String {
    let magnitude = n.abs();
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{:e}", n);
        if text.contains("e-") {
            text
        } else {
            text.replacen('e', "e+", 1)
        }
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Substitute `{placeholder}`s in `template`.
///
/// Each placeholder is looked up positionally first (`{0}` is `args[0]`),
/// then by name in a map passed as the first argument. Unanswered
/// placeholders render as nothing.
///
/// The result is text unless some placeholder resolved to a rich node; then
/// every part is returned in order as a [`Formatted::Sequence`], with each
/// node re-keyed by the placeholder's position among the non-empty parts.
/// A node from [`Arg::Nodes`] gets `"{position}.{n}"`.
///
/// ```rust,ignore
/// assert_eq!(format::<Element>("Item {0} of {1}", &[3.into(), 10.into()]).into_text(), "Item 3 of 10");
/// ```
pub fn format<N: RichNode>(template: &str, args: &[Arg<N>]) -> Formatted<N> {
    let mut rich = false;
    let mut pieces = Vec::new();

    for (index, part) in split(template).into_iter().enumerate() {
        let id = match part {
            Part::Literal(text) => {
                pieces.push(Piece::Text(text.to_string()));
                continue;
            }
            Part::Placeholder(id) => id,
        };

        match resolve(id, args) {
            Some(Arg::Text(text)) => pieces.push(Piece::Text(text.clone())),
            Some(Arg::Number(n)) => pieces.push(Piece::Number(*n)),
            Some(Arg::Node(node)) => {
                rich = true;
                pieces.push(Piece::Node(node.with_key(index.to_string())));
            }
            Some(Arg::Nodes(nodes)) => {
                rich = true;
                pieces.extend(
                    nodes
                        .iter()
                        .enumerate()
                        .map(|(n, node)| Piece::Node(node.with_key(format!("{}.{}", index, n)))),
                );
            }
            Some(Arg::Map(_)) | Some(Arg::Missing) | None => {
                polyglot_log::trace!(target: TARGET, "placeholder {{{}}} has no value", id);
                pieces.push(Piece::Undefined);
            }
        }
    }

    if rich {
        return Formatted::Sequence(pieces);
    }
    Formatted::Text(
        pieces
            .into_iter()
            .filter_map(|piece| match piece {
                Piece::Text(text) => Some(text),
                Piece::Number(n) => Some(number_text(n)),
                _ => None,
            })
            .collect(),
    )
}

/// [`format`] with named arguments only.
pub fn format_named<N, K, V>(template: &str, named: impl IntoIterator<Item = (K, V)>) -> Formatted<N>
where
    N: RichNode,
    K: Into<String>,
    V: Into<Arg<N>>,
{
    let map: HashMap<String, Arg<N>> = named.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    format(template, &[Arg::Map(map)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(template: &str, args: &[Arg]) -> String {
        match format(template, args) {
            Formatted::Text(text) => text,
            Formatted::Sequence(pieces) => panic!("expected text, got {:?}", pieces),
        }
    }

    #[test]
    fn test_named() {
        assert_eq!(text("Hello {name}", &[Arg::map([("name", "World")])]), "Hello World");
        let out: Formatted<Element> = format_named("{a}-{b}", [("a", "x"), ("b", "y")]);
        assert_eq!(out.as_text(), Some("x-y"));
    }

    #[test]
    fn test_positional() {
        assert_eq!(text("Item {0} of {1}", &[3.into(), 10.into()]), "Item 3 of 10");
        assert_eq!(text("{1}{0}{1}", &["a".into(), "b".into()]), "bab");
    }

    #[test]
    fn test_rich_node_switches_to_sequence() {
        let out = format("Hi {name}!", &[Arg::map([("name", Arg::node(Element::new("b").child("Ann")))])]);
        assert_eq!(
            out,
            Formatted::Sequence(vec![
                Piece::Text("Hi ".into()),
                Piece::Node(Element::new("b").key("1").child("Ann")),
                Piece::Text("!".into()),
            ])
        );
        assert_eq!(out.into_text(), "Hi Ann!");
    }

    #[test]
    fn test_nodes_get_distinct_keys() {
        let out = format("{0}", &[Arg::nodes([Element::new("i"), Element::new("u")])]);
        let Formatted::Sequence(pieces) = out else {
            panic!("expected a sequence");
        };
        let keys: Vec<_> = pieces
            .iter()
            .map(|p| match p {
                Piece::Node(n) => n.key.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![Some("0.0".to_string()), Some("0.1".to_string())]);
    }

    #[test]
    fn test_unresolved_placeholder() {
        assert_eq!(text("a{x}b", &[]), "ab");
        assert_eq!(text("a{2}b", &["only".into()]), "ab");
        assert_eq!(text("[{0}]", &[Arg::Missing]), "[]");

        let out = format("{0} {missing}", &[Arg::node(Element::new("hr"))]);
        assert_eq!(
            out,
            Formatted::Sequence(vec![
                Piece::Node(Element::new("hr").key("0")),
                Piece::Text(" ".into()),
                Piece::Undefined,
            ])
        );
    }

    #[test]
    fn test_positional_lookup_falls_back_to_map() {
        // `{0}` finds a map at args[0], which is not a value, so it reads map["0"].
        assert_eq!(text("{0}", &[Arg::map([("0", "zero")])]), "zero");
        assert_eq!(text("{0}", &[Arg::map([("x", "y")])]), "");
    }

    #[test]
    fn test_literal_braces_that_are_not_placeholders() {
        assert_eq!(text("{} {a b} {{0}}", &["z".into()]), "{} {a b} {z}");
        assert_eq!(text("", &[]), "");
        assert_eq!(text("no placeholders", &[]), "no placeholders");
    }

    #[test]
    fn test_index_counts_non_empty_parts() {
        // Adjacent placeholders leave no empty literal between them.
        let out = format("{0}{1}", &["a".into(), Arg::node(Element::new("b"))]);
        let Formatted::Sequence(pieces) = out else {
            panic!("expected a sequence");
        };
        assert_eq!(pieces[1], Piece::Node(Element::new("b").key("1")));
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text(3.0), "3");
        assert_eq!(number_text(-0.0), "0");
        assert_eq!(number_text(2.5), "2.5");
        assert_eq!(number_text(f64::NAN), "NaN");
        assert_eq!(number_text(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_text(1e20), "100000000000000000000");
        assert_eq!(number_text(1e21), "1e+21");
        assert_eq!(number_text(-2.5e30), "-2.5e+30");
        assert_eq!(number_text(0.000001), "0.000001");
        assert_eq!(number_text(1e-7), "1e-7");
        assert_eq!(number_text(1.5e-10), "1.5e-10");
    }

    #[test]
    fn test_number_stays_numeric_in_sequence() {
        let out = format("{0} {1}", &[Arg::node(Element::new("b")), 2.5.into()]);
        assert_eq!(
            out,
            Formatted::Sequence(vec![
                Piece::Node(Element::new("b").key("0")),
                Piece::Text(" ".into()),
                Piece::Number(2.5),
            ])
        );
        assert_eq!(out.into_text(), " 2.5");
    }
}
