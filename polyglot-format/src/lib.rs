//! Placeholder formatting for localized templates.
//!
//! Templates carry `{placeholder}` markers filled from positional or named
//! arguments. Plain values produce text; a rich node anywhere turns the
//! result into an ordered sequence of pieces a renderer can key.
//!
//! ```rust,ignore
//! use polyglot_format::{Arg, Element, format, format_named};
//!
//! let text = format::<Element>("Item {0} of {1}", &[3.into(), 10.into()]).into_text();
//! // "Item 3 of 10"
//!
//! let seq = format("Hi {name}!", &[Arg::map([("name", Arg::node(Element::new("b").child("Ann")))])]);
//! // Sequence(["Hi ", <b key="1">Ann</b>, "!"])
//! ```

mod arg;
mod format;
mod node;

pub use arg::Arg;
pub use format::{Formatted, Piece, format, format_named, number_text};
pub use node::{Content, Element, RichNode};
