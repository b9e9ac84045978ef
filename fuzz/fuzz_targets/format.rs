//! Fuzz target for placeholder formatting.
//!
//! Arbitrary templates and arguments must never panic, and text-only
//! arguments must always produce text.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use polyglot_format::{Arg, Element, Formatted, format};

#[derive(Debug, Arbitrary)]
enum FuzzArg {
    Text(String),
    Number(f64),
    Missing,
    Named(Vec<(String, String)>),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    template: String,
    args: Vec<FuzzArg>,
    with_node: bool,
}

fuzz_target!(|data: FuzzInput| {
    let mut args: Vec<Arg> = data
        .args
        .into_iter()
        .map(|arg| match arg {
            FuzzArg::Text(s) => Arg::Text(s),
            FuzzArg::Number(n) => Arg::Number(n),
            FuzzArg::Missing => Arg::Missing,
            FuzzArg::Named(pairs) => Arg::map(pairs),
        })
        .collect();

    if !data.with_node {
        assert!(matches!(format(&data.template, &args), Formatted::Text(_)));
        return;
    }

    args.push(Arg::node(Element::new("b")));
    let out = format(&data.template, &args);
    let _ = out.into_text();
});
