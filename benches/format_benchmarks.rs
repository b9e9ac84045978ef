use criterion::{Criterion, criterion_group, criterion_main};
use polyglot::{Arg, Element, format, format_named};
use std::hint::black_box;

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");

    group.bench_function("positional", |b| {
        let args: [Arg; 2] = [3.into(), 10.into()];
        b.iter(|| format(black_box("Item {0} of {1}"), black_box(&args)))
    });

    group.bench_function("named", |b| {
        b.iter(|| {
            format_named::<Element, _, _>(
                black_box("Hello {name}, you have {count} messages"),
                [("name", Arg::from("Ann")), ("count", Arg::from(12))],
            )
        })
    });

    group.bench_function("rich_node", |b| {
        let link = Element::new("a").prop("href", "/terms").child("terms");
        let args = [Arg::map([("link", Arg::node(link))])];
        b.iter(|| format(black_box("Read the {link} before continuing."), black_box(&args)))
    });

    group.bench_function("long_template", |b| {
        let template = "{0} ".repeat(200);
        let args: [Arg; 1] = ["word".into()];
        b.iter(|| format(black_box(&template), black_box(&args)))
    });

    group.finish();
}

criterion_group!(benches, bench_format);
criterion_main!(benches);
