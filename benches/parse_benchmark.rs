//! Parser benchmark: Measure segment parsing of a growing response.
//!
//! Parsing runs on every pacing tick, so its cost must stay linear in the
//! visible text.

use chatwheel::parse;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Build a response mixing prose, reasoning and code, roughly `len` bytes.
fn create_response(len: usize) -> String {
    let block = "Some prose about the problem at hand.\n\
                 <think>Consider the edge cases first.</think>\n\
                 ```rust\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n```\n";
    let mut text = String::with_capacity(len + block.len());
    while text.len() < len {
        text.push_str(block);
    }
    text
}

fn parse_plain_text(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(100);

    c.bench_function("parse_plain_4k", |b| b.iter(|| parse(black_box(&text))));
}

fn parse_mixed_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_mixed");

    for len in [1_024, 8_192, 65_536] {
        let text = create_response(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| parse(black_box(text)));
        });
    }

    group.finish();
}

fn parse_open_fence(c: &mut Criterion) {
    // Mid-stream: the last fence has not closed yet.
    let mut text = create_response(8_192);
    text.push_str("```python\nfor i in range(10):\n    print(i)");

    c.bench_function("parse_open_fence_8k", |b| b.iter(|| parse(black_box(&text))));
}

fn parse_every_prefix(c: &mut Criterion) {
    // Simulates one parse per tick over a whole 2k response.
    let text = create_response(2_048);
    let cuts: Vec<usize> = (0..=text.len())
        .step_by(8)
        .filter(|&i| text.is_char_boundary(i))
        .collect();

    c.bench_function("parse_every_prefix_2k", |b| {
        b.iter(|| {
            for &cut in &cuts {
                black_box(parse(&text[..cut]));
            }
        });
    });
}

criterion_group!(
    benches,
    parse_plain_text,
    parse_mixed_by_size,
    parse_open_fence,
    parse_every_prefix,
);
criterion_main!(benches);
