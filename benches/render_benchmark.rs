//! Render benchmark: Compare fast-path patching with slow-path rebuilds.

use chatwheel::parser::{parse, Segment};
use chatwheel::render::{BlockFactory, SegmentDiffRenderer, TerminalPainter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const RESPONSE: &str = "Here is the plan.\n<think>Check the input first.</think>\n\
                        ```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nAnd some closing prose.";

fn prepared(text: &str) -> (SegmentDiffRenderer<BlockFactory>, Vec<Segment>) {
    let mut renderer = SegmentDiffRenderer::new(BlockFactory::new());
    renderer.render_text(text);
    (renderer, parse(text))
}

fn render_fast_path(c: &mut Criterion) {
    // Same kinds, tail text grew by one word.
    let (mut renderer, _) = prepared(RESPONSE);
    let grown = parse(&format!("{RESPONSE} More"));

    c.bench_function("render_patch_tail", |b| {
        b.iter(|| renderer.render(black_box(&grown)));
    });
}

fn render_slow_path(c: &mut Criterion) {
    // Alternate between two kind sequences so every render rebuilds.
    let (mut renderer, closed) = prepared(RESPONSE);
    let open = parse("Here is the plan.\n<think>Check the in");

    c.bench_function("render_rebuild", |b| {
        b.iter(|| {
            renderer.render(black_box(&open));
            renderer.render(black_box(&closed));
        });
    });
}

fn render_streamed_response(c: &mut Criterion) {
    // Parse and render every prefix, as the scheduler does while streaming.
    let text = RESPONSE.repeat(8);
    let cuts: Vec<usize> = (1..=text.len()).filter(|&i| text.is_char_boundary(i)).collect();

    c.bench_function("render_stream_prefixes", |b| {
        b.iter(|| {
            let mut renderer = SegmentDiffRenderer::new(BlockFactory::new());
            for &cut in &cuts {
                black_box(renderer.render_text(&text[..cut]));
            }
        });
    });
}

fn paint_terminal(c: &mut Criterion) {
    let (renderer, _) = prepared(RESPONSE);
    let path = renderer.last_path().unwrap_or(chatwheel::RenderPath::Patched { updated: 0 });

    c.bench_function("paint_repaint", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(4096);
            let mut painter = TerminalPainter::new(80);
            painter
                .paint(&mut out, black_box(renderer.views()), path)
                .ok();
            out
        });
    });
}

criterion_group!(
    benches,
    render_fast_path,
    render_slow_path,
    render_streamed_response,
    paint_terminal,
);
criterion_main!(benches);
