//! Block Parser: Split a message into text, code and reasoning segments.
//!
//! The parser is a pure function over the whole accumulated text. It is
//! called on every pacing tick, so it makes a single forward pass and never
//! fails: unterminated markers produce an open segment that runs to the end
//! of the input.
//!
//! # Marker precedence
//!
//! Reasoning asides are split first, code fences second. A `<think>` marker
//! that appears inside an unterminated code fence therefore opens a
//! reasoning segment and cuts the code segment short. Fences inside a
//! reasoning aside are part of the aside's content.
//!
//! ```rust
//! use chatwheel::parser::{parse, SegmentKind};
//!
//! let segments = parse("<think>hmm</think>Use ```rust\nfn main() {}\n```");
//! let kinds: Vec<_> = segments.iter().map(|s| s.kind).collect();
//! assert_eq!(kinds, [SegmentKind::Reasoning, SegmentKind::Text, SegmentKind::Code]);
//! ```

mod segment;

pub use segment::{Segment, SegmentKind, FENCE, THINK_CLOSE, THINK_OPEN};

/// Language tags at or above this length are treated as code.
const MAX_LANGUAGE_LEN: usize = 20;

/// Parse `text` into an ordered sequence of segments.
///
/// Blank text between structured segments is dropped. A message that is
/// entirely blank yields a single text segment so callers always have
/// something to render.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(THINK_OPEN) {
        split_code(&rest[..open], &mut segments);
        let body = &rest[open + THINK_OPEN.len()..];
        if let Some(close) = body.find(THINK_CLOSE) {
            segments.push(Segment::reasoning(&body[..close], true));
            rest = &body[close + THINK_CLOSE.len()..];
        } else {
            segments.push(Segment::reasoning(body, false));
            rest = "";
            break;
        }
    }
    split_code(rest, &mut segments);

    if segments.is_empty() {
        segments.push(Segment::text(text));
    }
    segments
}

/// Split a region that contains no reasoning markers on code fences.
fn split_code(region: &str, out: &mut Vec<Segment>) {
    let mut rest = region;

    while let Some(open) = rest.find(FENCE) {
        push_text(&rest[..open], out);
        let body = &rest[open + FENCE.len()..];
        if let Some(close) = body.find(FENCE) {
            out.push(code_segment(&body[..close], true));
            rest = &body[close + FENCE.len()..];
        } else {
            out.push(code_segment(body, false));
            return;
        }
    }
    push_text(rest, out);
}

fn push_text(text: &str, out: &mut Vec<Segment>) {
    if !text.trim().is_empty() {
        out.push(Segment::text(text));
    }
}

/// Build a code segment, lifting a language tag off the first line.
fn code_segment(body: &str, closed: bool) -> Segment {
    match body.find('\n') {
        Some(eol) if is_language_tag(&body[..eol]) => {
            Segment::code(&body[eol + 1..], Some(body[..eol].to_string()), closed)
        }
        // Still typing the tag line of an open fence.
        None if !closed && is_language_tag(body) => {
            Segment::code("", Some(body.to_string()), false)
        }
        _ => Segment::code(body, None, closed),
    }
}

fn is_language_tag(line: &str) -> bool {
    !line.is_empty()
        && line.len() < MAX_LANGUAGE_LEN
        && line.chars().all(char::is_alphanumeric)
}
