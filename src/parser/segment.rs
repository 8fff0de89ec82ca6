//! Segment types produced by the block parser.

use std::fmt;

/// Opening marker of a reasoning aside.
pub const THINK_OPEN: &str = "<think>";
/// Closing marker of a reasoning aside.
pub const THINK_CLOSE: &str = "</think>";
/// Code fence marker (both opening and closing).
pub const FENCE: &str = "```";

/// The kind of region a segment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Plain prose.
    Text,
    /// Fenced code.
    Code,
    /// A `<think>` aside emitted by reasoning models.
    Reasoning,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Reasoning => "reasoning",
        };
        f.write_str(name)
    }
}

/// A classified, contiguous span of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Region kind.
    pub kind: SegmentKind,
    /// Content with the recognized markers (and code language tag) stripped.
    pub content: String,
    /// Language tag of a code segment, if its first line carried one.
    pub language: Option<String>,
    /// Whether the closing marker was seen. Always `true` for text.
    pub closed: bool,
}

impl Segment {
    /// Create a text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Text,
            content: content.into(),
            language: None,
            closed: true,
        }
    }

    /// Create a code segment.
    pub fn code(content: impl Into<String>, language: Option<String>, closed: bool) -> Self {
        Self {
            kind: SegmentKind::Code,
            content: content.into(),
            language,
            closed,
        }
    }

    /// Create a reasoning segment.
    pub fn reasoning(content: impl Into<String>, closed: bool) -> Self {
        Self {
            kind: SegmentKind::Reasoning,
            content: content.into(),
            language: None,
            closed,
        }
    }

    /// Rebuild the source text this segment was cut from, markers included.
    ///
    /// Exact for closed segments. An open code segment whose language line
    /// has not been terminated yet gains a trailing newline after the tag.
    pub fn source(&self) -> String {
        match self.kind {
            SegmentKind::Text => self.content.clone(),
            SegmentKind::Code => {
                let mut out = String::with_capacity(self.content.len() + 16);
                out.push_str(FENCE);
                if let Some(language) = &self.language {
                    out.push_str(language);
                    out.push('\n');
                }
                out.push_str(&self.content);
                if self.closed {
                    out.push_str(FENCE);
                }
                out
            }
            SegmentKind::Reasoning => {
                let mut out = String::with_capacity(self.content.len() + 16);
                out.push_str(THINK_OPEN);
                out.push_str(&self.content);
                if self.closed {
                    out.push_str(THINK_CLOSE);
                }
                out
            }
        }
    }
}
