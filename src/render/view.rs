//! Segment views: the toolkit-facing side of the diff renderer.
//!
//! The renderer never touches a concrete widget. It talks to views through
//! [`SegmentView`] and creates or destroys them through a [`ViewFactory`],
//! so a retained-mode toolkit can back them with real widgets while an
//! immediate-mode host can use [`TextBlock`] and repaint from it.

use crate::parser::{Segment, SegmentKind};

/// A live, patchable view of one segment.
pub trait SegmentView {
    /// The segment kind this view was created for. Never changes.
    fn kind(&self) -> SegmentKind;

    /// The content currently displayed.
    fn content(&self) -> &str;

    /// The displayed language tag, for code views.
    fn language(&self) -> Option<&str> {
        None
    }

    /// Whether the view shows its segment's closing marker as seen.
    fn is_closed(&self) -> bool {
        false
    }

    /// Replace the displayed content with the segment's.
    fn update(&mut self, segment: &Segment);
}

/// Creates and destroys segment views.
pub trait ViewFactory {
    /// The view type this factory produces.
    type View: SegmentView;

    /// Create a fresh view for a segment.
    fn create(&mut self, segment: &Segment) -> Self::View;

    /// Tear a view down. The default simply drops it.
    fn destroy(&mut self, view: Self::View) {
        drop(view);
    }
}

/// A retained in-memory view of a segment.
///
/// Code content is stored trimmed, the way it is displayed. Every call to
/// [`SegmentView::update`] counts as one reflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    kind: SegmentKind,
    content: String,
    language: Option<String>,
    closed: bool,
    reflows: usize,
}

impl TextBlock {
    /// Create a block showing the given segment.
    pub fn new(segment: &Segment) -> Self {
        Self {
            kind: segment.kind,
            content: display_content(segment).to_string(),
            language: segment.language.clone(),
            closed: segment.closed,
            reflows: 0,
        }
    }

    /// Number of in-place updates since creation.
    pub const fn reflows(&self) -> usize {
        self.reflows
    }
}

impl SegmentView for TextBlock {
    fn kind(&self) -> SegmentKind {
        self.kind
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn update(&mut self, segment: &Segment) {
        debug_assert_eq!(self.kind, segment.kind);
        self.content.clear();
        self.content.push_str(display_content(segment));
        self.language.clone_from(&segment.language);
        self.closed = segment.closed;
        self.reflows += 1;
    }
}

/// Content as a view displays it: code bodies are trimmed.
fn display_content(segment: &Segment) -> &str {
    match segment.kind {
        SegmentKind::Code => segment.content.trim(),
        SegmentKind::Text | SegmentKind::Reasoning => &segment.content,
    }
}

/// Factory for [`TextBlock`] views that keeps lifetime counters.
#[derive(Debug, Clone, Default)]
pub struct BlockFactory {
    created: usize,
    destroyed: usize,
}

impl BlockFactory {
    /// Create a new factory.
    pub const fn new() -> Self {
        Self {
            created: 0,
            destroyed: 0,
        }
    }

    /// Total views created.
    pub const fn created(&self) -> usize {
        self.created
    }

    /// Total views destroyed.
    pub const fn destroyed(&self) -> usize {
        self.destroyed
    }
}

impl ViewFactory for BlockFactory {
    type View = TextBlock;

    fn create(&mut self, segment: &Segment) -> TextBlock {
        self.created += 1;
        TextBlock::new(segment)
    }

    fn destroy(&mut self, view: TextBlock) {
        self.destroyed += 1;
        drop(view);
    }
}
