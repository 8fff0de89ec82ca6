//! Diff Renderer: Patch segment views in place or rebuild them.
//!
//! Every pacing tick re-parses the visible text and hands the segments to
//! [`SegmentDiffRenderer::render`]. The renderer compares the new kind
//! sequence against the live views:
//!
//! 1. **Fast path**: same count and same kind at every position. Views are
//!    patched in place; nothing is created or destroyed.
//! 2. **Slow path**: anything else. Every view is destroyed and one fresh
//!    view is created per segment.
//!
//! While a response streams, only the tail text grows, so nearly every tick
//! takes the fast path. The slow path fires at structural transitions: a
//! fence or aside opening or closing.

use super::view::{SegmentView, ViewFactory};
use crate::parser::{self, Segment, SegmentKind};
use tracing::trace;

/// Which path a render took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Views were patched in place.
    Patched {
        /// Number of views whose content was replaced.
        updated: usize,
    },
    /// All views were torn down and recreated.
    Rebuilt {
        /// Number of views destroyed.
        destroyed: usize,
        /// Number of views created.
        created: usize,
    },
}

impl RenderPath {
    /// Whether this render took the fast path.
    pub const fn is_fast(&self) -> bool {
        matches!(self, Self::Patched { .. })
    }
}

/// Check whether `segments` can be applied to views of `kinds` in place.
pub fn is_fast_path<I>(kinds: I, segments: &[Segment]) -> bool
where
    I: IntoIterator<Item = SegmentKind>,
    I::IntoIter: ExactSizeIterator,
{
    let kinds = kinds.into_iter();
    kinds.len() == segments.len() && kinds.zip(segments).all(|(kind, seg)| kind == seg.kind)
}

/// Observer notified after every render.
pub type RenderObserver = Box<dyn FnMut(RenderPath) + Send>;

/// Live view state of one message.
pub struct SegmentDiffRenderer<F: ViewFactory> {
    /// Creates and destroys views.
    factory: F,
    /// One view per segment, in document order.
    views: Vec<F::View>,
    /// Outcome of the most recent render.
    last_path: Option<RenderPath>,
    /// Optional render notification hook.
    observer: Option<RenderObserver>,
}

impl<F: ViewFactory> SegmentDiffRenderer<F> {
    /// Create an empty renderer.
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            views: Vec::new(),
            last_path: None,
            observer: None,
        }
    }

    /// Install an observer called with the path of every render.
    pub fn set_observer(&mut self, observer: impl FnMut(RenderPath) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Current views, in document order.
    pub fn views(&self) -> &[F::View] {
        &self.views
    }

    /// The factory backing this renderer.
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// Outcome of the most recent render.
    pub const fn last_path(&self) -> Option<RenderPath> {
        self.last_path
    }

    /// Parse `text` and render the result.
    pub fn render_text(&mut self, text: &str) -> RenderPath {
        let segments = parser::parse(text);
        self.render(&segments)
    }

    /// Bring the views in line with `segments`.
    pub fn render(&mut self, segments: &[Segment]) -> RenderPath {
        let path = if is_fast_path(self.views.iter().map(SegmentView::kind), segments) {
            self.patch(segments)
        } else {
            self.rebuild(segments)
        };

        trace!(?path, segments = segments.len(), "rendered message");
        self.last_path = Some(path);
        if let Some(observer) = self.observer.as_mut() {
            observer(path);
        }
        path
    }

    fn patch(&mut self, segments: &[Segment]) -> RenderPath {
        let mut updated = 0;
        for (view, segment) in self.views.iter_mut().zip(segments) {
            if needs_update(view, segment) {
                view.update(segment);
                updated += 1;
            }
        }
        RenderPath::Patched { updated }
    }

    fn rebuild(&mut self, segments: &[Segment]) -> RenderPath {
        let destroyed = self.views.len();
        for view in self.views.drain(..) {
            self.factory.destroy(view);
        }
        self.views
            .extend(segments.iter().map(|segment| self.factory.create(segment)));

        RenderPath::Rebuilt {
            destroyed,
            created: segments.len(),
        }
    }
}

/// Code views are only reflowed when the trimmed body or tag changed.
fn needs_update<V: SegmentView>(view: &V, segment: &Segment) -> bool {
    match segment.kind {
        SegmentKind::Code => {
            view.content().trim() != segment.content.trim()
                || view.language() != segment.language.as_deref()
                || view.is_closed() != segment.closed
        }
        SegmentKind::Text | SegmentKind::Reasoning => true,
    }
}

impl<F: ViewFactory> std::fmt::Debug for SegmentDiffRenderer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentDiffRenderer")
            .field("views", &self.views.len())
            .field("last_path", &self.last_path)
            .finish_non_exhaustive()
    }
}
