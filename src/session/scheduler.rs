//! Typewriter Scheduler: Animate visible text toward the network text.
//!
//! The scheduler owns one generation session. Two strings move through it:
//!
//! - `target_text`: everything the network has delivered so far
//! - `visible_text`: what the user has been shown, always a prefix of the target
//!
//! Every call to [`TypewriterScheduler::tick`] drains the stream events that
//! were queued since the previous tick, moves `visible_text` forward by a
//! pacing step and re-renders. The returned [`TickOutcome`] tells the caller
//! how long to wait before the next tick.
//!
//! # State machine
//!
//! ```text
//!              cancel()            Done / disconnect
//! Streaming ───────────▶ Cancelling ────────────────▶ Finished
//!     │  Done + caught up                                 ▲
//!     ├───────────────────────────────────────────────────┘
//!     │  Error
//!     └──────────▶ Failed
//! ```

use super::pacing::PacingPolicy;
use crate::actor::{CancelToken, StreamEvent};
use crate::parser::{self, Segment};
use crate::render::{RenderPath, SegmentDiffRenderer, ViewFactory};
use std::time::Duration;
use tracing::{debug, trace};
use unicode_segmentation::UnicodeSegmentation;

/// Lifecycle phase of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The network is delivering text.
    Streaming,
    /// Cancel requested; waiting for the stream's terminal event.
    Cancelling,
    /// The response is complete.
    Finished,
    /// The stream failed.
    Failed,
}

impl SessionPhase {
    /// Whether the session has ended.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Displayed text of the message being generated.
///
/// Only the scheduler's tick mutates it; once the session ends it is frozen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBuffer {
    visible_text: String,
    segments: Vec<Segment>,
}

impl MessageBuffer {
    /// Text currently shown.
    pub fn visible_text(&self) -> &str {
        &self.visible_text
    }

    /// Segments parsed from the visible text.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn push(&mut self, text: &str) {
        self.visible_text.push_str(text);
        self.segments = parser::parse(&self.visible_text);
    }

    fn truncate(&mut self, len: usize) {
        self.visible_text.truncate(len);
        self.segments = parser::parse(&self.visible_text);
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Visible text advanced and was re-rendered.
    Advanced {
        /// Delay before the next tick.
        delay: Duration,
        /// How the views were updated.
        path: RenderPath,
    },
    /// Caught up with the network; poll again later.
    Waiting {
        /// Delay before the next tick.
        delay: Duration,
    },
    /// The response is complete. Reported exactly once.
    Finished {
        /// Final assistant text.
        content: String,
    },
    /// The stream failed. Reported exactly once.
    Failed {
        /// Error description.
        message: String,
        /// Text that was visible when the failure arrived.
        partial: String,
    },
    /// Nothing to do: no session or the session already ended.
    Idle,
}

impl TickOutcome {
    /// Delay before the next tick, or `None` when ticking should stop.
    pub const fn next_delay(&self) -> Option<Duration> {
        match self {
            Self::Advanced { delay, .. } | Self::Waiting { delay } => Some(*delay),
            Self::Finished { .. } | Self::Failed { .. } | Self::Idle => None,
        }
    }

    /// Whether this outcome ends the session.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }
}

/// Paced presentation of one streaming response.
pub struct TypewriterScheduler<F: ViewFactory> {
    /// Pacing tiers.
    policy: PacingPolicy,
    /// Views for the visible text.
    renderer: SegmentDiffRenderer<F>,
    /// What has been shown.
    buffer: MessageBuffer,
    /// What has been received.
    target_text: String,
    /// Whether more text may still arrive.
    network_active: bool,
    /// Current phase.
    phase: SessionPhase,
    /// Shared with the producer.
    cancel: CancelToken,
}

impl<F: ViewFactory> TypewriterScheduler<F> {
    /// Start a session in the `Streaming` phase.
    pub const fn new(policy: PacingPolicy, factory: F, cancel: CancelToken) -> Self {
        Self {
            policy,
            renderer: SegmentDiffRenderer::new(factory),
            buffer: MessageBuffer {
                visible_text: String::new(),
                segments: Vec::new(),
            },
            target_text: String::new(),
            network_active: true,
            phase: SessionPhase::Streaming,
            cancel,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Text shown so far.
    pub fn visible_text(&self) -> &str {
        self.buffer.visible_text()
    }

    /// Text received so far (frozen at the visible text once cancelled).
    pub fn target_text(&self) -> &str {
        &self.target_text
    }

    /// The displayed message.
    pub const fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    /// Views for the visible text.
    pub fn views(&self) -> &[F::View] {
        self.renderer.views()
    }

    /// The renderer, e.g. to install an observer.
    pub const fn renderer_mut(&mut self) -> &mut SegmentDiffRenderer<F> {
        &mut self.renderer
    }

    /// Whether the stream may still deliver text.
    pub const fn network_active(&self) -> bool {
        self.network_active
    }

    /// Stop revealing text.
    ///
    /// Freezes the target at what is visible now and signals the producer.
    /// The session finishes once the stream's terminal event arrives.
    /// Returns `false` if the session was not streaming.
    pub fn cancel(&mut self) -> bool {
        if self.phase != SessionPhase::Streaming {
            return false;
        }
        self.cancel.cancel();
        self.target_text.clone_from(&self.buffer.visible_text);
        self.phase = SessionPhase::Cancelling;
        debug!(visible = self.target_text.len(), "generation cancelled");
        true
    }

    /// Apply queued stream events and advance one step.
    pub fn tick<I>(&mut self, events: I) -> TickOutcome
    where
        I: IntoIterator<Item = StreamEvent>,
    {
        if self.phase.is_terminal() {
            return TickOutcome::Idle;
        }

        for event in events {
            match event {
                StreamEvent::Chunk { content } => self.accept_chunk(content),
                StreamEvent::Done => self.network_active = false,
                StreamEvent::Error { message } => return self.fail(message),
            }
        }

        let backlog = self.target_text.len() - self.buffer.visible_text.len();
        trace!(backlog, phase = ?self.phase, "tick");

        if backlog > 0 {
            let rest = &self.target_text[self.buffer.visible_text.len()..];
            let end = rest
                .grapheme_indices(true)
                .nth(self.policy.step(backlog))
                .map_or(rest.len(), |(idx, _)| idx);
            self.buffer.push(&rest[..end]);
            let path = self.renderer.render(&self.buffer.segments);
            return TickOutcome::Advanced {
                delay: self.policy.delay(backlog),
                path,
            };
        }

        if self.network_active {
            return TickOutcome::Waiting {
                delay: self.policy.poll_delay(),
            };
        }

        self.phase = SessionPhase::Finished;
        TickOutcome::Finished {
            content: self.buffer.visible_text.clone(),
        }
    }

    fn accept_chunk(&mut self, content: String) {
        if self.phase != SessionPhase::Streaming || !self.network_active {
            return;
        }
        if !content.starts_with(self.buffer.visible_text.as_str()) {
            // The producer rewrote text already shown; back up to the
            // common prefix.
            let common = common_prefix_len(&content, &self.buffer.visible_text);
            debug!(common, "stream rewrote visible text");
            self.buffer.truncate(common);
            self.renderer.render(&self.buffer.segments);
        }
        self.target_text = content;
    }

    fn fail(&mut self, message: String) -> TickOutcome {
        self.phase = SessionPhase::Failed;
        self.network_active = false;
        TickOutcome::Failed {
            message,
            partial: self.buffer.visible_text.clone(),
        }
    }
}

impl<F: ViewFactory> std::fmt::Debug for TypewriterScheduler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypewriterScheduler")
            .field("phase", &self.phase)
            .field("visible", &self.buffer.visible_text.len())
            .field("target", &self.target_text.len())
            .field("network_active", &self.network_active)
            .finish_non_exhaustive()
    }
}

/// Byte length of the longest common prefix, on a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((idx, _), _)| idx)
}
