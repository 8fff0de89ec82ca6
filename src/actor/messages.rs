//! Message types for actor communication.
//!
//! These enums define the protocol between the pump thread, the foreground
//! loop and the host application.

/// Events sent from a pump thread to the foreground loop.
///
/// Chunks carry the **cumulative** text received so far, so a consumer that
/// only keeps the latest chunk never loses content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text received so far.
    Chunk {
        /// Cumulative response text.
        content: String,
    },

    /// The stream ended normally or was cancelled.
    Done,

    /// The stream failed. Nothing follows this event.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Session lifecycle notifications for the host.
///
/// A host typically uses these to toggle its send/stop affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A response started streaming.
    Started {
        /// Model generating the response.
        model: String,
    },

    /// The visible text advanced.
    Advanced {
        /// Visible length in bytes.
        visible_len: usize,
    },

    /// Cancellation was requested; the session finishes once the stream ends.
    Cancelled,

    /// The session finished and its turn was recorded.
    Finished {
        /// Final visible length in bytes.
        visible_len: usize,
    },

    /// The session failed.
    Failed {
        /// Error message.
        message: String,
    },
}
