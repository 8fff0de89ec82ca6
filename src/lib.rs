//! # Chatwheel
//!
//! A streaming chat client for local Ollama-compatible model servers.
//!
//! Chatwheel renders a model's response while it is still arriving, without
//! rebuilding the display on every token and without ever blocking the
//! foreground on the network.
//!
//! ## Core Concepts
//!
//! - **Segment parsing**: plain text, fenced code and `<think>` asides are
//!   split from the growing text on every tick, tolerating open regions
//! - **Keyed diff**: views are patched in place while the kind sequence is
//!   unchanged and rebuilt only at structural transitions
//! - **Actor model**: one pump thread per request feeds a channel that the
//!   foreground drains without blocking
//! - **Typewriter pacing**: visible text chases the received text at a rate
//!   that grows with the backlog
//!
//! ## Example
//!
//! ```rust
//! use chatwheel::parser::{parse, SegmentKind};
//!
//! let segments = parse("Here:\n```py\nprint(1)\n```");
//! assert_eq!(segments[1].kind, SegmentKind::Code);
//! assert_eq!(segments[1].language.as_deref(), Some("py"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod parser;
pub mod render;
pub mod session;
pub mod turn;

// Re-exports for convenience
pub use actor::{CancelToken, Conversation, SessionEvent, StreamEvent, StreamPump};
pub use client::{ChatBackend, ChatRequest, OllamaClient, PullProgress};
pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use parser::{parse, Segment, SegmentKind};
pub use render::{RenderPath, SegmentDiffRenderer, SegmentView, TextBlock, ViewFactory};
pub use session::{PacingPolicy, SessionPhase, TickOutcome, TypewriterScheduler};
pub use turn::{ChatTurn, Role};
