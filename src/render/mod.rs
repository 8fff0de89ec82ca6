//! Rendering: Keep per-segment views in sync with a growing message.
//!
//! # Architecture
//!
//! The renderer works on an abstract kind sequence rather than on widgets:
//!
//! 1. **Fast Path**: When the freshly parsed segments have the same count and
//!    kinds as the live views, each view is patched in place. This is the
//!    common case while tokens stream into the tail of the message.
//!
//! 2. **Slow Path**: When a fence or aside opens or closes, the kind sequence
//!    changes and every view is recreated.
//!
//! Hosts plug in through [`ViewFactory`]; [`TerminalPainter`] is one such host
//! for ANSI terminals.
//!
//! # Example
//!
//! ```rust
//! use chatwheel::render::{BlockFactory, SegmentDiffRenderer};
//!
//! let mut renderer = SegmentDiffRenderer::new(BlockFactory::new());
//! assert!(!renderer.render_text("Hello").is_fast());
//! assert!(renderer.render_text("Hello, world").is_fast());
//! ```

mod diff;
pub mod terminal;
mod view;

pub use diff::{is_fast_path, RenderObserver, RenderPath, SegmentDiffRenderer};
pub use terminal::TerminalPainter;
pub use view::{BlockFactory, SegmentView, TextBlock, ViewFactory};
