//! Actor Model: Background streaming with a non-blocking foreground.
//!
//! Each request gets its own pump thread. The pump and the foreground share
//! nothing but a crossbeam channel and a cancellation flag:
//! - **Stream Pump**: reads the backend stream, sends cumulative chunks
//! - **Conversation**: drains the channel every tick and paces the output
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    StreamEvent      ┌──────────────┐
//! │ Pump Thread  │ ─────────────────▶  │              │
//! └──────────────┘                     │ Conversation │
//!        ▲                             │   (tick)     │
//!        │        CancelToken          │              │
//!        └──────────────────────────── │              │
//!                                      └──────────────┘
//!        │                                   │
//!        │ HTTP (NDJSON)                     │ SessionEvent
//!        ▼                                   ▼
//! ┌──────────────┐                     ┌──────────────┐
//! │ ChatBackend  │                     │     Host     │
//! └──────────────┘                     └──────────────┘
//! ```

mod cancel;
mod engine;
mod messages;
mod pump;

pub use cancel::CancelToken;
pub use engine::Conversation;
pub use messages::{SessionEvent, StreamEvent};
pub use pump::{Drained, StreamPump};
