//! Generation sessions: paced presentation of one streaming response.
//!
//! A session couples the network text, the visible text and the views that
//! show it. [`TypewriterScheduler`] drives it one tick at a time and
//! [`PacingPolicy`] decides how far each tick moves.

mod pacing;
mod scheduler;

pub use pacing::{PacingConfig, PacingPolicy, PacingTier};
pub use scheduler::{MessageBuffer, SessionPhase, TickOutcome, TypewriterScheduler};
