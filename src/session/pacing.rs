//! Pacing policy for the typewriter animation.
//!
//! The backlog is the number of bytes the network has delivered but the
//! screen has not shown yet. Each tier applies from its `min_backlog`
//! upward: a larger backlog takes larger steps with shorter delays, so the
//! text catches up quickly after a burst and animates smoothly otherwise.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One pacing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingTier {
    /// Smallest backlog (bytes) this tier applies to.
    pub min_backlog: usize,
    /// Grapheme clusters revealed per tick.
    pub step: usize,
    /// Delay before the next tick, in milliseconds.
    pub delay_ms: u64,
}

impl PacingTier {
    /// Create a tier.
    pub const fn new(min_backlog: usize, step: usize, delay_ms: u64) -> Self {
        Self {
            min_backlog,
            step,
            delay_ms,
        }
    }
}

/// Serializable pacing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Tiers ordered by ascending `min_backlog`.
    pub tiers: Vec<PacingTier>,
    /// Delay between polls while waiting for the network, in milliseconds.
    pub poll_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                PacingTier::new(0, 1, 24),
                PacingTier::new(24, 2, 16),
                PacingTier::new(96, 4, 12),
                PacingTier::new(384, 12, 8),
                PacingTier::new(1536, 48, 4),
            ],
            poll_delay_ms: 50,
        }
    }
}

/// Validated pacing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingPolicy {
    tiers: Vec<PacingTier>,
    poll_delay: Duration,
}

impl PacingPolicy {
    /// Build a policy from tiers.
    ///
    /// Tiers must start at a backlog of at most 1, have strictly ascending
    /// thresholds, non-zero non-decreasing steps and non-increasing delays.
    pub fn new(tiers: Vec<PacingTier>, poll_delay: Duration) -> Result<Self> {
        let first = tiers
            .first()
            .ok_or_else(|| ChatError::Config("pacing needs at least one tier".into()))?;
        if first.min_backlog > 1 {
            return Err(ChatError::Config(format!(
                "first pacing tier must start at backlog 0 or 1, not {}",
                first.min_backlog
            )));
        }
        if tiers.iter().any(|t| t.step == 0) {
            return Err(ChatError::Config("pacing step must be at least 1".into()));
        }
        for pair in tiers.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if hi.min_backlog <= lo.min_backlog {
                return Err(ChatError::Config(
                    "pacing tiers must have ascending thresholds".into(),
                ));
            }
            if hi.step < lo.step || hi.delay_ms > lo.delay_ms {
                return Err(ChatError::Config(format!(
                    "pacing tier at backlog {} must not step less or wait longer than the tier below",
                    hi.min_backlog
                )));
            }
        }
        Ok(Self { tiers, poll_delay })
    }

    /// Build a policy from its serialized form.
    pub fn from_config(config: &PacingConfig) -> Result<Self> {
        Self::new(
            config.tiers.clone(),
            Duration::from_millis(config.poll_delay_ms),
        )
    }

    /// Grapheme clusters to reveal for the given backlog.
    pub fn step(&self, backlog: usize) -> usize {
        self.tier(backlog).step
    }

    /// Delay before the next tick for the given backlog.
    pub fn delay(&self, backlog: usize) -> Duration {
        Duration::from_millis(self.tier(backlog).delay_ms)
    }

    /// Delay between polls while the network is idle.
    pub const fn poll_delay(&self) -> Duration {
        self.poll_delay
    }

    fn tier(&self, backlog: usize) -> &PacingTier {
        let idx = self
            .tiers
            .partition_point(|t| t.min_backlog <= backlog)
            .saturating_sub(1);
        &self.tiers[idx]
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        let config = PacingConfig::default();
        Self {
            tiers: config.tiers,
            poll_delay: Duration::from_millis(config.poll_delay_ms),
        }
    }
}
