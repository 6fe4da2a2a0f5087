use crate::{error::RingError, DEFAULT_HOP_DELAY, DEFAULT_POLL_INTERVAL, MIN_NODES};
use std::time::Duration;

pub const DEFAULT_NODES: u32 = 4;

/// Parameters every node of a ring runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    pub nodes: u32,
    /// Pause before every send, so circulation can be followed by eye.
    pub hop_delay: Duration,
    /// How long the coordinator idles when no token is waiting.
    pub poll_interval: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            hop_delay: DEFAULT_HOP_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RingConfig {
    pub fn new(nodes: u32) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn with_hop_delay(mut self, hop_delay: Duration) -> Self {
        self.hop_delay = hop_delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<(), RingError> {
        if self.nodes < MIN_NODES {
            return Err(RingError::NodeCount {
                nodes: self.nodes,
                min: MIN_NODES,
            });
        }
        Ok(())
    }
}
