pub use crate::error::RingError;
pub use crate::message::*;

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fabric;
pub mod input;
pub mod log;
pub mod message;
pub mod output;
pub mod peer;
pub mod sync;
pub mod topology;

use std::time::Duration;

/// Ring position of the coordinator.
pub const COORDINATOR: u32 = 0;

/// Smallest ring that has a forward edge between two distinct nodes.
pub const MIN_NODES: u32 = 2;

/// Largest ring the command line accepts; bigger requests are clamped.
pub const MAX_NODES: u32 = 64;

/// Capacity of the payload buffer carried by every token.
pub const PAYLOAD_CAPACITY: usize = 256;

/// Size of a token on the wire: destination followed by the payload buffer.
pub const TOKEN_WIRE_SIZE: usize = 4 + PAYLOAD_CAPACITY;

pub const DEFAULT_HOP_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
