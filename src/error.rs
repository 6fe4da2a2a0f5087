//! Ring errors.
//!
//! | Variant | Raised by | Effect |
//! |---------|-----------|--------|
//! | [`RingError::NodeCount`] | fabric, topology | construction aborts |
//! | [`RingError::ChannelAllocation`] | fabric | construction aborts |
//! | [`RingError::Spawn`] | topology | construction aborts, spawned nodes are killed |
//! | [`RingError::ShortTransfer`] | codec | the node stops |
//! | [`RingError::PeerClosed`] | codec | the node stops |
//! | [`RingError::MalformedToken`] | codec | the node stops |
//! | [`RingError::Io`] | codec | the node stops |
//!
//! Nothing is propagated between processes: a node that stops closes its
//! endpoints and its neighbours observe [`RingError::PeerClosed`].

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RingError {
    /// A ring needs at least two nodes.
    #[error("a ring needs at least {min} nodes, got {nodes}")]
    NodeCount { nodes: u32, min: u32 },

    #[error("failed to allocate the channel for edge {edge}: {source}")]
    ChannelAllocation { edge: u32, source: nix::Error },

    #[error("failed to spawn the process for node {index}: {source}")]
    Spawn { index: u32, source: nix::Error },

    /// Fewer bytes than a whole token moved across a channel.
    #[error("short transfer: expected {expected} bytes, moved {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// The neighbour on the other side of the channel is gone.
    #[error("peer closed the channel")]
    PeerClosed,

    #[error("malformed token: destination {0} is negative")]
    MalformedToken(i32),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RingError {
    /// Returns whether the error was raised while the ring was being built,
    /// before any node started its protocol loop.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::NodeCount { .. } | Self::ChannelAllocation { .. } | Self::Spawn { .. }
        )
    }

    /// Maps a failed write on an outbound channel.
    pub(crate) fn from_write(error: io::Error, expected: usize) -> Self {
        match error.kind() {
            io::ErrorKind::WriteZero => Self::ShortTransfer {
                expected,
                actual: 0,
            },
            io::ErrorKind::BrokenPipe => Self::PeerClosed,
            _ => Self::Io(error),
        }
    }
}
