//! The channels that make up the ring's edges.
//!
//! Edge `i` carries tokens from node `i` to node `(i + 1) % n`. All edges are
//! allocated before any node process exists, so every process inherits every
//! descriptor; [`Fabric::retain`] then keeps the two a node owns and closes
//! the rest by dropping them.

use crate::{error::RingError, MIN_NODES};
use nix::unistd::pipe;
use std::os::fd::OwnedFd;

/// One ring edge: the read end belongs to the receiving node, the write end
/// to the sending node.
#[derive(Debug)]
pub struct Edge {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

/// Every edge of the ring, indexed by the sending node.
#[derive(Debug)]
pub struct Fabric {
    edges: Vec<Edge>,
}

/// The only two descriptors a node keeps once the ring is built.
#[derive(Debug)]
pub struct Endpoints {
    /// Read end of the edge entering the node.
    pub inbound: OwnedFd,
    /// Write end of the edge leaving the node.
    pub outbound: OwnedFd,
}

impl Fabric {
    pub fn allocate(nodes: u32) -> Result<Self, RingError> {
        if nodes < MIN_NODES {
            return Err(RingError::NodeCount {
                nodes,
                min: MIN_NODES,
            });
        }

        let edges = (0..nodes)
            .map(|edge| {
                pipe()
                    .map(|(read, write)| Edge { read, write })
                    .map_err(|source| RingError::ChannelAllocation { edge, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { edges })
    }

    pub fn nodes(&self) -> u32 {
        self.edges.len() as u32
    }

    /// Index of the edge entering `index`.
    pub fn inbound_edge(&self, index: u32) -> u32 {
        (index + self.nodes() - 1) % self.nodes()
    }

    /// Function that keeps the endpoints of node `index` and closes every other
    /// descriptor of the fabric in the calling process.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a node of the fabric.
    pub fn retain(self, index: u32) -> Endpoints {
        let inbound_edge = self.inbound_edge(index) as usize;
        let outbound_edge = index as usize;

        let mut inbound = None;
        let mut outbound = None;
        for (edge, Edge { read, write }) in self.edges.into_iter().enumerate() {
            if edge == inbound_edge {
                inbound = Some(read);
            }
            if edge == outbound_edge {
                outbound = Some(write);
            }
        }

        match (inbound, outbound) {
            (Some(inbound), Some(outbound)) => Endpoints { inbound, outbound },
            _ => unreachable!("node {index} lies outside the fabric"),
        }
    }
}
