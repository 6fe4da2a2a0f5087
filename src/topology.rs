//! Construction of the ring out of one starting process.
//!
//! The starting process becomes the coordinator (ring position 0). It
//! allocates every edge first, then forks one child per remaining position in
//! order; each child knows its position from the loop before it exists and
//! leaves the loop at once. Every process then keeps its own two endpoints out
//! of the inherited fabric and closes the rest.

use crate::{
    error::RingError,
    fabric::{Endpoints, Fabric},
    log, COORDINATOR, MIN_NODES,
};
use color_print::cformat;
use nix::{
    errno::Errno,
    sys::{
        signal::{kill, Signal},
        wait::{wait, WaitStatus},
    },
    unistd::{fork, getpid, ForkResult, Pid},
};

/// Process ids of the ring, indexed by ring position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTable {
    pids: Vec<Pid>,
}

impl RingTable {
    pub fn new(coordinator: Pid) -> Self {
        Self {
            pids: vec![coordinator],
        }
    }

    /// Function that records the next ring position and returns it.
    pub fn push(&mut self, pid: Pid) -> u32 {
        self.pids.push(pid);
        (self.pids.len() - 1) as u32
    }

    /// Function that finds the ring position of a process.
    pub fn position_of(&self, pid: Pid) -> Option<u32> {
        self.pids
            .iter()
            .position(|&candidate| candidate == pid)
            .map(|index| index as u32)
    }

    /// Every position but the coordinator's, with its process id.
    pub fn children(&self) -> impl Iterator<Item = (u32, Pid)> + '_ {
        self.pids
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, &pid)| (index as u32, pid))
    }

    /// Function that waits for every child to exit, logging how each one ended.
    pub fn reap(&self) {
        let mut remaining = self.children().count();
        while remaining > 0 {
            let status = match wait() {
                Ok(status) => status,
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => break,
                Err(e) => {
                    log::warn(&format!("Couldn't wait for the ring to stop: {e}."));
                    break;
                }
            };

            let Some(index) = status.pid().and_then(|pid| self.position_of(pid)) else {
                continue;
            };
            remaining -= 1;
            match status {
                WaitStatus::Exited(_, 0) => log::debug(&format!("node {index} left the ring")),
                WaitStatus::Exited(_, code) => {
                    log::warn(&format!("Node {index} exited with code {code}."))
                }
                WaitStatus::Signaled(_, signal, _) => {
                    log::warn(&format!("Node {index} was stopped by {signal:?}."))
                }
                status => log::debug(&format!("node {index} ended with {status:?}")),
            }
        }
    }

    /// Function that kills and reaps every child, for rings that could not be completed.
    fn abort(&self) {
        for (index, pid) in self.children() {
            if let Err(e) = kill(pid, Signal::SIGKILL) {
                log::warn(&format!("Couldn't stop node {index}: {e}."));
            }
        }
        self.reap();
    }
}

#[derive(Debug)]
pub enum Role {
    /// Ring position 0, supervising every other node.
    Coordinator(RingTable),
    Peer,
}

/// What a process of the ring is left with once construction is over.
#[derive(Debug)]
pub struct RingNode {
    pub index: u32,
    pub nodes: u32,
    pub endpoints: Endpoints,
    pub role: Role,
}

/// Function that turns the calling process into a ring of `nodes` processes.
///
/// Returns in every process of the ring, each time with that process's
/// position and endpoints. Must be called while the process has a single
/// thread, before any async runtime is started.
pub fn build(nodes: u32) -> Result<RingNode, RingError> {
    if nodes < MIN_NODES {
        return Err(RingError::NodeCount {
            nodes,
            min: MIN_NODES,
        });
    }

    let fabric = Fabric::allocate(nodes)?;
    let mut table = RingTable::new(getpid());

    for index in 1..nodes {
        // SAFETY: the process is single-threaded here, so the child starts
        // with consistent memory and no lock held by a vanished thread.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                log::set_node(index);
                return Ok(RingNode {
                    index,
                    nodes,
                    endpoints: fabric.retain(index),
                    role: Role::Peer,
                });
            }
            Ok(ForkResult::Parent { child }) => {
                table.push(child);
                log::info(&format!("Spawned node {index} as pid {child}."));
            }
            Err(source) => {
                table.abort();
                return Err(RingError::Spawn { index, source });
            }
        }
    }

    log::set_node(COORDINATOR);
    log::info(&cformat!("Ring of <bold>{nodes}</bold> nodes is up."));
    Ok(RingNode {
        index: COORDINATOR,
        nodes,
        endpoints: fabric.retain(COORDINATOR),
        role: Role::Coordinator(table),
    })
}
