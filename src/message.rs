//! Module that contains the token circulating the ring and the records built around it.

use crate::{error::RingError, COORDINATOR, PAYLOAD_CAPACITY};
use std::fmt;

/// Struct that represents the single token passed between nodes.
///
/// The token is moved through every receive, inspect and forward step; the
/// protocol never clones it, so only one instance exists at any time.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    pub destination: u32,
    payload: String,
}

/// Enum that tells what a received token is carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Addressed to the coordinator and carrying nothing.
    Empty,
    /// A delivered message travelling back to the coordinator.
    Returning,
    /// A message in flight towards a node other than the coordinator.
    Full { destination: u32 },
}

/// Struct that represents a message the coordinator wants to put on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub destination: u32,
    pub payload: String,
}

impl Token {
    /// Function that creates the token the coordinator starts the ring with.
    pub fn empty() -> Self {
        Self {
            destination: COORDINATOR,
            payload: String::new(),
        }
    }

    /// Function that creates a token carrying `payload` towards `destination`.
    pub fn new(destination: u32, payload: &str) -> Self {
        Self {
            destination,
            payload: bounded(payload).to_owned(),
        }
    }

    /// Function that rebuilds a token from its wire fields.
    pub(crate) fn from_wire(destination: i32, payload: &[u8]) -> Result<Self, RingError> {
        let destination =
            u32::try_from(destination).map_err(|_| RingError::MalformedToken(destination))?;
        let end = payload
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(payload.len());
        let payload = String::from_utf8_lossy(&payload[..end]);

        Ok(Self::new(destination, &payload))
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: &str) {
        self.payload = bounded(payload).to_owned();
    }

    pub fn clear_payload(&mut self) {
        self.payload.clear();
    }

    /// Function that marks the carried message as delivered, sending it back
    /// towards the coordinator.
    pub fn mark_delivered(&mut self) {
        self.destination = COORDINATOR;
    }

    /// Function that loads a message the coordinator wants to send.
    pub fn stage(&mut self, outbound: Outbound) {
        self.destination = outbound.destination;
        self.set_payload(&outbound.payload);
    }

    pub fn kind(&self) -> TokenKind {
        match (self.destination, self.payload.is_empty()) {
            (COORDINATOR, true) => TokenKind::Empty,
            (COORDINATOR, false) => TokenKind::Returning,
            (destination, _) => TokenKind::Full { destination },
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TokenKind::Empty => write!(f, "empty token"),
            TokenKind::Returning => write!(f, "returning token {:?}", self.payload),
            TokenKind::Full { destination } => {
                write!(f, "token for node {destination} {:?}", self.payload)
            }
        }
    }
}

impl Outbound {
    pub fn new(destination: u32, payload: &str) -> Self {
        Self {
            destination,
            payload: bounded(payload).to_owned(),
        }
    }
}

/// Function that cuts `payload` at its first NUL and to [`PAYLOAD_CAPACITY`]
/// bytes without splitting a character.
pub fn bounded(payload: &str) -> &str {
    let payload = match payload.find('\0') {
        Some(end) => &payload[..end],
        None => payload,
    };
    if payload.len() <= PAYLOAD_CAPACITY {
        return payload;
    }

    let mut end = PAYLOAD_CAPACITY;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    &payload[..end]
}
