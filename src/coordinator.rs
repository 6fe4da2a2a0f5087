//! The node at ring position 0.
//!
//! The coordinator creates the token, stages the messages produced by the
//! input source onto it and consumes their replies when they come back. It
//! polls its inbound channel instead of waiting on it, so a message finished
//! by the input source never waits for a token that is still travelling.

use crate::{
    codec::TokenChannel,
    error::RingError,
    log,
    message::{Outbound, Token, TokenKind},
    output::Output,
    sync::Handoff,
    COORDINATOR,
};
use color_print::cformat;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::sleep,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    /// A staged message is on the ring and its reply has not come back.
    AwaitingReply,
}

pub struct Coordinator<R, W, O> {
    channel: TokenChannel<R, W>,
    handoff: Handoff<Outbound>,
    output: O,
    poll_interval: Duration,
    state: CoordinatorState,
    laps: u64,
}

impl<R, W, O> Coordinator<R, W, O>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: Output,
{
    pub fn new(
        channel: TokenChannel<R, W>,
        handoff: Handoff<Outbound>,
        output: O,
        poll_interval: Duration,
    ) -> Self {
        Self {
            channel,
            handoff,
            output,
            poll_interval,
            state: CoordinatorState::Idle,
            laps: 0,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Number of times the token came back to the coordinator.
    pub fn laps(&self) -> u64 {
        self.laps
    }

    /// Function that puts the token on the ring and services it until the ring breaks.
    pub async fn run(&mut self) -> Result<(), RingError> {
        log::info(&cformat!(
            "Putting the <yellow, bold>token</yellow, bold> on the ring."
        ));
        self.channel.send(Token::empty()).await?;

        loop {
            match self.channel.try_recv().await? {
                Some(token) => {
                    let token = self.service(token);
                    self.channel.send(token).await?;
                }
                None => sleep(self.poll_interval).await,
            }
        }
    }

    /// Function that applies the coordinator's rules to a token that just came back.
    fn service(&mut self, mut token: Token) -> Token {
        self.laps += 1;
        log::debug(&format!("lap {} brought back the {token}", self.laps));

        match token.kind() {
            TokenKind::Returning if self.state == CoordinatorState::AwaitingReply => {
                self.output.acknowledged(token.payload());
                token.clear_payload();
                self.state = CoordinatorState::Idle;
                self.handoff.release();
            }
            TokenKind::Returning => {
                log::warn("A reply came back while no message was out.");
            }
            TokenKind::Full { destination } => {
                log::debug(&format!("message for node {destination} is still in flight"));
            }
            TokenKind::Empty => {}
        }

        if self.state == CoordinatorState::Idle && token.destination == COORDINATOR {
            match self.handoff.try_take() {
                // Would come back as an empty token, with no reply to end the wait.
                Some(outbound) if outbound.payload.is_empty() => {
                    log::warn("Dropped an empty message, nothing to send.");
                    self.handoff.release();
                }
                Some(outbound) => {
                    log::info(&cformat!(
                        "Sending a <yellow, bold>message</yellow, bold> to <bold>node {}</bold>.",
                        outbound.destination
                    ));
                    token.stage(outbound);
                    self.state = CoordinatorState::AwaitingReply;
                }
                None => {}
            }
        }

        token
    }
}
