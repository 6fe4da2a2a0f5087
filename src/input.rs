//! The coordinator's input source.
//!
//! Runs next to the coordinator loop, asks for a destination and a message,
//! and hands the pair over through a [`Handoff`]. A new pair is only asked
//! for once the previous one came back around the ring.

use crate::{
    error::RingError,
    log,
    message::{bounded, Outbound},
    sync::Handoff,
};
use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Longest input line accepted; payloads are cut much shorter anyway.
const MAX_LINE: usize = 4096;

/// Input the source asks for again instead of passing on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("node {value} is not in 1..={max}")]
    OutOfRange { value: i64, max: u32 },

    #[error("{0:?} is not a node number")]
    NotANumber(String),
}

/// Function that reads a destination typed for a ring of `nodes` nodes.
pub fn parse_destination(line: &str, nodes: u32) -> Result<u32, InputError> {
    let line = line.trim();
    let value = line
        .parse::<i64>()
        .map_err(|_| InputError::NotANumber(line.to_owned()))?;
    let max = nodes.saturating_sub(1);

    match u32::try_from(value) {
        Ok(destination) if (1..=max).contains(&destination) => Ok(destination),
        _ => Err(InputError::OutOfRange { value, max }),
    }
}

pub struct InputSource<R, W> {
    nodes: u32,
    lines: FramedRead<R, LinesCodec>,
    prompts: W,
    handoff: Handoff<Outbound>,
}

impl<R, W> InputSource<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(nodes: u32, input: R, prompts: W, handoff: Handoff<Outbound>) -> Self {
        Self {
            nodes,
            lines: FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE)),
            prompts,
            handoff,
        }
    }

    /// Function that produces messages until the input ends.
    pub async fn run(&mut self) -> Result<(), RingError> {
        loop {
            self.handoff.idle().await;

            let Some(destination) = self.destination().await? else {
                break;
            };
            let Some(payload) = self.message().await? else {
                break;
            };

            if let Err(outbound) = self.handoff.publish(Outbound::new(destination, &payload)) {
                log::warn(&format!(
                    "Dropped the message for node {}, another one is still out.",
                    outbound.destination
                ));
            }
        }

        log::info("Input closed, the token keeps circulating.");
        Ok(())
    }

    async fn destination(&mut self) -> Result<Option<u32>, RingError> {
        let prompt = format!("Destination node (1-{}): ", self.nodes.saturating_sub(1));
        loop {
            let Some(line) = self.line(&prompt).await? else {
                return Ok(None);
            };
            match parse_destination(&line, self.nodes) {
                Ok(destination) => return Ok(Some(destination)),
                Err(e) => self.say(&format!("{e}, try again.\n")).await?,
            }
        }
    }

    /// An empty payload reads as "no message" on the ring, so it is asked again.
    async fn message(&mut self) -> Result<Option<String>, RingError> {
        loop {
            let Some(line) = self.line("Message: ").await? else {
                return Ok(None);
            };
            if !bounded(&line).is_empty() {
                return Ok(Some(line));
            }
            self.say("A message can't be empty, try again.\n").await?;
        }
    }

    async fn line(&mut self, prompt: &str) -> Result<Option<String>, RingError> {
        loop {
            self.say(prompt).await?;
            match self.lines.next().await {
                Some(Ok(line)) => return Ok(Some(line)),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    self.say("That line is too long, try again.\n").await?
                }
                Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    async fn say(&mut self, text: &str) -> Result<(), RingError> {
        self.prompts.write_all(text.as_bytes()).await?;
        self.prompts.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[test]
    fn destinations_must_name_a_peer() {
        assert_eq!(parse_destination("1", 4), Ok(1));
        assert_eq!(parse_destination(" 3 \r", 4), Ok(3));
        assert_eq!(
            parse_destination("4", 4),
            Err(InputError::OutOfRange { value: 4, max: 3 })
        );
        assert_eq!(
            parse_destination("0", 4),
            Err(InputError::OutOfRange { value: 0, max: 3 })
        );
        assert_eq!(
            parse_destination("-2", 4),
            Err(InputError::OutOfRange { value: -2, max: 3 })
        );
        assert_eq!(
            parse_destination("two", 4),
            Err(InputError::NotANumber("two".into()))
        );
    }

    #[test]
    fn two_node_ring_accepts_only_node_one() {
        assert_eq!(parse_destination("1", 2), Ok(1));
        assert!(parse_destination("2", 2).is_err());
    }

    async fn wait_for_record(handoff: &Handoff<Outbound>) -> Outbound {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(record) = handoff.try_take() {
                    return record;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn bad_destinations_are_asked_again() {
        let handoff = Handoff::new();
        let input: &[u8] = b"7\n0\nabc\n2\nhi\n";
        let mut source = InputSource::new(3, input, Vec::new(), handoff.clone());
        let task = tokio::spawn(async move {
            let result = source.run().await;
            (result, source)
        });

        assert_eq!(wait_for_record(&handoff).await, Outbound::new(2, "hi"));
        handoff.release();

        let (result, source) = timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());

        let prompts = String::from_utf8(source.prompts).unwrap();
        assert_eq!(prompts.matches("Destination node (1-2): ").count(), 5);
        assert!(prompts.contains("node 7 is not in 1..=2, try again."));
        assert!(prompts.contains("node 0 is not in 1..=2, try again."));
        assert!(prompts.contains("\"abc\" is not a node number, try again."));
        assert_eq!(prompts.matches("Message: ").count(), 1);
    }

    #[tokio::test]
    async fn next_message_waits_for_the_previous_reply() {
        let handoff = Handoff::new();
        let input: &[u8] = b"1\nfirst\n1\nsecond\n";
        let mut source = InputSource::new(2, input, Vec::new(), handoff.clone());
        let task = tokio::spawn(async move { source.run().await });

        assert_eq!(wait_for_record(&handoff).await, Outbound::new(1, "first"));
        sleep(Duration::from_millis(20)).await;
        assert!(handoff.try_take().is_none());

        handoff.release();
        assert_eq!(wait_for_record(&handoff).await, Outbound::new(1, "second"));
        handoff.release();

        assert!(timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .is_ok());
    }

    #[tokio::test]
    async fn empty_messages_are_asked_again() {
        let handoff = Handoff::new();
        let input: &[u8] = b"1\n\n\0hidden\nhi\n";
        let mut source = InputSource::new(2, input, Vec::new(), handoff.clone());
        let task = tokio::spawn(async move {
            let result = source.run().await;
            (result, source)
        });

        assert_eq!(wait_for_record(&handoff).await, Outbound::new(1, "hi"));
        handoff.release();

        let (result, source) = timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(handoff.try_take().is_none());

        let prompts = String::from_utf8(source.prompts).unwrap();
        assert_eq!(prompts.matches("Message: ").count(), 3);
        assert_eq!(
            prompts.matches("A message can't be empty, try again.").count(),
            2
        );
    }

    #[tokio::test]
    async fn end_of_input_publishes_nothing() {
        let handoff = Handoff::new();
        let input: &[u8] = b"2\n";
        let mut source = InputSource::new(4, input, Vec::new(), handoff.clone());

        assert!(source.run().await.is_ok());
        assert!(handoff.is_idle());
        assert!(handoff.try_take().is_none());
    }

    #[tokio::test]
    async fn long_payloads_are_cut_to_capacity() {
        let handoff = Handoff::new();
        let input = format!("1\n{}\n", "p".repeat(1000)).into_bytes();
        let mut source = InputSource::new(2, input.as_slice(), Vec::new(), handoff.clone());

        // The loop stops at end of input after publishing.
        let run = tokio::spawn({
            let handoff = handoff.clone();
            async move {
                let record = wait_for_record(&handoff).await;
                handoff.release();
                record
            }
        });
        assert!(source.run().await.is_ok());

        let record = run.await.unwrap();
        assert_eq!(record.payload.len(), crate::PAYLOAD_CAPACITY);
    }
}
