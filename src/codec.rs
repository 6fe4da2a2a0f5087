//! Fixed-layout framing of the token over a byte channel.
//!
//! A token is always [`TOKEN_WIRE_SIZE`] bytes: a little-endian `i32`
//! destination followed by a NUL-padded payload buffer of
//! [`PAYLOAD_CAPACITY`] bytes. There is no length prefix; receivers rely on
//! the fixed size and never hand out a token before all of its bytes arrived.

use crate::{
    error::RingError, fabric::Endpoints, message::Token, PAYLOAD_CAPACITY, TOKEN_WIRE_SIZE,
};
use bytes::{Buf, BufMut, BytesMut};
use futures::{FutureExt, SinkExt, StreamExt};
use std::{io, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::unix::pipe,
    time::sleep,
};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenCodec;

impl Decoder for TokenCodec {
    type Item = Token;
    type Error = RingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Token>, RingError> {
        if src.len() < TOKEN_WIRE_SIZE {
            src.reserve(TOKEN_WIRE_SIZE - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(TOKEN_WIRE_SIZE);
        let destination = frame.get_i32_le();
        Token::from_wire(destination, &frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Token>, RingError> {
        match self.decode(src)? {
            Some(token) => Ok(Some(token)),
            None if src.is_empty() => Ok(None),
            None => Err(RingError::ShortTransfer {
                expected: TOKEN_WIRE_SIZE,
                actual: src.len(),
            }),
        }
    }
}

impl Encoder<Token> for TokenCodec {
    type Error = RingError;

    fn encode(&mut self, token: Token, dst: &mut BytesMut) -> Result<(), RingError> {
        let destination = i32::try_from(token.destination).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("destination {} does not fit the wire", token.destination),
            )
        })?;
        let payload = token.payload().as_bytes();

        dst.reserve(TOKEN_WIRE_SIZE);
        dst.put_i32_le(destination);
        dst.put_slice(payload);
        dst.put_bytes(0, PAYLOAD_CAPACITY - payload.len());
        Ok(())
    }
}

/// A node's two ring endpoints, framed as tokens.
pub struct TokenChannel<R, W> {
    inbound: FramedRead<R, TokenCodec>,
    outbound: FramedWrite<W, TokenCodec>,
    hop_delay: Duration,
}

pub type PipeChannel = TokenChannel<pipe::Receiver, pipe::Sender>;

impl PipeChannel {
    /// Function that registers the retained pipe ends with the running tokio reactor.
    pub fn from_endpoints(endpoints: Endpoints, hop_delay: Duration) -> Result<Self, RingError> {
        let inbound = pipe::Receiver::from_owned_fd(endpoints.inbound)?;
        let outbound = pipe::Sender::from_owned_fd(endpoints.outbound)?;
        Ok(Self::new(inbound, outbound, hop_delay))
    }
}

impl<R, W> TokenChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(inbound: R, outbound: W, hop_delay: Duration) -> Self {
        Self {
            inbound: FramedRead::new(inbound, TokenCodec),
            outbound: FramedWrite::new(outbound, TokenCodec),
            hop_delay,
        }
    }

    /// Function that waits until a whole token arrived from the previous node.
    pub async fn recv(&mut self) -> Result<Token, RingError> {
        match self.inbound.next().await {
            Some(token) => token,
            None => Err(RingError::PeerClosed),
        }
    }

    /// Function that takes a token if one is waiting, without waiting for one.
    ///
    /// Returns `Ok(None)` when no byte of a token is available. When only part
    /// of a token is available the rest is awaited, so a started token is
    /// always completed before returning.
    pub async fn try_recv(&mut self) -> Result<Option<Token>, RingError> {
        match self.inbound.next().now_or_never() {
            Some(Some(token)) => token.map(Some),
            Some(None) => Err(RingError::PeerClosed),
            None if self.inbound.read_buffer().is_empty() => Ok(None),
            None => self.recv().await.map(Some),
        }
    }

    /// Function that forwards the token to the next node after the hop delay.
    pub async fn send(&mut self, token: Token) -> Result<(), RingError> {
        sleep(self.hop_delay).await;
        self.outbound.send(token).await.map_err(|e| match e {
            RingError::Io(e) => RingError::from_write(e, TOKEN_WIRE_SIZE),
            e => e,
        })
    }
}
