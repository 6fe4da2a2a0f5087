use crate::{codec::TokenChannel, error::RingError, log, output::Output};
use color_print::cformat;
use tokio::io::{AsyncRead, AsyncWrite};

/// A ring node other than the coordinator.
pub struct Peer<R, W, O> {
    pub index: u32,
    channel: TokenChannel<R, W>,
    output: O,
}

impl<R, W, O> Peer<R, W, O>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: Output,
{
    pub fn new(index: u32, channel: TokenChannel<R, W>, output: O) -> Self {
        Self {
            index,
            channel,
            output,
        }
    }

    /// Function that receives, inspects and forwards the token until the ring breaks.
    pub async fn run(&mut self) -> Result<(), RingError> {
        loop {
            let mut token = self.channel.recv().await?;
            log::debug(&format!("holding {token}"));

            if token.destination == self.index {
                self.output.delivered(self.index, token.payload());
                log::info(&cformat!(
                    "Consumed a <yellow, bold>message</yellow, bold>, sending it back."
                ));
                token.mark_delivered();
            }

            self.channel.send(token).await?;
        }
    }
}
