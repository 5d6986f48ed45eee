//! Newline-delimited framing over a pair of byte streams.
//!
//! # Wire Format
//!
//! Each message is serialized as a single line of JSON, followed by a
//! newline character. There is no length prefix and no multi-line frame.
//! A trailing `\r` is tolerated on incoming frames.
//!
//! Reads are cancel safe: bytes of a frame that arrive before a read is
//! abandoned (for example by a timeout) are kept and completed by the next
//! read.
//!
//! [`LineChannel`] works over any tokio reader/writer pair: the spawned
//! server's pipes in production, an in-memory duplex pipe in tests.

use crate::error::TransportError;
use crate::traits::Transport;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum allowed frame size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A [`Transport`] framing messages as lines over a reader and a writer.
#[derive(Debug)]
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    max_frame: usize,
    pending: Vec<u8>,
    eof: bool,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a channel reading frames from `reader` and writing to `writer`.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_frame: MAX_MESSAGE_SIZE,
            pending: Vec::new(),
            eof: false,
        }
    }
}

impl<R, W> Transport for LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > self.max_frame {
            return Err(TransportError::MessageTooLarge {
                size: frame.len(),
                max: self.max_frame,
            });
        }

        self.writer.write_all(frame).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.eof {
            return Ok(None);
        }

        let limit = (self.max_frame + 1).saturating_sub(self.pending.len()) as u64;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.pending)
            .await?;

        if read == 0 && self.pending.is_empty() {
            self.eof = true;
            return Ok(None);
        }

        let mut frame = std::mem::take(&mut self.pending);
        if frame.last() == Some(&b'\n') {
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
        } else if frame.len() > self.max_frame {
            return Err(TransportError::MessageTooLarge {
                size: frame.len(),
                max: self.max_frame,
            });
        } else {
            // Unterminated last line.
            self.eof = true;
        }

        tracing::trace!(len = frame.len(), "read frame");
        Ok(Some(frame))
    }

    fn is_connected(&self) -> bool {
        !self.eof
    }
}
