//! The frame-level transport abstraction.

use crate::error::TransportError;
use std::future::Future;

/// A bidirectional channel carrying newline-delimited frames.
///
/// A frame is one encoded message without its terminating newline. The
/// exchange engine encodes and decodes; transports only move frames.
pub trait Transport {
    /// Write one frame followed by a newline, then flush.
    fn send_frame(
        &mut self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read exactly one frame.
    ///
    /// Returns `Ok(None)` once the stream has ended, and again on every
    /// later call.
    fn recv_frame(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Check whether the channel can still deliver frames.
    fn is_connected(&self) -> bool;
}

impl<T: Transport> Transport for &mut T {
    fn send_frame(
        &mut self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).send_frame(frame)
    }

    fn recv_frame(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send {
        (**self).recv_frame()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
