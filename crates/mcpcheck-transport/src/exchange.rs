//! The request/response exchange engine.
//!
//! [`Exchange`] turns method calls into frames and frames into responses:
//!
//! - [`send`](Exchange::send) builds a request with the next id and writes it
//! - [`notify`](Exchange::notify) writes a one-way notification
//! - [`receive`](Exchange::receive) reads and decodes exactly one frame
//! - [`exchange`](Exchange::exchange) sends, receives and checks that the
//!   reply carries the request's id
//!
//! The engine is strictly sequential. At most one request is outstanding and
//! there is no reordering; a server that answers out of order is reported as
//! an id mismatch. The one exception is a late reply to an earlier request
//! that timed out: its id is lower than the outstanding one, so it is logged
//! and skipped while the wait for the real reply continues.
//!
//! Every frame written or read is logged at `info` under the
//! `mcpcheck::transcript` target, which forms the run transcript.

use crate::error::{TransportError, TransportErrorKind};
use crate::traits::Transport;
use mcpcheck_core::protocol::{Notification, Request, RequestId, Response};
use mcpcheck_core::types::preview;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use mcpcheck_core::types::normalize_content;

/// Default bound on how long [`Exchange::receive`] waits for a frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of each frame shown in the `info` transcript.
const TRANSCRIPT_PREVIEW: usize = 300;

/// A sequential JSON-RPC client over a [`Transport`].
#[derive(Debug)]
pub struct Exchange<T> {
    transport: T,
    next_id: u64,
    read_timeout: Option<Duration>,
}

impl<T: Transport> Exchange<T> {
    /// Create an engine over the given transport. Ids start at 1.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Set the receive bound. `None` waits forever.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Number of requests sent so far.
    #[must_use]
    pub const fn sent_count(&self) -> u64 {
        self.next_id - 1
    }

    /// Send a request and return the id assigned to it.
    ///
    /// The id is consumed even if the write fails, so ids are never reused.
    pub async fn send(
        &mut self,
        method: impl Into<Cow<'static, str>>,
        params: Option<Value>,
    ) -> Result<RequestId, TransportError> {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        let request = Request::new(method, id.clone()).params(params);

        info!(
            target: "mcpcheck::transcript",
            id = %id,
            method = %request.method,
            ">>> sending request"
        );
        self.write_frame(&request).await?;
        Ok(id)
    }

    /// Send a one-way notification. Nothing is read back.
    pub async fn notify(
        &mut self,
        method: impl Into<Cow<'static, str>>,
        params: Option<Value>,
    ) -> Result<(), TransportError> {
        let notification = Notification::new(method).params(params);

        info!(
            target: "mcpcheck::transcript",
            method = %notification.method,
            ">>> sending notification"
        );
        self.write_frame(&notification).await
    }

    /// Read exactly one frame and decode it as a response.
    pub async fn receive(&mut self) -> Result<Response, TransportError> {
        let deadline = self.deadline();
        self.receive_by(deadline).await
    }

    /// Send a request and wait for its response.
    ///
    /// A reply with a lower numeric id answers an earlier request that timed
    /// out; it is discarded and the wait continues within the same bound.
    /// Any other id fails with [`TransportError::IdMismatch`]. Once the
    /// server's output has ended, or its input is gone, the exchange fails
    /// with [`TransportError::NoResponse`].
    pub async fn exchange(
        &mut self,
        method: impl Into<Cow<'static, str>>,
        params: Option<Value>,
    ) -> Result<Response, TransportError> {
        if !self.transport.is_connected() {
            return Err(TransportError::NoResponse);
        }
        let id = match self.send(method, params).await {
            Err(e) if e.kind() == TransportErrorKind::ConnectionClosed => {
                debug!(error = %e, "server input closed");
                return Err(TransportError::NoResponse);
            }
            sent => sent?,
        };

        let deadline = self.deadline();
        loop {
            let response = self.receive_by(deadline).await?;
            if response.answers(&id) {
                return Ok(response);
            }
            if is_stale(response.id.as_ref(), &id) {
                warn!(
                    stale = ?response.id,
                    expected = %id,
                    "discarding late reply to an earlier request"
                );
                continue;
            }
            return Err(TransportError::IdMismatch {
                expected: id,
                actual: response.id,
            });
        }
    }

    /// When the current wait must end. A bound too large to represent is
    /// treated as no bound.
    fn deadline(&self) -> Option<(Instant, Duration)> {
        let limit = self.read_timeout?;
        Instant::now().checked_add(limit).map(|at| (at, limit))
    }

    async fn receive_by(
        &mut self,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<Response, TransportError> {
        let frame = match deadline {
            Some((at, limit)) => tokio::time::timeout_at(at, self.transport.recv_frame())
                .await
                .map_err(|_| TransportError::timeout("waiting for server response", limit))??,
            None => self.transport.recv_frame().await?,
        };

        let Some(frame) = frame else {
            return Err(TransportError::NoResponse);
        };

        let raw = String::from_utf8_lossy(&frame);
        info!(target: "mcpcheck::transcript", "<<< {}", preview(&raw, TRANSCRIPT_PREVIEW));
        if raw.chars().count() > TRANSCRIPT_PREVIEW {
            debug!(target: "mcpcheck::transcript", "<<< {raw}");
        }

        serde_json::from_slice(&frame).map_err(|source| TransportError::MalformedJson {
            raw: raw.into_owned(),
            source,
        })
    }

    async fn write_frame<M: Serialize>(&mut self, message: &M) -> Result<(), TransportError> {
        // Compact serde_json output escapes newlines, so a frame is one line.
        let frame = serde_json::to_vec(message)?;
        info!(
            target: "mcpcheck::transcript",
            "    {}",
            preview(&String::from_utf8_lossy(&frame), TRANSCRIPT_PREVIEW)
        );
        self.transport.send_frame(&frame).await
    }
}

fn is_stale(actual: Option<&RequestId>, outstanding: &RequestId) -> bool {
    matches!(
        (actual, outstanding),
        (Some(RequestId::Number(late)), RequestId::Number(current)) if late < current
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdio::LineChannel;
    use serde_json::json;
    use tokio::io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf, duplex,
        split,
    };

    type TestChannel = LineChannel<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// The server's end of an in-memory pipe.
    struct FakeServer {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeServer {
        async fn next_request(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn reply(&mut self, frame: &str) {
            self.writer.write_all(frame.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }
    }

    fn pair() -> (Exchange<TestChannel>, FakeServer) {
        let (near, far) = duplex(64 * 1024);
        let (near_read, near_write) = split(near);
        let (far_read, far_write) = split(far);
        let exchange = Exchange::new(LineChannel::new(BufReader::new(near_read), near_write));
        let server = FakeServer {
            lines: BufReader::new(far_read).lines(),
            writer: far_write,
        };
        (exchange, server)
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let (mut exchange, mut server) = pair();
        assert_eq!(exchange.sent_count(), 0);

        for expected in 1..=4u64 {
            let id = exchange.send("prompts/list", None).await.unwrap();
            assert_eq!(id, RequestId::Number(expected));
            let request = server.next_request().await;
            assert_eq!(request["id"], expected);
            assert_eq!(request["jsonrpc"], "2.0");
            assert!(request.get("params").is_none());
        }
        assert_eq!(exchange.sent_count(), 4);
    }

    #[tokio::test]
    async fn test_notification_consumes_no_id() {
        let (mut exchange, mut server) = pair();
        exchange
            .notify("notifications/initialized", None)
            .await
            .unwrap();
        let notification = server.next_request().await;
        assert!(notification.get("id").is_none());
        assert_eq!(notification["method"], "notifications/initialized");

        let id = exchange.send("prompts/list", None).await.unwrap();
        assert_eq!(id, RequestId::Number(1));
    }

    #[tokio::test]
    async fn test_exchange_pairs_reply() {
        let (mut exchange, mut server) = pair();
        let params = json!({"name": "gemara-system-prompt"});

        let client = async {
            exchange
                .exchange("prompts/get", Some(params.clone()))
                .await
                .unwrap()
        };
        let fake = async {
            let request = server.next_request().await;
            assert_eq!(request["params"], params);
            server
                .reply(r#"{"jsonrpc":"2.0","id":1,"result":{"messages":[]}}"#)
                .await;
        };
        let (response, ()) = tokio::join!(client, fake);
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_id_mismatch_is_flagged() {
        let (mut exchange, mut server) = pair();
        server
            .reply(r#"{"jsonrpc":"2.0","id":2,"result":{}}"#)
            .await;
        let err = exchange.exchange("initialize", None).await.unwrap_err();
        match err {
            TransportError::IdMismatch { expected, actual } => {
                assert_eq!(expected, RequestId::Number(1));
                assert_eq!(actual, Some(RequestId::Number(2)));
            }
            other => panic!("expected id mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_stream_is_no_response() {
        let (mut exchange, server) = pair();
        drop(server);
        assert!(matches!(
            exchange.receive().await,
            Err(TransportError::NoResponse)
        ));
        assert!(matches!(
            exchange.receive().await,
            Err(TransportError::NoResponse)
        ));
        assert!(matches!(
            exchange.exchange("prompts/get", None).await,
            Err(TransportError::NoResponse)
        ));
    }

    #[tokio::test]
    async fn test_write_to_departed_server_is_no_response() {
        let (mut exchange, server) = pair();
        drop(server);
        assert!(matches!(
            exchange.exchange("initialize", None).await,
            Err(TransportError::NoResponse)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_to_timed_out_request_is_skipped() {
        let (exchange, mut server) = pair();
        let mut exchange = exchange.with_read_timeout(Some(Duration::from_secs(2)));

        let err = exchange.exchange("prompts/get", None).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));

        let client = async { exchange.exchange("prompts/get", None).await.unwrap() };
        let fake = async {
            assert_eq!(server.next_request().await["id"], 1);
            assert_eq!(server.next_request().await["id"], 2);
            server
                .reply(r#"{"jsonrpc":"2.0","id":1,"result":{"late":true}}"#)
                .await;
            server
                .reply(r#"{"jsonrpc":"2.0","id":2,"result":{"late":false}}"#)
                .await;
        };
        let (response, ()) = tokio::join!(client, fake);
        assert_eq!(response.id, Some(RequestId::Number(2)));
        assert_eq!(response.result.unwrap()["late"], false);
    }

    #[tokio::test]
    async fn test_higher_or_string_id_is_still_a_mismatch() {
        let (mut exchange, mut server) = pair();
        server
            .reply(r#"{"jsonrpc":"2.0","id":"1","result":{}}"#)
            .await;
        assert!(matches!(
            exchange.exchange("initialize", None).await,
            Err(TransportError::IdMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_raw_text() {
        let (mut exchange, mut server) = pair();
        server.reply("Error: something went wrong").await;
        let err = exchange.receive().await.unwrap_err();
        assert_eq!(err.raw_frame(), Some("Error: something went wrong"));
    }

    #[tokio::test]
    async fn test_blank_line_is_malformed() {
        let (mut exchange, mut server) = pair();
        server.reply("").await;
        assert!(matches!(
            exchange.receive().await,
            Err(TransportError::MalformedJson { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_is_bounded() {
        let (exchange, _server) = pair();
        let mut exchange = exchange.with_read_timeout(Some(Duration::from_secs(2)));
        let err = exchange.receive().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Timeout { duration, .. } if duration == Duration::from_secs(2)
        ));
    }

    #[tokio::test]
    async fn test_application_error_is_not_a_transport_error() {
        let (mut exchange, mut server) = pair();
        server
            .reply(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"prompt not found"}}"#)
            .await;
        let response = exchange.exchange("prompts/get", None).await.unwrap();
        assert_eq!(response.error.unwrap().message, "prompt not found");
    }
}
