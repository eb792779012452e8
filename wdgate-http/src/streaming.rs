//! Single-slot bridge between an upstream producer and the HTTP response body.
//!
//! [`open`] returns the two halves of a session's handoff:
//! - [`BridgeHandle`], owned by the producer, pushes already serialized frames;
//! - [`FrameStream`], turned into the response body, is polled by the HTTP
//!   connection which writes and flushes each frame as its own chunk.
//!
//! The handoff holds at most one frame, so `send` suspends until the writer
//! has taken the previous one. Dropping the handle closes the stream. Dropping
//! the writer (client disconnect) makes every later `send` fail and wakes
//! [`BridgeHandle::closed`].

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// Frames buffered between producer and writer.
pub const HANDOFF_CAPACITY: usize = 1;

/// The writer side of the bridge is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream closed by the client")]
pub struct BridgeClosed;

/// Create the handoff for one stream session.
pub fn open(session_id: impl Into<String>) -> (BridgeHandle, FrameStream) {
    let session_id = session_id.into();
    let (sender, receiver) = mpsc::channel(HANDOFF_CAPACITY);

    debug!("[{}] Stream bridge opened", session_id);

    let handle = BridgeHandle {
        sender,
        session_id: session_id.clone(),
        frames_sent: 0,
    };
    let frames = FrameStream {
        inner: ReceiverStream::new(receiver),
        session_id,
        polled: false,
        finished: false,
    };
    (handle, frames)
}

/// Producer half of the bridge. Closing is tied to ownership.
pub struct BridgeHandle {
    sender: mpsc::Sender<Bytes>,
    session_id: String,
    frames_sent: u64,
}

impl BridgeHandle {
    /// Deliver one frame, waiting for the writer to free the slot.
    pub async fn send(&mut self, frame: Bytes) -> Result<(), BridgeClosed> {
        self.sender.send(frame).await.map_err(|_| BridgeClosed)?;
        self.frames_sent += 1;
        Ok(())
    }

    /// Serialize `message` as JSON and deliver it as one frame.
    /// A message that fails to serialize is logged and skipped.
    pub async fn send_message<T: Serialize>(&mut self, message: &T) -> Result<(), BridgeClosed> {
        match serde_json::to_vec(message) {
            Ok(data) => self.send(Bytes::from(data)).await,
            Err(e) => {
                error!("[{}] Failed to serialize frame: {}", self.session_id, e);
                Ok(())
            }
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the writer half is gone.
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    /// Signal that no more frames follow.
    pub fn close(self) {}
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        debug!(
            "[{}] Stream bridge closed after {} frames",
            self.session_id, self.frames_sent
        );
    }
}

/// Writer half of the bridge, used as the streaming response body.
pub struct FrameStream {
    inner: ReceiverStream<Bytes>,
    session_id: String,
    polled: bool,
    finished: bool,
}

impl Stream for FrameStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.polled = true;
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(Ok(frame))),
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if self.polled && !self.finished {
            info!("[{}] Client disconnected, tearing down stream", self.session_id);
        }
    }
}

impl IntoResponse for FrameStream {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from_stream(self));
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        response
    }
}
