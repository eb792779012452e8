use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use wdgate_rpc::{CallResponse, CallStream};

use crate::streaming::BridgeHandle;

/// How a stream session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream signalled end of stream.
    Completed,
    /// Upstream failed mid-stream; a terminal 500 frame was sent.
    UpstreamFailed,
    /// The HTTP client went away.
    ClientGone,
}

impl fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayOutcome::Completed => write!(f, "completed"),
            RelayOutcome::UpstreamFailed => write!(f, "upstream failed"),
            RelayOutcome::ClientGone => write!(f, "client gone"),
        }
    }
}

/// One inbound HTTP stream paired with one upstream call.
pub struct StreamSession {
    request_id: String,
    task_code: String,
    started_at: Instant,
}

impl StreamSession {
    pub fn new(request_id: String, task_code: String) -> Self {
        Self {
            request_id,
            task_code,
            started_at: Instant::now(),
        }
    }

    /// Identifier used in bridge logs.
    pub fn id(&self) -> String {
        format!("{} - {}", self.request_id, self.task_code)
    }

    pub fn task_code(&self) -> &str {
        &self.task_code
    }

    /// Run the relay on its own task.
    ///
    /// A panic while relaying is caught here and only ends the session. The
    /// relay future, and the bridge handle it owns, is dropped once the panic
    /// has been logged, which closes the stream.
    pub fn spawn(self, upstream: CallStream, bridge: BridgeHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            let relay = AssertUnwindSafe(self.relay(upstream, bridge));
            if let Err(panic) = relay.catch_unwind().await {
                error!(
                    "[{}] - [{}] Stream session panicked: {}",
                    self.request_id,
                    self.task_code,
                    panic_message(panic.as_ref())
                );
            }
        })
    }

    /// Pull upstream messages and forward each as one frame until either side
    /// ends. A client disconnect is noticed even while upstream is idle.
    /// Dropping `upstream` on return releases the call.
    pub async fn relay(&self, mut upstream: CallStream, mut bridge: BridgeHandle) -> RelayOutcome {
        let outcome = loop {
            let item = tokio::select! {
                _ = bridge.closed() => break RelayOutcome::ClientGone,
                item = upstream.next() => item,
            };
            match item {
                None => break RelayOutcome::Completed,
                Some(Ok(message)) => {
                    if bridge.send_message(&message).await.is_err() {
                        break RelayOutcome::ClientGone;
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        "[{}] - [{}] Upstream stream error: {}",
                        self.request_id, self.task_code, e
                    );
                    let terminal = CallResponse::status(500, e.to_string());
                    if bridge.send_message(&terminal).await.is_err() {
                        break RelayOutcome::ClientGone;
                    }
                    break RelayOutcome::UpstreamFailed;
                }
            }
        };

        info!(
            "[{}] - [{}] Stream {} after {} frames in {:.2}s",
            self.request_id,
            self.task_code,
            outcome,
            bridge.frames_sent(),
            self.started_at.elapsed().as_secs_f64()
        );
        bridge.close();
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
