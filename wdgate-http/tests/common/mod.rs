#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use futures::future;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;
use tower::ServiceExt;
use wdgate_http::{router, ServerState};
use wdgate_rpc::{AgentRuntime, CallRequest, CallResponse, CallStream, UpstreamError};

/// Scripted stand-in for the agent runtime.
pub enum Script {
    /// The call cannot be established.
    Refuse(UpstreamError),
    /// The call yields these items, then ends.
    Stream(Vec<Result<CallResponse, UpstreamError>>),
    /// The call yields these items, then never produces another.
    Stall(Vec<Result<CallResponse, UpstreamError>>),
}

pub struct FakeRuntime {
    script: Script,
    requests: Mutex<Vec<CallRequest>>,
    releases: Mutex<Vec<oneshot::Receiver<()>>>,
}

impl FakeRuntime {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
            releases: Mutex::new(Vec::new()),
        })
    }

    pub fn streaming(items: Vec<Result<CallResponse, UpstreamError>>) -> Arc<Self> {
        Self::new(Script::Stream(items))
    }

    /// Resolves once the stream of the oldest unclaimed stalled call is dropped.
    pub fn next_release(&self) -> oneshot::Receiver<()> {
        self.releases.lock().unwrap().remove(0)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRuntime for FakeRuntime {
    async fn call(&self, request: CallRequest) -> Result<CallStream, UpstreamError> {
        self.requests.lock().unwrap().push(request);
        match &self.script {
            Script::Refuse(e) => Err(e.clone()),
            Script::Stream(items) => Ok(stream::iter(items.clone()).boxed()),
            Script::Stall(items) => {
                let (release, released) = oneshot::channel::<()>();
                self.releases.lock().unwrap().push(released);
                let stalled = stream::once(async move {
                    let _release = release;
                    future::pending::<Result<CallResponse, UpstreamError>>().await
                });
                Ok(stream::iter(items.clone()).chain(stalled).boxed())
            }
        }
    }
}

pub fn app(runtime: Arc<FakeRuntime>, plugin_dir: PathBuf) -> Router {
    router(ServerState::new(runtime, plugin_dir))
}

pub fn ok(code: i32, message: &str) -> Result<CallResponse, UpstreamError> {
    Ok(CallResponse::status(code, message))
}

pub async fn post_call(app: Router, body: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/api/v1/agent/call")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

/// Split a raw concatenation of JSON frames back into values.
pub fn split_frames(body: &[u8]) -> Vec<Value> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap()
}
