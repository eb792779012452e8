use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::error::UpstreamError;
use crate::proto::{CallRequest, CallResponse};

const SERVICE_NAME: &str = "proto.AgentService";
const CALL_PATH: &str = "/proto.AgentService/Call";

/// Messages of one server-streaming call. `None` marks a clean end of stream,
/// an `Err` item terminates the stream with an error.
pub type CallStream = BoxStream<'static, Result<CallResponse, UpstreamError>>;

/// Anything able to open a streaming agent call.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Open the call. An `Err` here means the call was never established.
    async fn call(&self, request: CallRequest) -> Result<CallStream, UpstreamError>;
}

/// gRPC client of the agent runtime service.
///
/// Built once at startup; clones share the same underlying channel so a single
/// instance serves every concurrent call.
#[derive(Clone)]
pub struct AgentServiceClient {
    inner: tonic::client::Grpc<Channel>,
    endpoint: String,
}

impl AgentServiceClient {
    /// Validate the address and create a lazily connecting client.
    /// No network traffic happens until the first call.
    pub fn connect_lazy(addr: &str) -> Result<Self, UpstreamError> {
        let endpoint = normalize_endpoint(addr);

        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| UpstreamError::InvalidAddress {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_timeout(Duration::from_secs(10))
            .keep_alive_while_idle(true)
            .tcp_nodelay(true)
            .connect_lazy();

        info!("Agent runtime client configured for {}", endpoint);

        Ok(Self {
            inner: tonic::client::Grpc::new(channel),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Raw `Call` RPC returning tonic's message stream.
    pub async fn open_call(
        &self,
        request: CallRequest,
    ) -> Result<Streaming<CallResponse>, tonic::Status> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {}", e)))?;

        let mut request = tonic::Request::new(request);
        request
            .extensions_mut()
            .insert(tonic::GrpcMethod::new(SERVICE_NAME, "Call"));

        let response = grpc
            .server_streaming(
                request,
                PathAndQuery::from_static(CALL_PATH),
                ProstCodec::default(),
            )
            .await?;

        Ok(response.into_inner())
    }
}

#[async_trait]
impl AgentRuntime for AgentServiceClient {
    async fn call(&self, request: CallRequest) -> Result<CallStream, UpstreamError> {
        let task_code = request.task_code.clone();
        debug!("[{}] Opening upstream call on {}", task_code, self.endpoint);

        let stream = self.open_call(request).await?;

        debug!("[{}] Upstream call established", task_code);
        Ok(stream.map_err(UpstreamError::from).boxed())
    }
}

/// Turn `host:port` or `grpc://host:port` into the `http://` URI tonic expects.
fn normalize_endpoint(addr: &str) -> String {
    if let Some(rest) = addr.strip_prefix("grpc://") {
        format!("http://{}", rest)
    } else if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("127.0.0.1:50002"), "http://127.0.0.1:50002");
        assert_eq!(normalize_endpoint("grpc://agent:50002"), "http://agent:50002");
        assert_eq!(normalize_endpoint("http://agent:50002"), "http://agent:50002");
        assert_eq!(normalize_endpoint("https://agent"), "https://agent");
    }

    #[tokio::test]
    async fn test_connect_lazy_accepts_bare_address() {
        let client = AgentServiceClient::connect_lazy("127.0.0.1:50002").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:50002");
    }

    #[tokio::test]
    async fn test_connect_lazy_rejects_malformed_address() {
        let err = AgentServiceClient::connect_lazy("not a uri")
            .err()
            .expect("malformed address must be rejected");
        assert!(matches!(err, UpstreamError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_call_to_unreachable_runtime_fails_at_open() {
        // port 9 (discard) is not expected to run a gRPC server
        let client = AgentServiceClient::connect_lazy("127.0.0.1:9").unwrap();
        let result = client.call(CallRequest::default()).await;
        assert!(matches!(result, Err(UpstreamError::Status { .. })));
    }
}
