use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::{error, info};
use uuid::Uuid;
use wdgate_rpc::CallRequest;

use crate::session::StreamSession;
use crate::{streaming, ApiJson, ErrorResponse, ServerState};

/// Handle an agent call - relays the upstream message stream
pub async fn handle_agent_call(
    State(state): State<ServerState>,
    ApiJson(mut payload): ApiJson<CallRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    assign_task_code(&mut payload);

    info!(
        "[{}] POST /api/v1/agent/call task_code={} nodes={}",
        request_id,
        payload.task_code,
        payload.plan.len()
    );

    let session = StreamSession::new(request_id.to_string(), payload.task_code.clone());
    let (bridge, frames) = streaming::open(session.id());

    let upstream = match state.runtime.call(payload).await {
        Ok(upstream) => upstream,
        Err(e) => {
            error!(
                "[{}] - [{}] Failed to open upstream call: {}",
                request_id,
                session.task_code(),
                e
            );
            // nothing was streamed yet, so the failure is still a plain JSON reply
            bridge.close();
            return ErrorResponse::bad_request(e.to_string()).into_response();
        }
    };

    session.spawn(upstream, bridge);
    frames.into_response()
}

/// Give the request a fresh correlation id unless the caller supplied one.
pub fn assign_task_code(request: &mut CallRequest) {
    if request.task_code.is_empty() {
        request.task_code = Uuid::new_v4().to_string();
    }
}
