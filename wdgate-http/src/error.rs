use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::error;

/// Error envelope returned before any stream is opened.
///
/// Always sent with `200 OK`; the failure is carried by `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: i32, message: String) -> Self {
        Self { code, message }
    }

    pub fn bad_request(message: String) -> Self {
        Self::new(400, message)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// JSON body extractor reporting failures as an [`ErrorResponse`].
///
/// Unlike `axum::Json` it does not insist on a JSON content type: the body is
/// read in full and parsed as is.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            let message = rejection.body_text();
            error!("Failed to read request body: {}", message);
            ErrorResponse::bad_request(message)
        })?;

        serde_json::from_slice(&body).map(ApiJson).map_err(|e| {
            error!("JSON deserialization error: {}", e);
            ErrorResponse::bad_request(e.to_string())
        })
    }
}
