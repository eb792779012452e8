use thiserror::Error;

/// Errors raised while opening or reading an upstream call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    #[error("invalid upstream address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("rpc error: code = {code:?} desc = {message}")]
    Status { code: tonic::Code, message: String },
}

impl From<tonic::Status> for UpstreamError {
    fn from(status: tonic::Status) -> Self {
        UpstreamError::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
