pub mod http;
pub mod apis;
pub mod cors;
pub mod error;
pub mod session;
pub mod streaming;

pub use error::{ApiJson, ErrorResponse};
pub use session::{RelayOutcome, StreamSession};
pub use streaming::{BridgeClosed, BridgeHandle, FrameStream};
pub use http::{router, start_server, ServerConfig, ServerState};
