pub mod client;
pub mod error;
pub mod proto;

pub use client::{AgentRuntime, AgentServiceClient, CallStream};
pub use error::UpstreamError;
pub use proto::{
    AgentServiceCallRequest, AgentServiceCallResponse, AgentServiceNode, AgentServiceResult,
    CallRequest, CallResponse,
};

pub use tonic::{Code, Status};
