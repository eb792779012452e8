pub mod handler;

pub use handler::{assign_task_code, handle_agent_call};
