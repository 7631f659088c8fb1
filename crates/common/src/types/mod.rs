mod message;
mod tool_usage;

pub use message::*;
pub use tool_usage::*;
