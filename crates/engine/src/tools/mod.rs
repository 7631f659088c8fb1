pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod summary;
pub mod truncation;

pub use dispatch::{dispatch_tool_calls, DispatchError};
pub use handlers::{register_erp_tools, ErpTool, ErpToolContext};
pub use registry::{ToolHandler, ToolRegistry};
