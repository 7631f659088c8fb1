mod chat;

pub use chat::{ChatError, ChatOrchestrator, MISSING_API_KEY};
