pub mod config;
pub mod conversation;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod routes;
pub mod store;
pub mod tools;
