//! Conversation size control: a heuristic token estimate and the trimmer
//! that keeps a conversation under the configured ceiling.

mod budget;
mod trim;

pub use budget::{estimate_tokens, TOKENS_PER_MESSAGE, TOKENS_PER_WORD};
pub use trim::trim_to_token_limit;
