use crate::llm::Message;

/// Fixed overhead charged for every message that carries content.
pub const TOKENS_PER_MESSAGE: usize = 4;

/// Average tokens per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 1.5;

/// Approximate model-token cost of a conversation.
///
/// This is a word-count heuristic, not a tokenizer. Use it only to compare a
/// conversation against a ceiling, never for billing. Messages without
/// content (pure tool-call requests) cost nothing.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter_map(|m| m.content.as_deref())
        .filter(|content| !content.is_empty())
        .map(|content| {
            let words = content.split_whitespace().count();
            TOKENS_PER_MESSAGE + (words as f64 * TOKENS_PER_WORD) as usize
        })
        .sum()
}
