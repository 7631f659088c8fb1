use crate::llm::{Message, Role};

use super::budget::estimate_tokens;

/// Drop the oldest non-system messages until the estimate fits `token_limit`.
///
/// Stops early when one message is left, or when only system messages remain;
/// the result may then still be over budget. When the dropped message is an
/// assistant tool-call request, the tool results answering it that follow it
/// go in the same step, as long as one message survives. That can remove
/// more than the budget strictly needs; it keeps tool results from being
/// orphaned.
///
/// Returns the number of messages removed.
pub fn trim_to_token_limit(conversation: &mut Vec<Message>, token_limit: usize) -> usize {
    let mut removed = 0;

    while conversation.len() > 1 && estimate_tokens(conversation) > token_limit {
        let Some(start) = conversation.iter().position(|m| m.role != Role::System) else {
            break;
        };

        let mut end = start + 1;
        if conversation[start].has_tool_calls() {
            while end < conversation.len() && answers(&conversation[start], &conversation[end]) {
                end += 1;
            }
            if end - start >= conversation.len() {
                end = start + 1;
            }
        }

        conversation.drain(start..end);
        removed += end - start;
    }

    if removed > 0 {
        metrics::counter!("chat.trimmed_messages").increment(removed as u64);
        tracing::debug!(
            removed,
            remaining = conversation.len(),
            estimate = estimate_tokens(conversation),
            "Trimmed conversation to token limit"
        );
    }

    removed
}

/// Whether `reply` is a tool result for one of `request`'s tool calls.
fn answers(request: &Message, reply: &Message) -> bool {
    reply.role == Role::Tool
        && reply
            .tool_call_id
            .as_deref()
            .is_some_and(|id| request.tool_calls.iter().any(|tc| tc.id == id))
}
