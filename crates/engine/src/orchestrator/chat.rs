use std::sync::Arc;

use tracing::Instrument;

use erpchat_common::api::chat::ChatResponse;
use erpchat_common::types::ToolUsageEntry;
use erpchat_common::ChatRequestId;

use crate::conversation::trim_to_token_limit;
use crate::llm::{LlmCaller, LlmError, Message, Role, ToolChoice};
use crate::tools::{dispatch_tool_calls, DispatchError, ToolRegistry};

/// Returned for every chat request while no API key is configured.
pub const MISSING_API_KEY: &str = "OpenAI API key is not set in settings.";

/// Everything that can end a chat request early. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Drives one question through the model, with at most one round of tool calls.
///
/// Seed the system prompt, trim, ask with tools offered. If the model answers
/// directly that is the result. Otherwise run its tool calls, trim again and
/// ask once more with no tools, so a request makes at most two model calls.
pub struct ChatOrchestrator {
    llm: Option<Arc<dyn LlmCaller>>,
    registry: Arc<ToolRegistry>,
    token_limit: usize,
}

impl ChatOrchestrator {
    /// `llm` is `None` when no API key is configured.
    pub fn new(
        llm: Option<Arc<dyn LlmCaller>>,
        registry: Arc<ToolRegistry>,
        token_limit: usize,
    ) -> Self {
        Self {
            llm,
            registry,
            token_limit,
        }
    }

    /// Answer the conversation. Failures come back as an error response, never as a fault.
    pub async fn ask(&self, conversation: Vec<Message>, system_prompt: &str) -> ChatResponse {
        let request_id = ChatRequestId::new();
        let span = tracing::info_span!("chat", request_id = %request_id);
        metrics::counter!("chat.requests").increment(1);

        let mut usage = Vec::new();
        let outcome = self
            .run(conversation, system_prompt, &mut usage)
            .instrument(span.clone())
            .await;

        match outcome {
            Ok(message) => ChatResponse::Answer {
                message,
                tool_usage: usage,
            },
            Err(e) => {
                metrics::counter!("chat.errors").increment(1);
                span.in_scope(|| {
                    tracing::error!(error = %e, tool_calls = usage.len(), "Chat request failed");
                });
                ChatResponse::error(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        mut conversation: Vec<Message>,
        system_prompt: &str,
        usage: &mut Vec<ToolUsageEntry>,
    ) -> Result<Message, ChatError> {
        let llm = self
            .llm
            .as_deref()
            .ok_or_else(|| ChatError::Config(MISSING_API_KEY.into()))?;

        if !matches!(conversation.first(), Some(m) if m.role == Role::System) {
            conversation.insert(0, Message::system(system_prompt));
        }

        trim_to_token_limit(&mut conversation, self.token_limit);
        tracing::debug!(messages = conversation.len(), "Sending conversation");

        let first = llm
            .chat(&conversation, self.registry.definitions(), Some(ToolChoice::Auto))
            .await?;

        if !first.message.has_tool_calls() {
            tracing::info!(
                finish_reason = ?first.finish_reason,
                output_tokens = first.usage.output_tokens,
                "Answered without tools"
            );
            return Ok(first.message);
        }

        let tool_calls = first.message.tool_calls.clone();
        tracing::info!(
            tool_calls = tool_calls.len(),
            tools = ?tool_calls.iter().map(|tc| tc.function_name.as_str()).collect::<Vec<_>>(),
            "Model requested tools"
        );
        conversation.push(first.message);

        dispatch_tool_calls(&self.registry, &tool_calls, &mut conversation, usage).await?;

        trim_to_token_limit(&mut conversation, self.token_limit);

        let second = llm.chat(&conversation, &[], None).await?;
        tracing::info!(
            finish_reason = ?second.finish_reason,
            output_tokens = second.usage.output_tokens,
            "Answered with tool results"
        );
        Ok(second.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FinishReason, LlmResponse, TokenUsage, ToolCallRequest, ToolDefinition};
    use crate::tools::ToolHandler;
    use erpchat_common::types::ToolUsageStatus;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// What the mock saw on one call.
    struct SeenCall {
        messages: Vec<Message>,
        tool_count: usize,
        tool_choice: Option<ToolChoice>,
    }

    /// Replays queued responses and records every call.
    #[derive(Default)]
    struct MockLlm {
        responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        calls: Mutex<Vec<SeenCall>>,
    }

    impl MockLlm {
        fn with(responses: Vec<Result<LlmResponse, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::default(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl LlmCaller for MockLlm {
        fn chat<'a>(
            &'a self,
            messages: &'a [Message],
            tools: &'a [ToolDefinition],
            tool_choice: Option<ToolChoice>,
        ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
            self.calls.lock().unwrap().push(SeenCall {
                messages: messages.to_vec(),
                tool_count: tools.len(),
                tool_choice,
            });
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Api("no response queued".into())));
            Box::pin(async move { next })
        }
    }

    fn reply(text: &str) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            message: Message::assistant(text),
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::default(),
        })
    }

    fn tool_request(calls: Vec<(&str, &str, &str)>) -> Result<LlmResponse, LlmError> {
        let calls = calls
            .into_iter()
            .map(|(id, name, args)| ToolCallRequest {
                id: id.into(),
                function_name: name.into(),
                arguments: args.into(),
            })
            .collect();
        Ok(LlmResponse {
            message: Message::assistant_tool_calls(None, calls),
            finish_reason: FinishReason::ToolCalls,
            usage: TokenUsage::default(),
        })
    }

    fn customers_registry() -> Arc<ToolRegistry> {
        let handler: ToolHandler = Arc::new(|args| {
            Box::pin(async move {
                let name = args["customer_name"].as_str().unwrap_or_default().to_string();
                Ok(json!({
                    "results": [{"name": "CUST-0001", "customer_name": format!("{} Inc", name)}],
                    "total_count": 1,
                }))
            })
        });
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDefinition {
                name: "get_customers".into(),
                description: "Get a list of customers by name".into(),
                parameters: json!({"type": "object", "properties": {"customer_name": {"type": "string"}}, "required": []}),
            },
            handler,
        );
        Arc::new(registry)
    }

    fn orchestrator(llm: &Arc<MockLlm>) -> ChatOrchestrator {
        let caller: Arc<dyn LlmCaller> = llm.clone();
        ChatOrchestrator::new(Some(caller), customers_registry(), 8000)
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let llm = MockLlm::with(vec![reply("Hello! How can I help?")]);
        let response = orchestrator(&llm)
            .ask(vec![Message::user("hi")], "You are an ERP assistant.")
            .await;

        match response {
            ChatResponse::Answer { message, tool_usage } => {
                assert_eq!(message.text(), "Hello! How can I help?");
                assert!(tool_usage.is_empty());
            }
            other => panic!("Expected answer, got {:?}", other),
        }
        assert_eq!(llm.call_count(), 1);

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].tool_count, 1);
        assert_eq!(calls[0].tool_choice, Some(ToolChoice::Auto));
        assert_eq!(calls[0].messages[0], Message::system("You are an ERP assistant."));
        assert_eq!(calls[0].messages[1], Message::user("hi"));
    }

    #[tokio::test]
    async fn test_one_tool_round_trip() {
        let llm = MockLlm::with(vec![
            tool_request(vec![("call_1", "get_customers", r#"{"customer_name": "Acme"}"#)]),
            reply("Acme Inc is customer CUST-0001."),
            reply("never sent"),
        ]);
        let response = orchestrator(&llm)
            .ask(vec![Message::user("Who is Acme?")], "prompt")
            .await;

        let ChatResponse::Answer { message, tool_usage } = response else {
            panic!("Expected answer");
        };
        assert_eq!(message.text(), "Acme Inc is customer CUST-0001.");
        assert_eq!(tool_usage.len(), 1);
        assert_eq!(tool_usage[0].tool_name, "get_customers");
        assert_eq!(tool_usage[0].status, ToolUsageStatus::Success);
        assert_eq!(tool_usage[0].parameters, json!({"customer_name": "Acme"}));

        assert_eq!(llm.call_count(), 2);
        let calls = llm.calls.lock().unwrap();
        let second = &calls[1];
        assert_eq!(second.tool_count, 0);
        assert_eq!(second.tool_choice, None);
        assert_eq!(second.messages.len(), 4);
        assert!(second.messages[2].has_tool_calls());
        let tool_msg = &second.messages[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_msg.name.as_deref(), Some("get_customers"));
        assert!(tool_msg.text().contains("Acme Inc"));
    }

    #[tokio::test]
    async fn test_several_tool_calls_still_two_model_calls() {
        let llm = MockLlm::with(vec![
            tool_request(vec![
                ("call_1", "get_customers", r#"{"customer_name": "Acme"}"#),
                ("call_2", "get_customers", r#"{"customer_name": "Globex"}"#),
            ]),
            reply("Both found."),
        ]);
        let response = orchestrator(&llm).ask(vec![Message::user("compare")], "prompt").await;

        assert_eq!(response.tool_usage().len(), 2);
        assert_eq!(llm.call_count(), 2);
        let calls = llm.calls.lock().unwrap();
        let ids: Vec<_> = calls[1]
            .messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["call_1", "call_2"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_error_without_second_call() {
        let llm = MockLlm::with(vec![
            tool_request(vec![("call_1", "get_payroll", "{}")]),
            reply("never sent"),
        ]);
        let response = orchestrator(&llm).ask(vec![Message::user("payroll?")], "prompt").await;

        match response {
            ChatResponse::Error { error, tool_usage } => {
                assert_eq!(error, "Function get_payroll not found.");
                assert!(tool_usage.is_empty());
            }
            other => panic!("Expected error, got {:?}", other),
        }
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_error_response() {
        let llm = MockLlm::with(vec![Err(LlmError::Auth("Incorrect API key provided".into()))]);
        let response = orchestrator(&llm).ask(vec![Message::user("hi")], "prompt").await;

        assert!(response.is_error());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Incorrect API key"));
        assert_eq!(json["tool_usage"], json!([]));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let orchestrator = ChatOrchestrator::new(None, customers_registry(), 8000);
        let response = orchestrator.ask(vec![Message::user("hi")], "prompt").await;

        let ChatResponse::Error { error, tool_usage } = response else {
            panic!("Expected error");
        };
        assert_eq!(error, MISSING_API_KEY);
        assert!(tool_usage.is_empty());
    }

    #[tokio::test]
    async fn test_existing_system_message_is_kept() {
        let llm = MockLlm::with(vec![reply("ok")]);
        orchestrator(&llm)
            .ask(
                vec![Message::system("custom prompt"), Message::user("hi")],
                "ignored",
            )
            .await;

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].messages.len(), 2);
        assert_eq!(calls[0].messages[0].text(), "custom prompt");
    }

    #[tokio::test]
    async fn test_empty_conversation_gets_seeded() {
        let llm = MockLlm::with(vec![reply("Hello.")]);
        orchestrator(&llm).ask(Vec::new(), "seed").await;

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].messages, vec![Message::system("seed")]);
    }

    #[tokio::test]
    async fn test_long_history_is_trimmed_before_sending() {
        let llm = MockLlm::with(vec![reply("ok")]);
        let caller: Arc<dyn LlmCaller> = llm.clone();
        let orchestrator = ChatOrchestrator::new(Some(caller), customers_registry(), 100);

        let history: Vec<Message> = (0..50)
            .map(|i| Message::user(format!("question {} {}", i, vec!["word"; 40].join(" "))))
            .collect();
        orchestrator.ask(history, "seed").await;

        let calls = llm.calls.lock().unwrap();
        let sent = &calls[0].messages;
        assert_eq!(sent[0].role, Role::System);
        assert!(crate::conversation::estimate_tokens(sent) <= 100 || sent.len() == 1);
        assert!(sent.last().unwrap().text().starts_with("question 49"));
    }

    #[tokio::test]
    async fn test_second_call_failure_becomes_error_response() {
        let llm = MockLlm::with(vec![
            tool_request(vec![("call_1", "get_customers", r#"{"customer_name": "Acme"}"#)]),
            Err(LlmError::Api("500 Internal Server Error: upstream overloaded".into())),
        ]);
        let response = orchestrator(&llm).ask(vec![Message::user("Who is Acme?")], "prompt").await;

        let ChatResponse::Error { error, tool_usage } = response else {
            panic!("Expected error");
        };
        assert!(error.contains("upstream overloaded"));
        assert!(tool_usage.is_empty());
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_tool_results_are_trimmed_before_second_call() {
        let handler: ToolHandler = Arc::new(|_| {
            Box::pin(async move {
                Ok(json!({
                    "results": [{"note": vec!["detail"; 30].join(" ")}],
                    "total_count": 1,
                }))
            })
        });
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDefinition {
                name: "get_customers".into(),
                description: "Get a list of customers by name".into(),
                parameters: json!({"type": "object", "properties": {}, "required": []}),
            },
            handler,
        );

        let llm = MockLlm::with(vec![
            tool_request(vec![("call_1", "get_customers", "{}")]),
            reply("Acme is a customer."),
        ]);
        let caller: Arc<dyn LlmCaller> = llm.clone();
        let orchestrator = ChatOrchestrator::new(Some(caller), Arc::new(registry), 60);

        let history = vec![
            Message::user("What did we sell?"),
            Message::assistant("Plenty."),
            Message::user("Who is Acme?"),
        ];
        let response = orchestrator.ask(history, "prompt").await;
        assert!(!response.is_error());

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].messages.len(), 4);

        let sent = &calls[1].messages;
        assert_eq!(sent[0].role, Role::System);
        assert!(crate::conversation::estimate_tokens(sent) <= 60 || sent.len() == 1);
        assert!(sent.len() < 6);
        // Whatever survives, a tool result is never left without its request.
        for (i, msg) in sent.iter().enumerate() {
            if msg.role == Role::Tool {
                assert!(sent[i - 1].has_tool_calls() || sent[i - 1].role == Role::Tool);
            }
        }
    }
}
