use serde_json::Value;

use erpchat_common::types::ToolUsageEntry;

use crate::llm::{Message, ToolCallRequest};

use super::registry::ToolRegistry;
use super::summary::summarize;

/// Failures that abort a whole dispatch batch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Function {0} not found.")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {detail}")]
    InvalidArguments { tool: String, detail: String },

    #[error("Error calling function {tool} with args {arguments}: {detail}")]
    ToolFailed {
        tool: String,
        arguments: String,
        detail: String,
    },
}

impl From<DispatchError> for erpchat_common::ErpChatError {
    fn from(e: DispatchError) -> Self {
        erpchat_common::ErpChatError::Dispatch(e.to_string())
    }
}

/// Execute the model's tool calls in order, appending one tool-result
/// message per call to `conversation` and one entry per call to `usage`.
///
/// The first failure aborts the batch: an unknown tool, arguments that are
/// not a JSON object, or a handler error. Results already appended for
/// earlier calls stay in place; the failing call gets a usage entry but no
/// tool-result message.
pub async fn dispatch_tool_calls(
    registry: &ToolRegistry,
    tool_calls: &[ToolCallRequest],
    conversation: &mut Vec<Message>,
    usage: &mut Vec<ToolUsageEntry>,
) -> Result<(), DispatchError> {
    for call in tool_calls {
        let name = call.function_name.as_str();

        let Some(handler) = registry.handler(name) else {
            tracing::error!(
                tool = %name,
                available = ?registry.names(),
                "Model requested an unknown tool"
            );
            metrics::counter!("tools.execution.errors", "tool" => name.to_string()).increment(1);
            let err = DispatchError::UnknownTool(name.to_string());
            usage.push(ToolUsageEntry::failure(name, Value::Null, err.to_string()));
            return Err(err);
        };

        let args = match decode_arguments(&call.arguments) {
            Ok(args) => args,
            Err(detail) => {
                tracing::error!(
                    tool = %name,
                    arguments = %call.arguments,
                    error = %detail,
                    "Malformed tool arguments"
                );
                metrics::counter!("tools.execution.errors", "tool" => name.to_string())
                    .increment(1);
                let err = DispatchError::InvalidArguments {
                    tool: name.to_string(),
                    detail,
                };
                usage.push(ToolUsageEntry::failure(
                    name,
                    Value::String(call.arguments.clone()),
                    err.to_string(),
                ));
                return Err(err);
            }
        };

        let start = std::time::Instant::now();
        tracing::info!(tool = %name, tool_call_id = %call.id, "Tool call started");

        let result = handler(args.clone()).await;

        let latency = start.elapsed().as_secs_f64();
        metrics::histogram!("tools.execution.latency", "tool" => name.to_string()).record(latency);
        metrics::counter!("tools.execution.count", "tool" => name.to_string()).increment(1);

        match result {
            Ok(value) => {
                let content = value.to_string();
                tracing::info!(
                    tool = %name,
                    latency_s = latency,
                    result_len = content.len(),
                    "Tool call succeeded"
                );
                usage.push(ToolUsageEntry::success(name, args, summarize(&value)));
                conversation.push(Message::tool_result(call.id.clone(), name, content));
            }
            Err(detail) => {
                tracing::error!(
                    tool = %name,
                    arguments = %args,
                    latency_s = latency,
                    error = %detail,
                    "Tool call failed"
                );
                metrics::counter!("tools.execution.errors", "tool" => name.to_string())
                    .increment(1);
                let err = DispatchError::ToolFailed {
                    tool: name.to_string(),
                    arguments: args.to_string(),
                    detail,
                };
                usage.push(ToolUsageEntry::failure(name, args, err.to_string()));
                return Err(err);
            }
        }
    }

    Ok(())
}

/// Decode the model's raw argument text; anything but a JSON object is rejected.
fn decode_arguments(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolDefinition};
    use crate::tools::ToolHandler;
    use erpchat_common::types::ToolUsageStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: format!("{} tool", name),
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            function_name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Registry with an echoing customer tool and a tool that always fails.
    fn registry(calls: Arc<AtomicU32>) -> ToolRegistry {
        let echo: ToolHandler = Arc::new(move |args| {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"results": [args], "total_count": 1}))
            })
        });
        let broken: ToolHandler =
            Arc::new(|_args| Box::pin(async { Err("relation \"tabBin\" does not exist".into()) }));

        let mut registry = ToolRegistry::new();
        registry.register(definition("get_customers"), echo);
        registry.register(definition("get_stock_levels"), broken);
        registry
    }

    #[tokio::test]
    async fn test_results_correlate_with_requests() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = registry(Arc::clone(&calls));
        let requests = vec![
            call("call_a", "get_customers", r#"{"customer_name": "Acme"}"#),
            call("call_b", "get_customers", r#"{}"#),
        ];
        let mut conversation = vec![Message::assistant_tool_calls(None, requests.clone())];
        let mut usage = Vec::new();

        dispatch_tool_calls(&registry, &requests, &mut conversation, &mut usage)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(conversation.len(), 3);
        for (msg, req) in conversation[1..].iter().zip(&requests) {
            assert_eq!(msg.role, Role::Tool);
            assert_eq!(msg.tool_call_id.as_deref(), Some(req.id.as_str()));
            assert_eq!(msg.name.as_deref(), Some("get_customers"));
            let matching = conversation[0]
                .tool_calls
                .iter()
                .filter(|tc| Some(tc.id.as_str()) == msg.tool_call_id.as_deref())
                .count();
            assert_eq!(matching, 1);
        }
        let first: Value = serde_json::from_str(conversation[1].text()).unwrap();
        assert_eq!(first["results"][0]["customer_name"], "Acme");

        assert_eq!(usage.len(), 2);
        assert!(usage.iter().all(|u| u.status == ToolUsageStatus::Success));
        assert_eq!(usage[0].parameters["customer_name"], "Acme");
        assert_eq!(usage[0].result_summary.as_deref(), Some("Retrieved 1 record"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal_and_appends_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = registry(Arc::clone(&calls));
        let requests = vec![
            call("call_a", "get_payroll", "{}"),
            call("call_b", "get_customers", "{}"),
        ];
        let mut conversation = Vec::new();
        let mut usage = Vec::new();

        let err = dispatch_tool_calls(&registry, &requests, &mut conversation, &mut usage)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::UnknownTool(ref n) if n == "get_payroll"));
        assert_eq!(err.to_string(), "Function get_payroll not found.");
        assert!(conversation.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(usage[0].status, ToolUsageStatus::Error);
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_fatal() {
        let registry = registry(Arc::new(AtomicU32::new(0)));
        let mut conversation = Vec::new();
        let mut usage = Vec::new();

        for raw in [r#"{"customer_name": "#, "[1, 2]", ""] {
            let requests = vec![call("call_a", "get_customers", raw)];
            let err = dispatch_tool_calls(&registry, &requests, &mut conversation, &mut usage)
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidArguments { .. }), "{}", raw);
        }
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_aborts_remaining_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = registry(Arc::clone(&calls));
        let requests = vec![
            call("call_a", "get_customers", "{}"),
            call("call_b", "get_stock_levels", r#"{"item_code": "WIDGET"}"#),
            call("call_c", "get_customers", "{}"),
        ];
        let mut conversation = Vec::new();
        let mut usage = Vec::new();

        let err = dispatch_tool_calls(&registry, &requests, &mut conversation, &mut usage)
            .await
            .unwrap_err();

        match err {
            DispatchError::ToolFailed { tool, arguments, detail } => {
                assert_eq!(tool, "get_stock_levels");
                assert!(arguments.contains("WIDGET"));
                assert!(detail.contains("tabBin"));
            }
            other => panic!("Expected ToolFailed, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation[0].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[1].status, ToolUsageStatus::Error);
        assert!(usage[1].error.as_deref().unwrap().contains("get_stock_levels"));
    }
}
