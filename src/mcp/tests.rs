//! MCP Protocol Implementation Tests
//!
//! Unit tests for tool handlers, the registry and message handling.

#[cfg(test)]
mod calculator_tool_tests {
    use crate::mcp::server::ToolHandler;
    use crate::mcp::tools::CalculatorHandler;
    use serde_json::json;

    #[test]
    fn calculator_tool_definition() {
        let tool = CalculatorHandler::tool_definition();

        assert_eq!(tool.name, "calculate");
        assert_eq!(
            tool.description.as_deref(),
            Some(
                "Perform basic arithmetic operations: addition, subtraction, multiplication, \
                 division, power, and modulo. Supports decimal precision control."
            )
        );

        let schema = tool.input_schema;
        let properties = schema["properties"].as_object().expect("has properties");
        assert!(properties.contains_key("operation"));
        assert!(properties.contains_key("a"));
        assert!(properties.contains_key("b"));
        assert!(properties.contains_key("precision"));

        let required = schema["required"].as_array().expect("has required array");
        assert_eq!(required, &vec![json!("operation"), json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn addition_response_text() {
        let result = CalculatorHandler::new()
            .handle(json!({"operation": "add", "a": 10, "b": 5}))
            .await
            .expect("handled");

        assert!(!result.is_error());
        assert_eq!(
            result.text_content(),
            "✅ Calculation Result:\n\n10.0 + 5.0 = 15.0\n\nDetails:\n- Operation: add\n- First Number: 10.0\n- Second Number: 5.0\n- Result: 15.0"
        );
    }

    #[tokio::test]
    async fn string_operands_and_precision() {
        let result = CalculatorHandler::new()
            .handle(json!({"operation": "divide", "a": "100", "b": "3", "precision": 4}))
            .await
            .expect("handled");

        assert!(result.text_content().contains("100.0 ÷ 3.0 = 33.3333"));
    }

    #[tokio::test]
    async fn division_by_zero_is_validation_error() {
        let result = CalculatorHandler::new()
            .handle(json!({"operation": "divide", "a": 1, "b": 0}))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert_eq!(
            result.text_content(),
            "❌ Validation Error: Cannot divide by zero"
        );
    }

    #[tokio::test]
    async fn unknown_operation_is_validation_error() {
        let result = CalculatorHandler::new()
            .handle(json!({"operation": "sqrt", "a": 4, "b": 0}))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert!(result.text_content().starts_with("❌ Validation Error: "));
    }

    #[tokio::test]
    async fn overflow_is_internal_error() {
        let result = CalculatorHandler::new()
            .handle(json!({"operation": "power", "a": 1000, "b": 1000}))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert!(result.text_content().starts_with("❌ Internal Error: "));
    }
}

#[cfg(test)]
mod expense_tool_tests {
    use crate::mcp::server::ToolHandler;
    use crate::mcp::tools::ExpenseTrackerHandler;
    use crate::models::expense::{ExpenseItemRequest, ItemTypeRequest};
    use crate::repositories::{ExpenseApi, RepositoryError};
    use crate::services::ExpenseTrackerService;
    use serde_json::{Value, json};
    use std::sync::Arc;

    /// Backend that answers every call with the same canned value
    struct StaticApi(Value);

    impl ExpenseApi for StaticApi {
        fn create_expense(&self, _request: &ExpenseItemRequest) -> Result<Value, RepositoryError> {
            Ok(self.0.clone())
        }

        fn list_expenses(&self) -> Result<Value, RepositoryError> {
            Ok(self.0.clone())
        }

        fn list_expenses_by_type(&self, _type_id: i64) -> Result<Value, RepositoryError> {
            Ok(self.0.clone())
        }

        fn create_type(&self, _request: &ItemTypeRequest) -> Result<Value, RepositoryError> {
            Ok(self.0.clone())
        }

        fn list_types(&self) -> Result<Value, RepositoryError> {
            Err(RepositoryError::Decode("expected value at line 1".to_string()))
        }
    }

    fn handler(value: Value) -> ExpenseTrackerHandler {
        ExpenseTrackerHandler::new(ExpenseTrackerService::new(Arc::new(StaticApi(value))))
    }

    #[test]
    fn expense_tracker_tool_definition() {
        let tool = ExpenseTrackerHandler::tool_definition();

        assert_eq!(tool.name, "expense_tracker");
        let description = tool.description.expect("has description");
        assert!(description.starts_with("Manage expenses and expense types."));
        assert!(description.ends_with(
            "Actions: create_expense, get_all_expenses, get_expenses_by_type, create_type, get_all_types"
        ));

        let required = tool.input_schema["required"]
            .as_array()
            .expect("has required array");
        assert_eq!(required, &vec![json!("action")]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn success_includes_pretty_data() {
        let result = handler(json!([{"id": 1, "name": "Food"}]))
            .handle(json!({"action": "get_expenses_by_type", "typeId": 1}))
            .await
            .expect("handled");

        assert!(!result.is_error());
        assert_eq!(
            result.text_content(),
            "✅ Expenses for type 1 retrieved successfully\n\nData:\n```json\n{\n  \"expenses\": [\n    {\n      \"id\": 1,\n      \"name\": \"Food\"\n    }\n  ]\n}\n```"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failure_has_no_data_block() {
        let result = handler(json!({}))
            .handle(json!({"action": "create_type"}))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert_eq!(
            result.text_content(),
            "❌ Missing required field: typeName\n\n"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_body_has_no_data_block() {
        let result = handler(json!({}))
            .handle(json!({"action": "create_type", "typeName": "Food"}))
            .await
            .expect("handled");

        assert!(!result.is_error());
        assert_eq!(result.text_content(), "✅ Type created successfully\n\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bad_action_is_validation_error() {
        let result = handler(json!({}))
            .handle(json!({"action": "delete_all"}))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert!(result.text_content().starts_with("❌ Validation Error: "));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_cost_is_validation_error() {
        let result = handler(json!({}))
            .handle(json!({
                "action": "create_expense",
                "itemName": "Yacht",
                "itemCost": 1e20,
                "itemType": "Leisure"
            }))
            .await
            .expect("handled");

        assert!(result.is_error());
        assert!(result.text_content().starts_with("❌ Validation Error: "));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn undecodable_response_is_internal_error() {
        let result = handler(json!({}))
            .handle(json!({"action": "get_all_types"}))
            .await
            .expect("handled");

        assert!(result.is_error());
        let text = result.text_content();
        assert!(text.starts_with("❌ Internal Error: "));
        assert!(text.contains("expected value at line 1"));
    }
}

#[cfg(test)]
mod registry_tests {
    use crate::mcp::errors::McpError;
    use crate::mcp::protocol::{CallToolResult, Tool};
    use crate::mcp::server::ToolHandler;
    use crate::mcp::tools::{CalculatorHandler, ToolRegistry};
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct FailingHandler;

    #[async_trait]
    impl ToolHandler for FailingHandler {
        fn name(&self) -> &str {
            "explode"
        }

        fn definition(&self) -> Tool {
            Tool {
                name: "explode".to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
            }
        }

        async fn handle(&self, _arguments: Value) -> Result<CallToolResult> {
            bail!("kaboom")
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(CalculatorHandler::new()))
            .expect("registers");
        registry
            .register(Arc::new(FailingHandler))
            .expect("registers");
        registry
    }

    #[test]
    fn registration_order_is_kept() {
        let registry = registry();
        assert_eq!(registry.tool_names(), vec!["calculate", "explode"]);
        assert_eq!(registry.len(), 2);

        let tools = registry.list_tools();
        assert_eq!(tools[0].name, "calculate");
        assert_eq!(tools[1].name, "explode");
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry
            .register(Arc::new(CalculatorHandler::new()))
            .expect_err("duplicate");
        assert!(matches!(err, McpError::ToolAlreadyRegistered { .. }));
        assert_eq!(err.to_string(), "Tool 'calculate' already registered");
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_lists_available() {
        let result = registry().call("weather", json!({})).await;
        assert!(result.is_error());
        assert_eq!(
            result.text_content(),
            "❌ Error: Unknown tool: 'weather'. Available tools: calculate, explode"
        );
    }

    #[tokio::test]
    async fn handler_error_becomes_internal_error() {
        let result = registry().call("explode", json!({})).await;
        assert!(result.is_error());
        assert_eq!(result.text_content(), "❌ Internal Error: kaboom");
    }
}

#[cfg(test)]
mod message_handler_tests {
    use crate::mcp::protocol::*;
    use crate::mcp::server::{ConnectionState, McpServer, MessageHandler};
    use crate::mcp::tools::CalculatorHandler;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn server() -> Arc<McpServer> {
        let server = McpServer::new("test-server".to_string(), "0.0.0".to_string())
            .expect("server builds");
        server
            .register_tool(CalculatorHandler::new())
            .await
            .expect("registers");
        Arc::new(server)
    }

    fn initialize_payload(version: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": version,
                "capabilities": {},
                "clientInfo": {"name": "unit-test", "version": "1.0.0"}
            }
        })
        .to_string()
    }

    fn into_value(message: Option<JsonRpcMessage>) -> Value {
        serde_json::to_value(message.expect("reply expected")).expect("serializes")
    }

    #[tokio::test]
    async fn initialize_negotiates_version() {
        let server = server().await;
        let handler = MessageHandler::new(Arc::clone(&server));

        let reply = into_value(handler.process_payload(&initialize_payload("2024-11-05")).await);
        assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(reply["result"]["serverInfo"]["name"], "test-server");
        assert_eq!(reply["result"]["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(server.connection_state().await, ConnectionState::Initializing);

        let reply = into_value(handler.process_payload(&initialize_payload("1.0")).await);
        assert_eq!(reply["result"]["protocolVersion"], MCP_VERSION);
    }

    #[tokio::test]
    async fn initialized_notification_marks_ready() {
        let server = server().await;
        let handler = MessageHandler::new(Arc::clone(&server));

        handler.process_payload(&initialize_payload(MCP_VERSION)).await;
        let reply = handler
            .process_payload(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(reply.is_none());
        assert_eq!(server.connection_state().await, ConnectionState::Ready);
    }

    #[tokio::test]
    async fn tools_require_initialize() {
        let handler = MessageHandler::new(server().await);

        let reply = into_value(
            handler
                .process_payload(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
                .await,
        );
        assert_eq!(reply["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(reply["error"]["message"], "Server not initialized");
        assert_eq!(reply["id"], 1);
    }

    #[tokio::test]
    async fn ping_works_before_initialize() {
        let handler = MessageHandler::new(server().await);

        let reply = into_value(
            handler
                .process_payload(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
                .await,
        );
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": {}, "id": "p"}));
    }

    #[tokio::test]
    async fn legacy_call_tool_alias() {
        let handler = MessageHandler::new(server().await);
        handler.process_payload(&initialize_payload(MCP_VERSION)).await;

        let reply = into_value(
            handler
                .process_payload(
                    &json!({
                        "jsonrpc": "2.0",
                        "id": 2,
                        "method": "call_tool",
                        "params": {"name": "calculate", "arguments": {"operation": "add", "a": 10, "b": 5}}
                    })
                    .to_string(),
                )
                .await,
        );
        assert_eq!(reply["result"]["isError"], false);
        let text = reply["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        assert!(text.contains("10.0 + 5.0 = 15.0"));
    }

    #[tokio::test]
    async fn protocol_errors() {
        let handler = MessageHandler::new(server().await);

        let reply = into_value(handler.process_payload("{not json").await);
        assert_eq!(reply["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(reply["id"], Value::Null);

        let reply = into_value(handler.process_payload(r#"{"hello":"world"}"#).await);
        assert_eq!(reply["error"]["code"], error_codes::INVALID_REQUEST);

        let reply = into_value(
            handler
                .process_payload(r#"{"jsonrpc":"2.0","id":9,"method":"resources/list"}"#)
                .await,
        );
        assert_eq!(reply["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert_eq!(reply["id"], 9);

        let reply = into_value(
            handler
                .process_payload(r#"{"jsonrpc":"2.0","id":3,"method":"initialize"}"#)
                .await,
        );
        assert_eq!(reply["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn call_without_name_is_invalid_params() {
        let handler = MessageHandler::new(server().await);
        handler.process_payload(&initialize_payload(MCP_VERSION)).await;

        let reply = into_value(
            handler
                .process_payload(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#)
                .await,
        );
        assert_eq!(reply["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn client_responses_are_ignored() {
        let handler = MessageHandler::new(server().await);
        let reply = handler
            .process_payload(r#"{"jsonrpc":"2.0","id":5,"result":{}}"#)
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn health_and_statistics() {
        let server = server().await;

        let health = server.health_status().await;
        assert_eq!(health.tools_registered, 1);
        assert_eq!(health.connection_state, ConnectionState::Uninitialized);

        let stats = server.server_statistics().await;
        assert_eq!(stats.registered_tools, vec!["calculate"]);
        assert_eq!(stats.server_info.name, "test-server");
        assert!(stats.started_at <= chrono::Utc::now());
    }
}
