//! MCP Tools Implementation
//!
//! Tool registration and dispatch, along with the `calculate` and
//! `expense_tracker` tool handlers.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::models::calculator::{CalculatorInput, CalculatorOutput};
use crate::models::expense::{ExpenseTrackerInput, ExpenseTrackerOutput};
use crate::services::{CalculatorService, ExpenseTrackerService};
use crate::utils::format_number;
use anyhow::{Context, Result};
use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

const CALCULATOR_DESCRIPTION: &str = "Perform basic arithmetic operations: addition, subtraction, \
     multiplication, division, power, and modulo. Supports decimal precision control.";

const EXPENSE_TRACKER_DESCRIPTION: &str = "Manage expenses and expense types. Supports creating \
     expenses, retrieving all expenses, filtering expenses by type, creating expense types, and \
     retrieving all types. Actions: create_expense, get_all_expenses, get_expenses_by_type, \
     create_type, get_all_types";

/// `calculate` tool handler
#[derive(Debug, Default)]
pub struct CalculatorHandler {
    service: CalculatorService,
}

impl CalculatorHandler {
    #[inline]
    pub fn new() -> Self {
        debug!("CalculatorHandler initialized");
        Self {
            service: CalculatorService::new(),
        }
    }

    /// Create the calculate tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "calculate".to_string(),
            description: Some(CALCULATOR_DESCRIPTION.to_string()),
            input_schema: CalculatorInput::input_schema(),
        }
    }

    fn format_response(output: &CalculatorOutput) -> String {
        format!(
            "✅ Calculation Result:\n\n{}\n\nDetails:\n- Operation: {}\n- First Number: {}\n- Second Number: {}\n- Result: {}",
            output.formatted_result,
            output.operation,
            format_number(output.operand_a),
            format_number(output.operand_b),
            format_number(output.result)
        )
    }
}

#[async_trait]
impl ToolHandler for CalculatorHandler {
    #[inline]
    fn name(&self) -> &str {
        "calculate"
    }

    #[inline]
    fn definition(&self) -> Tool {
        Self::tool_definition()
    }

    #[inline]
    async fn handle(&self, arguments: Value) -> Result<CallToolResult> {
        info!("Received calculation request: {}", arguments);

        let input = match CalculatorInput::from_arguments(arguments) {
            Ok(input) => input,
            Err(e) => {
                error!("Validation error: {}", e);
                return Ok(CallToolResult::error_text(format!(
                    "❌ Validation Error: {e}"
                )));
            }
        };

        match self.service.calculate(&input) {
            Ok(output) => {
                info!("Calculation successful: {}", output.formatted_result);
                Ok(CallToolResult::text(Self::format_response(&output)))
            }
            Err(e) if e.is_validation() => {
                error!("Validation error: {}", e);
                Ok(CallToolResult::error_text(format!(
                    "❌ Validation Error: {e}"
                )))
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                Ok(CallToolResult::error_text(format!("❌ Internal Error: {e}")))
            }
        }
    }
}

/// `expense_tracker` tool handler
#[derive(Debug, Clone)]
pub struct ExpenseTrackerHandler {
    service: ExpenseTrackerService,
}

impl ExpenseTrackerHandler {
    #[inline]
    pub fn new(service: ExpenseTrackerService) -> Self {
        debug!("ExpenseTrackerHandler initialized");
        Self { service }
    }

    /// Create the expense_tracker tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "expense_tracker".to_string(),
            description: Some(EXPENSE_TRACKER_DESCRIPTION.to_string()),
            input_schema: ExpenseTrackerInput::input_schema(),
        }
    }

    fn format_response(output: &ExpenseTrackerOutput) -> Result<String> {
        let status_icon = if output.success { "✅" } else { "❌" };
        let mut response = format!("{status_icon} {}\n\n", output.message);

        if let Some(data) = output.data.as_ref().filter(|_| output.has_data()) {
            response.push_str("Data:\n```json\n");
            response.push_str(&serde_json::to_string_pretty(data)?);
            response.push_str("\n```");
        }

        Ok(response)
    }
}

#[async_trait]
impl ToolHandler for ExpenseTrackerHandler {
    #[inline]
    fn name(&self) -> &str {
        "expense_tracker"
    }

    #[inline]
    fn definition(&self) -> Tool {
        Self::tool_definition()
    }

    #[inline]
    async fn handle(&self, arguments: Value) -> Result<CallToolResult> {
        info!("Received expense tracker request: {}", arguments);

        let input = match ExpenseTrackerInput::from_arguments(arguments) {
            Ok(input) => input,
            Err(e) => {
                error!("Validation error: {}", e);
                return Ok(CallToolResult::error_text(format!(
                    "❌ Validation Error: {e}"
                )));
            }
        };

        // The backend client blocks, keep it off the async workers
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || service.handle_action(&input))
            .await
            .context("Expense tracker task failed")?;

        match outcome {
            Ok(output) => {
                info!("Expense tracker operation finished: {}", output.message);
                let text = Self::format_response(&output)?;
                Ok(CallToolResult {
                    content: vec![ToolContent::Text { text }],
                    is_error: Some(!output.success),
                })
            }
            Err(e) => {
                error!("Unexpected error: {:#}", e);
                Ok(CallToolResult::error_text(format!("❌ Internal Error: {e:#}")))
            }
        }
    }
}

/// Registered tool handlers, kept in registration order
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty tool registry
    #[inline]
    pub fn new() -> Self {
        debug!("Tool registry initialized");
        Self::default()
    }

    /// Register a handler; names must be unique
    #[inline]
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        let name = handler.name().to_string();

        if self.get(&name).is_some() {
            return Err(McpError::ToolAlreadyRegistered { name });
        }

        self.handlers.push(handler);
        info!("✅ Registered tool: {}", name);
        Ok(())
    }

    /// Definitions of all registered tools
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.handlers
            .iter()
            .map(|handler| handler.definition())
            .collect()
    }

    #[inline]
    pub fn tool_names(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|handler| handler.name().to_string())
            .collect()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.iter().find(|handler| handler.name() == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run a tool by name. Unknown tools and handler failures are reported as
    /// tool-level errors rather than protocol errors.
    #[inline]
    pub async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        let Some(handler) = self.get(name) else {
            let available = self.handlers.iter().map(|handler| handler.name()).join(", ");
            error!("Tool error: Unknown tool: '{}'", name);
            return CallToolResult::error_text(format!(
                "❌ Error: Unknown tool: '{name}'. Available tools: {available}"
            ));
        };

        match handler.handle(arguments).await {
            Ok(result) => result,
            Err(e) => {
                error!("Unexpected error in tool execution: {:#}", e);
                CallToolResult::error_text(format!("❌ Internal Error: {e:#}"))
            }
        }
    }
}
