use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::expense::{ExpenseActionType, ExpenseTrackerInput, ExpenseTrackerOutput};
use crate::repositories::{ExpenseApi, RepositoryError};

/// Business logic behind the `expense_tracker` tool.
///
/// Backend failures that the caller can act on (missing fields, HTTP status,
/// network) become `success: false` outputs. Only undecodable responses are
/// returned as errors.
#[derive(Clone)]
pub struct ExpenseTrackerService {
    api: Arc<dyn ExpenseApi>,
}

impl std::fmt::Debug for ExpenseTrackerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseTrackerService").finish_non_exhaustive()
    }
}

impl ExpenseTrackerService {
    #[inline]
    pub fn new(api: Arc<dyn ExpenseApi>) -> Self {
        Self { api }
    }

    /// Route an input to the matching backend call. Blocking.
    #[inline]
    pub fn handle_action(&self, input: &ExpenseTrackerInput) -> Result<ExpenseTrackerOutput> {
        let action = input.action;

        let output = match action {
            ExpenseActionType::CreateExpense => self.create_expense(input),
            ExpenseActionType::GetAllExpenses => self.get_all_expenses(),
            ExpenseActionType::GetExpensesByType => self.get_expenses_by_type(input),
            ExpenseActionType::CreateType => self.create_type(input),
            ExpenseActionType::GetAllTypes => self.get_all_types(),
        };

        output.with_context(|| format!("Error handling action {action}"))
    }

    fn create_expense(&self, input: &ExpenseTrackerInput) -> Result<ExpenseTrackerOutput> {
        let action = ExpenseActionType::CreateExpense;
        let Some(request) = input.expense_request() else {
            return Ok(ExpenseTrackerOutput::failure(
                action,
                "Missing required fields: itemName, itemCost, and itemType",
            ));
        };

        settle(action, self.api.create_expense(&request), "Failed to create expense", |data| {
            info!("Expense created successfully: {}", data);
            ("Expense created successfully".to_string(), data)
        })
    }

    fn get_all_expenses(&self) -> Result<ExpenseTrackerOutput> {
        let action = ExpenseActionType::GetAllExpenses;

        settle(action, self.api.list_expenses(), "Failed to retrieve expenses", |data| {
            let expenses = as_list(data);
            info!("Retrieved {} expenses", expenses.len());
            (
                "Expenses retrieved successfully".to_string(),
                json!({ "expenses": expenses }),
            )
        })
    }

    fn get_expenses_by_type(&self, input: &ExpenseTrackerInput) -> Result<ExpenseTrackerOutput> {
        let action = ExpenseActionType::GetExpensesByType;
        let Some(type_id) = input.type_id else {
            return Ok(ExpenseTrackerOutput::failure(
                action,
                "Missing required field: typeId",
            ));
        };

        settle(
            action,
            self.api.list_expenses_by_type(type_id),
            "Failed to retrieve expenses",
            |data| {
                info!("Retrieved expenses for type {}", type_id);
                (
                    format!("Expenses for type {type_id} retrieved successfully"),
                    json!({ "expenses": as_list(data) }),
                )
            },
        )
    }

    fn create_type(&self, input: &ExpenseTrackerInput) -> Result<ExpenseTrackerOutput> {
        let action = ExpenseActionType::CreateType;
        let Some(request) = input.type_request() else {
            return Ok(ExpenseTrackerOutput::failure(
                action,
                "Missing required field: typeName",
            ));
        };

        settle(action, self.api.create_type(&request), "Failed to create type", |data| {
            info!("Type created successfully: {}", data);
            ("Type created successfully".to_string(), data)
        })
    }

    fn get_all_types(&self) -> Result<ExpenseTrackerOutput> {
        let action = ExpenseActionType::GetAllTypes;

        settle(action, self.api.list_types(), "Failed to retrieve types", |data| {
            let types = as_list(data);
            info!("Retrieved {} types", types.len());
            (
                "Types retrieved successfully".to_string(),
                json!({ "types": types }),
            )
        })
    }
}

/// Turn a backend result into an output. `on_success` supplies the message and
/// data; status failures are reported as `"<failure_prefix>: <status>"`.
fn settle<F>(
    action: ExpenseActionType,
    result: Result<Value, RepositoryError>,
    failure_prefix: &str,
    on_success: F,
) -> Result<ExpenseTrackerOutput>
where
    F: FnOnce(Value) -> (String, Value),
{
    match result {
        Ok(data) => {
            let (message, data) = on_success(data);
            Ok(ExpenseTrackerOutput::success(action, message, data))
        }
        Err(RepositoryError::Status { status, .. }) => Ok(ExpenseTrackerOutput::failure(
            action,
            format!("{failure_prefix}: {status}"),
        )),
        Err(RepositoryError::Transport(msg)) => {
            error!("Request error: {}", msg);
            Ok(ExpenseTrackerOutput::failure(
                action,
                format!("Network error: {msg}"),
            ))
        }
        Err(err @ RepositoryError::NotConfigured) => {
            Ok(ExpenseTrackerOutput::failure(action, err.to_string()))
        }
        Err(RepositoryError::Decode(msg)) => {
            error!("Undecodable response for {}: {}", action, msg);
            bail!("Invalid response from expense tracker backend: {msg}")
        }
    }
}

/// List endpoints may answer with a single object; wrap it.
fn as_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        other => vec![other],
    }
}
