use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::utils::lenient_opt_i64;

/// Supported actions for the expense tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseActionType {
    CreateExpense,
    GetAllExpenses,
    GetExpensesByType,
    CreateType,
    GetAllTypes,
}

impl ExpenseActionType {
    pub const ALL: [Self; 5] = [
        Self::CreateExpense,
        Self::GetAllExpenses,
        Self::GetExpensesByType,
        Self::CreateType,
        Self::GetAllTypes,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateExpense => "create_expense",
            Self::GetAllExpenses => "get_all_expenses",
            Self::GetExpensesByType => "get_expenses_by_type",
            Self::CreateType => "create_type",
            Self::GetAllTypes => "get_all_types",
        }
    }
}

impl fmt::Display for ExpenseActionType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for `POST /expenses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemRequest {
    pub item_name: String,
    /// Cost in cents
    pub item_cost: i64,
    /// Name of an existing item type
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_note: Option<String>,
}

/// Payload for `POST /types`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTypeRequest {
    pub name: String,
}

/// Expense item as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemResponse {
    #[serde(default)]
    pub item_id: Option<i64>,
    pub item_name: String,
    pub item_cost: i64,
    #[serde(default)]
    pub item_type_id: Option<i64>,
    #[serde(default)]
    pub item_type_name: Option<String>,
    #[serde(default)]
    pub item_created_dttm: Option<String>,
    #[serde(default)]
    pub item_note: Option<String>,
}

/// Item type as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTypeResponse {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Input for the `expense_tracker` tool.
///
/// Only `action` is always required; the remaining fields are checked per
/// action by the service so that a missing field produces a readable
/// failure message instead of a schema error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTrackerInput {
    pub action: ExpenseActionType,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub item_cost: Option<i64>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub item_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub type_name: Option<String>,
}

/// Outcome of an expense tracker action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseTrackerOutput {
    pub action: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ExpenseTrackerInput {
    #[inline]
    pub fn new(action: ExpenseActionType) -> Self {
        Self {
            action,
            item_name: None,
            item_cost: None,
            item_type: None,
            item_note: None,
            type_id: None,
            type_name: None,
        }
    }

    #[inline]
    pub fn from_arguments(arguments: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(arguments)
    }

    /// Build the create-expense payload, or `None` if a required field is missing
    #[inline]
    pub fn expense_request(&self) -> Option<ExpenseItemRequest> {
        Some(ExpenseItemRequest {
            item_name: self.item_name.clone()?,
            item_cost: self.item_cost?,
            item_type: self.item_type.clone()?,
            item_note: self.item_note.clone(),
        })
    }

    /// Build the create-type payload, or `None` if `typeName` is missing
    #[inline]
    pub fn type_request(&self) -> Option<ItemTypeRequest> {
        self.type_name
            .clone()
            .map(|name| ItemTypeRequest { name })
    }

    /// JSON schema advertised in the tool definition
    #[inline]
    pub fn input_schema() -> Value {
        let actions: Vec<&str> = ExpenseActionType::ALL
            .iter()
            .map(|action| action.as_str())
            .collect();

        json!({
            "type": "object",
            "title": "ExpenseTrackerInput",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": actions,
                    "description": "The action to perform on expense tracker"
                },
                "itemName": {
                    "type": "string",
                    "description": "Name of the item (required for create_expense)",
                    "examples": ["Groceries", "Gas"]
                },
                "itemCost": {
                    "type": "integer",
                    "description": "Cost of the item in cents (required for create_expense)",
                    "examples": [5000, 10050]
                },
                "itemType": {
                    "type": "string",
                    "description": "Type of the item (required for create_expense)",
                    "examples": ["Food", "Transportation"]
                },
                "itemNote": {
                    "type": "string",
                    "description": "Additional note about the item (optional)"
                },
                "typeId": {
                    "type": "integer",
                    "description": "Type ID (required for get_expenses_by_type)"
                },
                "typeName": {
                    "type": "string",
                    "description": "Type name (required for create_type)"
                }
            },
            "required": ["action"]
        })
    }
}

impl ExpenseTrackerOutput {
    #[inline]
    pub fn success(action: ExpenseActionType, message: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    #[inline]
    pub fn failure(action: ExpenseActionType, message: impl Into<String>) -> Self {
        Self {
            action: action.as_str().to_string(),
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Whether `data` carries anything worth showing
    #[inline]
    pub fn has_data(&self) -> bool {
        match &self.data {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}
