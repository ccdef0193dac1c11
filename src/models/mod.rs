//! Data transfer objects for the tools exposed by the server.

pub mod calculator;
pub mod expense;

pub use calculator::{CalculatorInput, CalculatorInputError, CalculatorOutput, Operation};
pub use expense::{
    ExpenseActionType, ExpenseItemRequest, ExpenseItemResponse, ExpenseTrackerInput,
    ExpenseTrackerOutput, ItemTypeRequest, ItemTypeResponse,
};
