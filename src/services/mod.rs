//! Business logic behind the MCP tools.

pub mod calculator;
pub mod expense_tracker;

pub use calculator::{CalculatorError, CalculatorService};
pub use expense_tracker::ExpenseTrackerService;
