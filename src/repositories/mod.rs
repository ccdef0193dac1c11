//! Data access for the external expense tracker backend.

pub mod expense_api;

pub use expense_api::{ExpenseApi, HttpExpenseApi, RepositoryError, resolve_base_url};
