//! MCP (Model Context Protocol) Server Implementation
//!
//! A JSON-RPC 2.0 server over stdio exposing the `calculate` and
//! `expense_tracker` tools.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;
pub mod validation;

pub use errors::{ErrorHandler, McpError, McpResult};
pub use server::{ConnectionState, McpServer, MessageHandler, ToolHandler};
pub use tools::{CalculatorHandler, ExpenseTrackerHandler, ToolRegistry};
pub use transport::{Frame, FrameReader, Framing};
