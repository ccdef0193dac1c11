//! MCP Error Handling
//!
//! Error classification for the MCP server and conversion into JSON-RPC
//! error responses.

use crate::mcp::protocol::*;
use thiserror::Error;
use tracing::{error, warn};

/// MCP-specific errors that can occur during server operation
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Tool '{name}' already registered")]
    ToolAlreadyRegistered { name: String },

    #[error("Server not initialized")]
    ServerNotInitialized,

    #[error("Internal server error: {message}")]
    InternalError { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::ToolAlreadyRegistered { .. } | Self::InternalError { .. } => {
                JsonRpcError::new(error_codes::INTERNAL_ERROR, self.to_string(), None)
            }
            Self::ServerNotInitialized => {
                JsonRpcError::new(error_codes::INVALID_REQUEST, "Server not initialized", None)
            }
            Self::MethodNotFound { method } => JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
                None,
            ),
            Self::InvalidParameters { message } => {
                JsonRpcError::new(error_codes::INVALID_PARAMS, message.clone(), None)
            }
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        let error = self.to_jsonrpc_error();
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::InvalidParameters { .. }
            | Self::MethodNotFound { .. }
            | Self::ServerNotInitialized => {
                warn!("Client error: {}", self);
            }
            Self::ToolAlreadyRegistered { .. } | Self::InternalError { .. } => {
                error!("Server error: {}", self);
            }
        }
    }
}

/// Error handler utility for consistent error processing
pub struct ErrorHandler;

impl ErrorHandler {
    /// Convert any error into a JSON-RPC error response, preserving the code
    /// of an [`McpError`] when one is at the root.
    #[inline]
    pub fn handle_error(error: &anyhow::Error, id: Option<RequestId>) -> JsonRpcMessage {
        if let Some(mcp_error) = error.downcast_ref::<McpError>() {
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        error!("Unexpected error: {:#}", error);
        let internal_error = McpError::InternalError {
            message: error.to_string(),
        };
        internal_error.to_error_response(id)
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
