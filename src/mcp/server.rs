//! MCP Server Implementation
//!
//! Core MCP server framework: connection lifecycle, message routing and the
//! stdio serve loop.

use crate::mcp::errors::{ErrorHandler, McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::tools::ToolRegistry;
use crate::mcp::transport::{Frame, FrameReader, Framing, write_frame};
use crate::mcp::validation::McpValidator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{self, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// MCP Server state and configuration
pub struct McpServer {
    /// Server implementation information
    pub server_info: Implementation,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Registered tools, in registration order
    pub tools: Arc<RwLock<ToolRegistry>>,
    /// Connection state
    pub connection_state: Arc<RwLock<ConnectionState>>,
    /// Message validator
    pub validator: Arc<McpValidator>,
    started_at: DateTime<Utc>,
}

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name clients call the tool by
    fn name(&self) -> &str;

    /// Definition advertised by `tools/list`
    fn definition(&self) -> Tool;

    /// Run the tool. Tool-level failures belong in the returned
    /// [`CallToolResult`]; `Err` is reserved for unexpected failures.
    async fn handle(&self, arguments: Value) -> Result<CallToolResult>;
}

/// Message handler for processing incoming messages
pub struct MessageHandler {
    server: Arc<McpServer>,
}

impl McpServer {
    /// Create a new MCP server
    #[inline]
    pub fn new(name: String, version: String) -> Result<Self> {
        let server_info = Implementation { name, version };

        let capabilities = ServerCapabilities {
            logging: Some(LoggingCapability {}),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        let validator = McpValidator::new()?;

        Ok(Self {
            server_info,
            capabilities,
            tools: Arc::new(RwLock::new(ToolRegistry::new())),
            connection_state: Arc::new(RwLock::new(ConnectionState::Uninitialized)),
            validator: Arc::new(validator),
            started_at: Utc::now(),
        })
    }

    /// Register a tool with the server
    #[inline]
    pub async fn register_tool<H>(&self, handler: H) -> McpResult<()>
    where
        H: ToolHandler + 'static,
    {
        let mut tools = self.tools.write().await;
        tools.register(Arc::new(handler))
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(io::stdin(), io::stdout()).await
    }

    /// Run the message loop over any byte stream pair until EOF
    #[inline]
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FrameReader::new(BufReader::new(reader));
        let handler = MessageHandler::new(Arc::clone(&self));

        loop {
            let frame = match frames.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Err(e) => {
                    error!("Error reading from input: {}", e);
                    break;
                }
            };

            let (reply, framing) = match frame {
                Frame::Message { payload, framing } => {
                    (handler.process_payload(&payload).await, framing)
                }
                Frame::Malformed { reason, framing } => {
                    warn!("Malformed frame: {}", reason);
                    (Some(parse_error_response()), framing)
                }
            };

            if let Some(reply) = reply {
                send_message(&mut writer, &reply, framing).await?;
            }
        }

        self.set_state(ConnectionState::Closed).await;
        info!("MCP server stopped");
        Ok(())
    }

    /// Get current connection state
    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    async fn set_state(&self, state: ConnectionState) {
        let mut current = self.connection_state.write().await;
        debug!("Connection state {:?} -> {:?}", *current, state);
        *current = state;
    }

    /// Snapshot for health monitoring
    #[inline]
    pub async fn health_status(&self) -> ServerHealthStatus {
        let uptime = Utc::now().signed_duration_since(self.started_at);

        ServerHealthStatus {
            connection_state: self.connection_state().await,
            tools_registered: self.tools.read().await.len(),
            uptime_seconds: u64::try_from(uptime.num_seconds()).unwrap_or(0),
        }
    }

    /// Detailed server statistics
    #[inline]
    pub async fn server_statistics(&self) -> ServerStatistics {
        ServerStatistics {
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
            connection_state: self.connection_state().await,
            registered_tools: self.tools.read().await.tool_names(),
            started_at: self.started_at,
        }
    }
}

impl MessageHandler {
    /// Create a new message handler
    #[inline]
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Parse, validate and dispatch one raw payload. Returns the reply, if
    /// the message calls for one.
    #[inline]
    pub async fn process_payload(&self, payload: &str) -> Option<JsonRpcMessage> {
        let raw_value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON: {}", e);
                return Some(parse_error_response());
            }
        };

        match self.server.validator.validate_raw_message(&raw_value) {
            Ok(message) => self.process_message(message).await,
            Err(e) => {
                error!("Message validation failed: {}", e);
                Some(JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                    JsonRpcError::invalid_request(),
                    None,
                )))
            }
        }
    }

    /// Process an incoming message
    #[inline]
    pub async fn process_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Request {:?}: {}", request.id, request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" | "list_tools" => self.handle_list_tools().await,
            "tools/call" | "call_tool" => self.handle_call_tool(request.params).await,
            "ping" => self.handle_ping().await,
            method => {
                let error = McpError::MethodNotFound {
                    method: method.to_string(),
                };
                error.log();
                return error.to_error_response(Some(request.id));
            }
        };

        match response {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => ErrorHandler::handle_error(&e, Some(request.id)),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => self.handle_initialized().await,
            "notifications/cancelled" => {
                info!("Received cancellation notification: {:?}", notification.params);
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params = params.ok_or_else(|| McpError::InvalidParameters {
            message: "Initialize request missing parameters".to_string(),
        })?;
        self.validate_params("initialize", &params)?;

        let params: InitializeParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })?;

        let validator = &self.server.validator;
        if !validator.is_protocol_version_supported(&params.protocol_version) {
            warn!(
                "Client requested unsupported protocol version {}; offering {}",
                params.protocol_version, MCP_VERSION
            );
        }
        let protocol_version = validator.negotiate_protocol_version(&params.protocol_version);

        self.server.set_state(ConnectionState::Initializing).await;

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: None,
        };

        info!(
            "Client initialized: {} {} (protocol {})",
            params.client_info.name, params.client_info.version, protocol_version
        );
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_initialized(&self) {
        self.server.set_state(ConnectionState::Ready).await;
        info!("Server ready to handle requests");
    }

    /// Handle list tools request
    #[inline]
    pub async fn handle_list_tools(&self) -> Result<Value> {
        self.ensure_initialized().await?;
        info!("Client requested tool list");

        let tools = self.server.tools.read().await.list_tools();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        self.ensure_initialized().await?;

        let params = params.ok_or_else(|| McpError::InvalidParameters {
            message: "Tool call request missing parameters".to_string(),
        })?;
        self.validate_params("tools/call", &params)?;

        let params: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })?;
        let arguments = Value::Object(params.arguments.unwrap_or_default());

        info!("Tool called: {} with args: {}", params.name, arguments);

        let tools = self.server.tools.read().await;
        let result = tools.call(&params.name, arguments).await;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle ping request
    #[inline]
    #[expect(clippy::unused_async, reason = "dispatched alongside the async handlers")]
    pub async fn handle_ping(&self) -> Result<Value> {
        Ok(json!({}))
    }

    async fn ensure_initialized(&self) -> Result<()> {
        match self.server.connection_state().await {
            ConnectionState::Initializing | ConnectionState::Ready => Ok(()),
            ConnectionState::Uninitialized | ConnectionState::Closed => {
                Err(McpError::ServerNotInitialized.into())
            }
        }
    }

    fn validate_params(&self, method: &str, params: &Value) -> Result<()> {
        self.server
            .validator
            .validate_params(method, params)
            .map_err(|e| {
                anyhow::Error::new(McpError::InvalidParameters {
                    message: e.to_string(),
                })
            })
    }
}

fn parse_error_response() -> JsonRpcMessage {
    JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(JsonRpcError::parse_error(), None))
}

/// Send a message to the client
async fn send_message<W>(writer: &mut W, message: &JsonRpcMessage, framing: Framing) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message).context("Failed to serialize response")?;
    write_frame(writer, &json, framing)
        .await
        .context("Failed to write response")
}
