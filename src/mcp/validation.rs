//! MCP Message Validation
//!
//! JSON schema validation for MCP protocol messages. Envelope validation
//! happens when a raw message is classified; method parameter validation is
//! done by the handlers so that failures map to `-32602`.

use crate::mcp::protocol::*;
use anyhow::{Result, anyhow, bail};
use jsonschema::{Draft, JSONSchema};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

/// JSON Schema validator for MCP messages
#[derive(Debug)]
pub struct McpValidator {
    schemas: HashMap<String, JSONSchema>,
}

impl McpValidator {
    /// Create a new MCP validator with built-in schemas
    #[inline]
    pub fn new() -> Result<Self> {
        let mut validator = Self {
            schemas: HashMap::new(),
        };

        validator.load_builtin_schemas()?;

        Ok(validator)
    }

    fn load_builtin_schemas(&mut self) -> Result<()> {
        let id_schema = json!({
            "oneOf": [
                {"type": "string"},
                {"type": "integer"}
            ]
        });

        let request_schema = json!({
            "type": "object",
            "properties": {
                "jsonrpc": {"type": "string", "const": "2.0"},
                "method": {"type": "string"},
                "params": {"type": ["object", "array"]},
                "id": id_schema
            },
            "required": ["jsonrpc", "method", "id"]
        });
        self.add_schema("jsonrpc_request", &request_schema)?;

        let response_schema = json!({
            "type": "object",
            "properties": {
                "jsonrpc": {"type": "string", "const": "2.0"},
                "result": {},
                "id": id_schema
            },
            "required": ["jsonrpc", "result", "id"]
        });
        self.add_schema("jsonrpc_response", &response_schema)?;

        let error_response_schema = json!({
            "type": "object",
            "properties": {
                "jsonrpc": {"type": "string", "const": "2.0"},
                "error": {
                    "type": "object",
                    "properties": {
                        "code": {"type": "integer"},
                        "message": {"type": "string"},
                        "data": {}
                    },
                    "required": ["code", "message"]
                },
                "id": {
                    "oneOf": [
                        {"type": "string"},
                        {"type": "integer"},
                        {"type": "null"}
                    ]
                }
            },
            "required": ["jsonrpc", "error", "id"]
        });
        self.add_schema("jsonrpc_error_response", &error_response_schema)?;

        let notification_schema = json!({
            "type": "object",
            "properties": {
                "jsonrpc": {"type": "string", "const": "2.0"},
                "method": {"type": "string"},
                "params": {"type": ["object", "array"]}
            },
            "required": ["jsonrpc", "method"]
        });
        self.add_schema("jsonrpc_notification", &notification_schema)?;

        let initialize_schema = json!({
            "type": "object",
            "properties": {
                "protocolVersion": {"type": "string"},
                "capabilities": {"type": "object"},
                "clientInfo": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "version": {"type": "string"}
                    },
                    "required": ["name", "version"]
                }
            },
            "required": ["protocolVersion", "clientInfo"]
        });
        self.add_schema("initialize_params", &initialize_schema)?;

        let tool_call_schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "arguments": {"type": ["object", "null"]}
            },
            "required": ["name"]
        });
        self.add_schema("call_tool_params", &tool_call_schema)?;

        debug!("Loaded {} built-in JSON schemas", self.schemas.len());
        Ok(())
    }

    /// Add a JSON schema to the validator
    #[inline]
    pub fn add_schema(&mut self, name: &str, schema: &Value) -> Result<()> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| anyhow!("Failed to compile schema '{}': {}", name, e))?;

        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    /// Validate the parameters of a method that has a built-in schema.
    /// Methods without one pass unchecked.
    #[inline]
    pub fn validate_params(&self, method: &str, params: &Value) -> Result<()> {
        let schema_name = match method {
            "initialize" => "initialize_params",
            "tools/call" | "call_tool" => "call_tool_params",
            _ => {
                debug!("No parameter validation schema for method: {}", method);
                return Ok(());
            }
        };

        self.validate_with_schema(schema_name, params)
    }

    /// Validate a value against a named schema
    #[inline]
    pub fn validate_with_schema(&self, schema_name: &str, value: &Value) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| anyhow!("Schema '{}' not found", schema_name))?;

        if let Err(errors) = schema.validate(value) {
            let error_messages: Vec<String> = errors
                .into_iter()
                .map(|e| format!("{}:{}", e.instance_path, e))
                .collect();

            return Err(anyhow!(
                "Schema validation failed for '{}': {}",
                schema_name,
                error_messages.join(", ")
            ));
        }

        Ok(())
    }

    /// Classify a raw JSON value by its members and validate its envelope.
    ///
    /// `method` with `id` is a request, `method` alone a notification;
    /// otherwise `error` or `result` mark a response.
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> Result<JsonRpcMessage> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("JSON-RPC message must be an object"))?;

        let message = if object.contains_key("method") {
            if object.contains_key("id") {
                self.validate_with_schema("jsonrpc_request", value)?;
                JsonRpcMessage::Request(serde_json::from_value(value.clone())?)
            } else {
                self.validate_with_schema("jsonrpc_notification", value)?;
                JsonRpcMessage::Notification(serde_json::from_value(value.clone())?)
            }
        } else if object.contains_key("error") {
            self.validate_with_schema("jsonrpc_error_response", value)?;
            JsonRpcMessage::ErrorResponse(serde_json::from_value(value.clone())?)
        } else if object.contains_key("result") {
            self.validate_with_schema("jsonrpc_response", value)?;
            JsonRpcMessage::Response(serde_json::from_value(value.clone())?)
        } else {
            bail!("Object has none of method, result or error");
        };

        Ok(message)
    }

    /// Check if a protocol version is supported
    #[inline]
    pub fn is_protocol_version_supported(&self, version: &str) -> bool {
        SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
    }

    /// Version to answer `initialize` with: the requested one when supported,
    /// otherwise the latest.
    #[inline]
    pub fn negotiate_protocol_version(&self, requested: &str) -> &'static str {
        SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .find(|&&version| version == requested)
            .copied()
            .unwrap_or(MCP_VERSION)
    }

    /// Get supported protocol versions
    #[inline]
    pub fn supported_protocol_versions(&self) -> &'static [&'static str] {
        SUPPORTED_PROTOCOL_VERSIONS
    }
}
