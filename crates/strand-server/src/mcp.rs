//! JSON-RPC 2.0 tool-serving endpoint.
//!
//! Exposes the tool registry over `POST /mcp` with the `initialize`,
//! `tools/list`, `tools/call`, and `ping` methods (protocol version
//! `2024-11-05`). Tool execution failures are successful JSON-RPC
//! responses with `isError: true` in the result; only protocol-level
//! problems produce JSON-RPC error objects.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use strand_tools::registry::ToolRegistry;
use strand_tools::schema::validate_arguments;
use strand_tools::traits::ToolContext;

use crate::state::AppState;

/// Protocol version reported during initialization.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during initialization.
const SERVER_NAME: &str = "strand";

/// Server version reported during initialization.
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// Standard JSON-RPC error codes.
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier (number, string, or null for notifications).
    #[serde(default)]
    pub id: Option<Value>,
    /// Method to invoke.
    pub method: String,
    /// Method parameters (`null` if absent).
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed from the request.
    pub id: Option<Value>,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (negative numbers are reserved by JSON-RPC).
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl JsonRpcResponse {
    /// Construct a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Construct an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC server over the tool registry.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a server backed by the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Handle a single JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "rpc request received");
        counter!("rpc_requests_total", "method" => request.method.clone()).increment(1);

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            other => {
                warn!(method = %other, "unknown rpc method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                )
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .registry
            .catalogue()
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "inputSchema": spec.parameters,
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `name` in params",
            );
        };

        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let Some(tool) = self.registry.get(name) else {
            return tool_result(id, format!("unknown tool: {name}"), true);
        };
        if let Err(err) = validate_arguments(&arguments, &tool.spec().parameters) {
            return tool_result(id, err.to_string(), true);
        }

        let ctx = ToolContext::new(format!("rpc_{}", uuid::Uuid::now_v7()), "rpc");
        match tool.execute(Value::Object(arguments), &ctx).await {
            Ok(output) => {
                let text = match output {
                    Value::String(s) => s,
                    other => serde_json::to_string_pretty(&other)
                        .unwrap_or_else(|_| other.to_string()),
                };
                tool_result(id, text, false)
            }
            Err(err) => tool_result(id, format!("tool execution failed: {err}"), true),
        }
    }
}

/// Build the `tools/call` result shape.
fn tool_result(id: Option<Value>, text: String, is_error: bool) -> JsonRpcResponse {
    let mut result = json!({
        "content": [{"type": "text", "text": text}],
    });
    if is_error {
        result["isError"] = json!(true);
    }
    JsonRpcResponse::success(id, result)
}

/// Handle `POST /mcp`: a single JSON-RPC request or a batch array.
pub async fn handle_mcp_request(State(state): State<Arc<AppState>>, body: String) -> Json<Value> {
    let mcp = McpServer::new(Arc::clone(&state.registry));

    if let Ok(batch) = serde_json::from_str::<Vec<JsonRpcRequest>>(&body) {
        if batch.is_empty() {
            return Json(json!(JsonRpcResponse::error(
                None,
                INVALID_REQUEST,
                "empty batch request",
            )));
        }
        let mut responses = Vec::with_capacity(batch.len());
        for request in batch {
            responses.push(mcp.handle_request(request).await);
        }
        return Json(json!(responses));
    }

    match serde_json::from_str::<JsonRpcRequest>(&body) {
        Ok(request) => Json(json!(mcp.handle_request(request).await)),
        Err(err) => Json(json!(JsonRpcResponse::error(
            None,
            PARSE_ERROR,
            format!("failed to parse JSON-RPC request: {err}"),
        ))),
    }
}
