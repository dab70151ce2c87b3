//! OpenAI-compatible chat-completions provider.
//!
//! Non-streaming JSON client for any endpoint speaking the chat-completions
//! wire format. Tool calls come back as function calls with stringified
//! arguments; the raw assistant message is carried forward as the turn's
//! continuation metadata and replayed verbatim on the next call, so
//! provider-specific fields survive the round trip untouched.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use strand_core::messages::{Conversation, ToolCallRequest, Turn};
use strand_core::text::truncate_with_suffix;
use strand_core::tools::ToolSpec;

use crate::errors::GatewayError;
use crate::gateway::{ModelGateway, ModelOutcome};

/// Default chat-completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound on error bodies echoed into error messages.
const ERROR_BODY_MAX_BYTES: usize = 1_024;

/// Provider configuration.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Endpoint base URL (no trailing slash).
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model ID.
    pub model: String,
    /// Sampling temperature override.
    pub temperature: Option<f64>,
    /// Max completion tokens override.
    pub max_tokens: Option<u32>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    /// Config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Chat-completions implementation of [`ModelGateway`].
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiGateway {
    /// Build the gateway (constructs the HTTP client).
    pub fn new(config: OpenAiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn request_body(&self, conversation: &Conversation, catalogue: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": build_messages(conversation),
        });
        if !catalogue.is_empty() {
            body["tools"] = Value::Array(catalogue.iter().map(tool_entry).collect());
        }
        if let Some(t) = self.config.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(m) = self.config.max_tokens {
            body["max_tokens"] = json!(m);
        }
        body
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    #[instrument(skip_all, fields(model = self.config.model, turns = conversation.len()))]
    async fn call(
        &self,
        conversation: &Conversation,
        catalogue: &[ToolSpec],
    ) -> Result<ModelOutcome, GatewayError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.request_body(conversation, catalogue);

        counter!("provider_requests_total", "provider" => "openai").increment(1);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            counter!("provider_errors_total", "provider" => "openai", "status" => status.as_u16().to_string())
                .increment(1);
            warn!(status = status.as_u16(), "provider returned error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate_with_suffix(&text, ERROR_BODY_MAX_BYTES, "..."),
            });
        }

        let payload: Value = response.json().await?;
        histogram!("provider_request_duration_seconds", "provider" => "openai")
            .record(start.elapsed().as_secs_f64());
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "provider call complete");

        parse_outcome(&payload)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire-format construction / parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Catalogue entry in chat-completions `tools` format.
fn tool_entry(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}

/// Convert the conversation into chat-completions messages.
///
/// Model turns that carried continuation metadata are replayed as that
/// exact blob; everything else is reconstructed from the turn's fields.
fn build_messages(conversation: &Conversation) -> Vec<Value> {
    let mut messages = Vec::with_capacity(conversation.len());
    for turn in conversation.turns() {
        match turn {
            Turn::User { text } => {
                messages.push(json!({"role": "user", "content": text}));
            }
            Turn::Model {
                continuation: Some(blob),
                ..
            } => {
                // Opaque provider state: echoed verbatim, never inspected.
                messages.push(blob.clone());
            }
            Turn::Model {
                text,
                tool_calls,
                continuation: None,
            } => {
                let mut msg = json!({
                    "role": "assistant",
                    "content": text.clone().map_or(Value::Null, Value::String),
                });
                if !tool_calls.is_empty() {
                    msg["tool_calls"] = Value::Array(
                        tool_calls
                            .iter()
                            .map(|c| {
                                json!({
                                    "id": c.id,
                                    "type": "function",
                                    "function": {
                                        "name": c.name,
                                        "arguments": Value::Object(c.arguments.clone()).to_string(),
                                    }
                                })
                            })
                            .collect(),
                    );
                }
                messages.push(msg);
            }
            Turn::ToolResults { results } => {
                for r in results {
                    let content = match (&r.output, &r.error) {
                        (Some(output), _) => output.to_string(),
                        (None, Some(err)) => {
                            json!({"error": {"code": err.code, "message": err.message}}).to_string()
                        }
                        (None, None) => String::from("null"),
                    };
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": r.id,
                        "content": content,
                    }));
                }
            }
        }
    }
    messages
}

/// Interpret the provider response as text or tool calls.
fn parse_outcome(payload: &Value) -> Result<ModelOutcome, GatewayError> {
    let message = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| GatewayError::MalformedResponse("no choices[0].message".into()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned);

    let raw_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty());

    match raw_calls {
        Some(raw) => {
            let calls = raw
                .iter()
                .map(parse_tool_call)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ModelOutcome::ToolCalls {
                text,
                calls,
                // The whole assistant message is the continuation blob.
                continuation: Some(message.clone()),
            })
        }
        None => match text {
            Some(text) => Ok(ModelOutcome::Text { text }),
            None => Err(GatewayError::MalformedResponse(
                "message has neither content nor tool_calls".into(),
            )),
        },
    }
}

/// Parse one wire tool call into a request.
fn parse_tool_call(raw: &Value) -> Result<ToolCallRequest, GatewayError> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::MalformedResponse("tool call missing id".into()))?;
    let function = raw
        .get("function")
        .ok_or_else(|| GatewayError::MalformedResponse(format!("tool call {id} missing function")))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::MalformedResponse(format!("tool call {id} missing name")))?;

    let arguments: Map<String, Value> = match function.get("arguments") {
        Some(Value::String(s)) if !s.is_empty() => serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .ok_or_else(|| {
                GatewayError::MalformedResponse(format!("tool call {id} has unparsable arguments"))
            })?,
        // Some compatible servers send arguments as a JSON object directly.
        Some(Value::Object(o)) => o.clone(),
        _ => Map::new(),
    };

    Ok(ToolCallRequest::new(id, name, arguments))
}
