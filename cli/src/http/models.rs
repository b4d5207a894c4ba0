//! OpenAI chat completion wire types.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ocbridge_core::api::CompletionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SYSTEM_FINGERPRINT: &str = "fp_opencode";

// ============= Request =============

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: Option<bool>,

    // Accepted for client compatibility; opencode has no equivalent knobs.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub n: Option<u32>,
    #[serde(default)]
    pub stop: Option<StopSequences>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub logit_bias: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub logprobs: Option<bool>,
    #[serde(default)]
    pub top_logprobs: Option<u32>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    #[serde(default)]
    pub tool_choice: Option<Value>,
    #[serde(default)]
    pub stream_options: Option<Value>,
}

impl ChatCompletionRequest {
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

impl MessageContent {
    /// Flatten to plain text; only `{"type": "text"}` parts are kept, joined by `\n`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                .map(|p| p.get("text").and_then(Value::as_str).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ============= Responses =============

#[derive(Debug, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub system_fingerprint: &'static str,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub logprobs: Option<Value>,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatCompletion {
    pub fn new(id: String, model: String, created: i64, content: String) -> Self {
        Self {
            id,
            object: "chat.completion",
            created,
            model,
            system_fingerprint: SYSTEM_FINGERPRINT,
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content,
                },
                logprobs: None,
                finish_reason: "stop",
            }],
            usage: Usage::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub system_fingerprint: &'static str,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub logprobs: Option<Value>,
    pub finish_reason: Option<&'static str>,
}

/// Serializes to `{}` when empty, as in the final chunk.
#[derive(Debug, Default, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    pub fn new(
        id: &str,
        model: &str,
        created: i64,
        delta: Delta,
        finish_reason: Option<&'static str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk",
            created,
            model: model.to_string(),
            system_fingerprint: SYSTEM_FINGERPRINT,
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                logprobs: None,
                finish_reason,
            }],
        }
    }

    pub fn role(id: &str, model: &str, created: i64) -> Self {
        let delta = Delta {
            role: Some("assistant"),
            content: Some(String::new()),
        };
        Self::new(id, model, created, delta, None)
    }

    pub fn content(id: &str, model: &str, created: i64, ch: char) -> Self {
        let delta = Delta {
            role: None,
            content: Some(ch.to_string()),
        };
        Self::new(id, model, created, delta, None)
    }

    pub fn stop(id: &str, model: &str, created: i64) -> Self {
        Self::new(id, model, created, Delta::default(), Some("stop"))
    }
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Serialize)]
pub struct ModelCard {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub errors_total: u64,
    pub timestamp: String,
}

// ============= Error Handling =============

#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
    Completion(CompletionError),
}

impl From<CompletionError> for HttpServerError {
    fn from(e: CompletionError) -> Self {
        Self::Completion(e)
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::InvalidRequest(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                "invalid_request",
                msg,
            ),
            Self::Completion(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                e.code(),
                format!("Error processing request: {e}"),
            ),
        };

        let body = serde_json::json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": code,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_defaults_to_non_streaming() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert!(!req.is_stream());
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn optional_openai_fields_are_accepted() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-4",
            "messages": [],
            "stream": true,
            "temperature": 0.2,
            "stop": "END",
            "logit_bias": {"50256": -100.0},
            "tools": [{"type": "function"}],
            "tool_choice": "auto",
            "stream_options": {"include_usage": true},
            "some_future_field": 1
        }))
        .unwrap();
        assert!(req.is_stream());
        assert!(matches!(req.stop, Some(StopSequences::One(ref s)) if s == "END"));
    }

    #[test]
    fn content_parts_keep_only_text() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "look at"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "this"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.content.unwrap().to_text(), "look at\nthis");
    }

    #[test]
    fn final_chunk_has_empty_delta() {
        let chunk = ChatCompletionChunk::stop("chatcmpl-1", "m", 0);
        let v = serde_json::to_value(&chunk).unwrap();
        assert_eq!(v["choices"][0]["delta"], json!({}));
        assert_eq!(v["choices"][0]["finish_reason"], "stop");
        assert_eq!(v["choices"][0]["logprobs"], Value::Null);
        assert_eq!(v["object"], "chat.completion.chunk");
    }

    #[test]
    fn role_chunk_announces_assistant() {
        let v = serde_json::to_value(ChatCompletionChunk::role("id", "m", 0)).unwrap();
        assert_eq!(
            v["choices"][0]["delta"],
            json!({"role": "assistant", "content": ""})
        );
        assert_eq!(v["choices"][0]["finish_reason"], Value::Null);
    }

    #[test]
    fn completion_has_zero_usage() {
        let v = serde_json::to_value(ChatCompletion::new(
            "chatcmpl-abc".into(),
            "gpt-4".into(),
            1,
            "Hi\n".into(),
        ))
        .unwrap();
        assert_eq!(v["object"], "chat.completion");
        assert_eq!(v["system_fingerprint"], "fp_opencode");
        assert_eq!(
            v["choices"][0]["message"],
            json!({"role": "assistant", "content": "Hi\n"})
        );
        assert_eq!(
            v["usage"],
            json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
        );
    }
}
