// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the GigaChat REST API.

use serde::{Deserialize, Serialize};

/// A chat message in a completion request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub repetition_penalty: f32,
}

impl ChatRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            top_p: 1.0,
            n: 1,
            stream: false,
            max_tokens,
            repetition_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Body of a successful chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub created: i64,
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}

/// Body of a successful OAuth exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Expiry as Unix epoch milliseconds.
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub owned_by: String,
}

/// Body of `GET /models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelEntry>,
}

/// Error body returned by the API on non-2xx answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// Extracts a readable message from an error body, falling back to the raw text.
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_max_tokens() {
        let req = ChatRequest::new("GigaChat", vec![ChatMessage::user("hi")], 0.5, None);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["top_p"], 1.0);
        assert_eq!(json["n"], 1);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn response_parses_with_usage() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "ok"},
                         "index": 0, "finish_reason": "stop"}],
            "created": 1700000000,
            "model": "GigaChat:1.0",
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12},
            "object": "chat.completion"
        }"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.choices[0].message.content, "ok");
        assert_eq!(resp.usage.total_tokens, 12);
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(404, r#"{"status":404,"message":"No such model"}"#),
            "No such model"
        );
        assert_eq!(error_message(400, "bad things"), "bad things");
        assert_eq!(error_message(502, ""), "HTTP 502");
    }
}
