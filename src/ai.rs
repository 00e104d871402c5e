//! AI assistant wrappers
//!
//! Thin calls to the backend's chat and natural-language CRUD endpoints,
//! plus a bounded conversation history for display.

use crate::api::client::{envelope_message, ApiClient};
use crate::api::http::Body;
use crate::api::{ApiError, ApiResult};
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use uuid::Uuid;

/// Maximum messages kept in a conversation
const MAX_HISTORY: usize = 100;

/// A chat answer
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    /// The model answered with raw JSON instead of prose; `text` is pretty-printed
    pub structured: bool,
}

impl ChatReply {
    fn from_response_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Self {
                text: serde_json::to_string_pretty(&value).unwrap_or(text),
                structured: true,
            },
            _ => Self {
                text,
                structured: false,
            },
        }
    }
}

/// Result of a natural-language CRUD instruction
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CrudOutcome {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub matched_count: Option<u64>,
    #[serde(default)]
    pub modified_count: Option<u64>,
    #[serde(default)]
    pub deleted_count: Option<u64>,
    #[serde(default)]
    pub resource_id: Option<String>,
}

impl CrudOutcome {
    /// Human-readable lines describing what happened
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(matched) = self.matched_count {
            lines.push(format!("Matched: {} resources", matched));
            lines.push(format!("Modified: {} resources", self.modified_count.unwrap_or(0)));
        }
        if let Some(deleted) = self.deleted_count {
            lines.push(format!("Deleted: {} resources", deleted));
        }
        if let Some(id) = &self.resource_id {
            lines.push(format!("Created resource ID: {}", id));
        }
        if !self.message.is_empty() {
            lines.push(self.message.clone());
        }
        if lines.is_empty() {
            lines.push("Operation completed successfully".to_string());
        }
        lines
    }
}

pub async fn chat(client: &ApiClient, message: &str) -> ApiResult<ChatReply> {
    if message.trim().is_empty() {
        return Err(ApiError::Validation("Message is required".to_string()));
    }

    let response = client
        .post("/api/ai/chat", Some(&json!({ "message": message })))
        .await?;
    let text = response
        .get("data")
        .and_then(|d| d.get("response"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::ResponseShape {
            status: 200,
            detail: "chat response carries no text".to_string(),
        })?;

    Ok(ChatReply::from_response_text(text.to_string()))
}

/// Run a natural-language CRUD instruction.
///
/// When the backend cannot act because details are missing, the missing
/// field names come back as a validation error.
pub async fn natural_crud(client: &ApiClient, instruction: &str) -> ApiResult<CrudOutcome> {
    if instruction.trim().is_empty() {
        return Err(ApiError::Validation("Instruction is required".to_string()));
    }

    let parsed = client
        .post_parsed("/api/ai/natural-crud", &json!({ "instruction": instruction }))
        .await?;

    if !parsed.is_success() {
        if let Body::Json(value) = &parsed.body {
            let missing: Vec<String> = value
                .pointer("/data/missing_fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|f| f.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            if !missing.is_empty() {
                return Err(ApiError::Validation(format!(
                    "Missing information: {}",
                    missing.join(", ")
                )));
            }
        }
        return Err(parsed.into_error());
    }

    let envelope = parsed.into_json()?;
    let mut outcome = match envelope.get("data") {
        Some(data @ Value::Object(_)) => {
            serde_json::from_value::<CrudOutcome>(data.clone()).unwrap_or_default()
        }
        _ => CrudOutcome::default(),
    };
    if let Some(message) = envelope_message(&envelope) {
        outcome.message = message;
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

/// Which endpoint a conversation talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistantMode {
    #[default]
    Chat,
    Crud,
}

/// Bounded chat history
#[derive(Debug, Default)]
pub struct Conversation {
    pub mode: AssistantMode,
    messages: VecDeque<ChatMessage>,
}

impl Conversation {
    pub fn new(mode: AssistantMode) -> Self {
        Self {
            mode,
            messages: VecDeque::new(),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: ChatMessage) -> Uuid {
        let id = message.id;
        self.messages.push_back(message);
        while self.messages.len() > MAX_HISTORY {
            self.messages.pop_front();
        }
        id
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Send `input` in the current mode and record both sides.
    /// Failures are recorded as assistant messages and also returned.
    pub async fn send(&mut self, client: &ApiClient, input: &str) -> ApiResult<&ChatMessage> {
        self.push(ChatMessage::new(Speaker::User, input));

        let reply = match self.mode {
            AssistantMode::Chat => chat(client, input).await.map(|r| r.text),
            AssistantMode::Crud => natural_crud(client, input)
                .await
                .map(|o| o.describe().join("\n")),
        };

        match reply {
            Ok(text) => {
                self.push(ChatMessage::new(Speaker::Assistant, text));
                self.messages.back().ok_or_else(|| {
                    ApiError::Validation("conversation history is empty".to_string())
                })
            }
            Err(e) => {
                self.push(ChatMessage::new(
                    Speaker::Assistant,
                    format!("Error: {}", crate::api::format_api_error(&e)),
                ));
                Err(e)
            }
        }
    }
}
