use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical request payload shape for the streaming chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionRequest {
    pub fastgpt_app_id: String,
    pub chat_id: String,
    /// Default: true.
    #[serde(default = "default_true")]
    pub stream: bool,
    /// Default: false.
    #[serde(default)]
    pub detail: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub share_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub out_link_uid: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl ChatCompletionRequest {
    pub fn new(
        fastgpt_app_id: impl Into<String>,
        chat_id: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self {
            fastgpt_app_id: fastgpt_app_id.into(),
            chat_id: chat_id.into(),
            stream: true,
            detail: false,
            share_id: String::new(),
            out_link_uid: String::new(),
            messages,
            variables: None,
        }
    }
}

/// One model-facing conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    #[serde(
        rename = "hideInUI",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hide_in_ui: Option<bool>,
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            data_id: None,
            hide_in_ui: None,
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            data_id: None,
            hide_in_ui: None,
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}
