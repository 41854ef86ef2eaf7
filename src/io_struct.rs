use serde::{Deserialize, Serialize};

/// Body of `POST /api/groq-proxy`. A missing `message` relays the empty
/// string rather than rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ChatReqInput {
    #[serde(default)]
    pub message: String,
}

/// Body of `POST /api/groq-proxy-leads`.
#[derive(Debug, Deserialize)]
pub struct LeadReqInput {
    pub text: Option<String>,
}

/// One message in an OpenAI-compatible conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// OpenAI-compatible chat completion payload sent upstream.
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// The slice of the upstream response this relay consumes:
/// `choices[0].message.content`. Everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Strict-JSON verdict the lead classifier asks the model to emit.
#[derive(Debug, Deserialize, Serialize)]
pub struct LeadVerdict {
    #[serde(default)]
    pub is_lead: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub reason: String,
}
