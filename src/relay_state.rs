use crate::io_struct::{CompletionRequest, CompletionResponse, LeadVerdict, Message};
use reqwest::StatusCode;
use std::time::Duration;

/// Model fallback order for the lead classifier, tried first to last.
pub const MODEL_FALLBACKS: [&str; 4] = [
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "allam-2-7b",
    "groq/compound-mini",
];

/// Extra attempts per model after the first, for 5xx responses only.
pub const RETRIES_PER_MODEL: u32 = 2;

const LEAD_MAX_TOKENS: u32 = 512;
const LEAD_TEMPERATURE: f32 = 0.2;

const LEAD_SYSTEM_PROMPT: &str = "\
You are a strict lead filter for a freelance Python developer.

You are given ONE message from a programmers' chat. You have NO thread \
context or history; judge ONLY this text.

Decide whether THIS message is a potential commercial lead: a paid job, \
a vacancy, a work offer, or a request for paid help.

Set is_lead = true only if the author of this message EXPLICITLY offers \
paid work, is looking for a developer or team to hire, or offers payment \
for a concrete task. Mentions of budget, rates, salary or currency are \
strong signals.

Set is_lead = false for replies and comments, technology or study \
discussion, developers advertising themselves, internship or free-mentor \
requests, and anything without a clear sign of work for money. Never \
assume a vacancy existed elsewhere in the thread. When in doubt, set \
is_lead = false and explain what is missing.

Answer with strict JSON only:

{\"is_lead\": boolean, \"summary\": \"one line on the job, or why it is \
not a lead\", \"reason\": \"detailed explanation quoting the key phrases\"}";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Full URL of the upstream chat-completion endpoint.
    pub upstream_url: String,
    /// Absence is surfaced per request, never at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RelayState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
}

/// Terminal result of the lead fallback loop.
#[derive(Debug)]
pub enum LeadOutcome {
    /// The model answered with parseable strict JSON.
    Verdict { model: String, verdict: LeadVerdict },
    /// The model answered, but not with JSON; the raw content is relayed.
    Raw { model: String, content: String },
    /// Every model either failed or was rate limited.
    Exhausted,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// One POST to the upstream endpoint with bearer auth. No retry; the
    /// client-level timeout bounds the call.
    pub async fn complete(
        &self,
        key: &str,
        payload: &CompletionRequest,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(&self.config.upstream_url)
            .bearer_auth(key)
            .json(payload)
            .send()
            .await
    }

    /// Builds the single-user-message payload for the chat relay.
    pub fn chat_payload(&self, message: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![Message::user(message)],
            max_tokens: self.config.max_tokens,
            temperature: None,
        }
    }

    /// Runs the lead classification with model fallback: 429 moves to the
    /// next model immediately, 5xx retries with linear backoff, anything
    /// else abandons the current model.
    pub async fn classify_lead(&self, key: &str, text: &str) -> LeadOutcome {
        for (model_idx, model) in MODEL_FALLBACKS.iter().enumerate() {
            log::info!(
                "lead model {}/{}: {}",
                model_idx + 1,
                MODEL_FALLBACKS.len(),
                model
            );

            for attempt in 0..=RETRIES_PER_MODEL {
                let payload = CompletionRequest {
                    model: model.to_string(),
                    messages: vec![
                        Message::system(LEAD_SYSTEM_PROMPT),
                        Message::user(text),
                    ],
                    max_tokens: LEAD_MAX_TOKENS,
                    temperature: Some(LEAD_TEMPERATURE),
                };

                let resp = match self.complete(key, &payload).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        log::error!("[{}] transport error: {}", model, e);
                        break;
                    }
                };

                let status = resp.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    log::warn!("[{}] rate limited, switching model", model);
                    break;
                }
                if status.is_server_error() {
                    if attempt < RETRIES_PER_MODEL {
                        log::warn!(
                            "[{}] upstream {}, retry {}/{}",
                            model,
                            status,
                            attempt + 1,
                            RETRIES_PER_MODEL
                        );
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1)))
                            .await;
                        continue;
                    }
                    break;
                }
                if !status.is_success() {
                    log::error!("[{}] upstream returned {}", model, status);
                    break;
                }

                // A 2xx body missing any link of the choices chain still
                // counts as an answer with empty content; only an
                // unparseable body abandons the model.
                let content = match resp.json::<serde_json::Value>().await {
                    Ok(completion) => completion
                        .pointer("/choices/0/message/content")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    Err(e) => {
                        log::error!("[{}] unreadable completion: {}", model, e);
                        break;
                    }
                };
                log::info!("[{}] success", model);

                return match serde_json::from_str::<LeadVerdict>(extract_json_slice(&content)) {
                    Ok(verdict) => LeadOutcome::Verdict {
                        model: model.to_string(),
                        verdict,
                    },
                    Err(_) => {
                        log::warn!("[{}] reply is not JSON, relaying raw content", model);
                        LeadOutcome::Raw {
                            model: model.to_string(),
                            content,
                        }
                    }
                };
            }

            log::warn!("[{}] exhausted, trying next model", model);
        }

        log::error!("all lead models failed or were rate limited");
        LeadOutcome::Exhausted
    }
}

/// Pulls `choices[0].message.content` out of a raw upstream body.
/// `None` covers every shape mismatch: invalid JSON, no choices, or a
/// missing content field.
pub fn extract_reply(raw: &str) -> Option<String> {
    let completion: CompletionResponse = serde_json::from_str(raw).ok()?;
    completion.choices.into_iter().next()?.message.content
}

/// The substring between the first `{` and the last `}`, for models that
/// wrap their JSON answer in prose. Falls back to the whole content.
pub fn extract_json_slice(content: &str) -> &str {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => content,
    }
}

/// First `max` characters of `s`. Character count, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
