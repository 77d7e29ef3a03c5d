//! Core of the DigitAI demo: turn a business description into a WhatsApp
//! agent persona and chat with it.
//!
//! `digitai` contains everything that is not HTTP-server plumbing:
//!
//! - [`profile`]: the [`BusinessProfile`](profile::BusinessProfile) a visitor
//!   fills in and the fixed set of business categories.
//! - [`prompt`]: the Prompt Composer that renders a profile into a system
//!   prompt.
//! - [`session`]: the Demo Session Controller (setup → chat state machine,
//!   transcript, single in-flight relay call).
//! - [`relay`]: the wire contract of the chat relay endpoint, the
//!   [`ChatRelay`](relay::ChatRelay) seam and its HTTP implementation.
//! - [`pwa`] and [`assets`]: installable-web-app state and offline asset
//!   generation.
//!
//! This root module holds the chat message types and the [`GeminiClient`]
//! used by the relay server to reach the upstream generative-language API.
//!
//! # Example
//!
//! ```ignore
//! use digitai::profile::{BusinessCategory, BusinessProfile};
//! use digitai::relay::RelayClient;
//! use digitai::session::DemoSession;
//!
//! let mut session = DemoSession::new();
//! session.profile_mut().unwrap().name = "Clínica X".into();
//! session.profile_mut().unwrap().services = "Consultas".into();
//! session.start_chat()?;
//!
//! let relay = RelayClient::new("http://127.0.0.1:3001")?;
//! session.submit(&relay, "Vocês atendem sábado?").await;
//! println!("{}", session.transcript().last().unwrap().content);
//! ```

pub mod assets;
pub mod error;
pub mod profile;
pub mod prompt;
pub mod pwa;
pub mod relay;
pub mod session;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the Google generative-language API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for relayed conversations.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Sampling temperature sent with every relayed conversation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Output token cap sent with every relayed conversation.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

// ── Message types ──────────────────────────────────────────────────

/// Author of a [`ChatTurn`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a demo transcript.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Upstream request types ─────────────────────────────────────────

/// Role tag understood by the upstream API. Assistant turns are `model`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamRole {
    User,
    Model,
}

impl From<Role> for UpstreamRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => UpstreamRole::User,
            Role::Assistant => UpstreamRole::Model,
        }
    }
}

/// A text fragment of a [`Content`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// A role-tagged list of parts. The system instruction has no role.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UpstreamRole>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Sampling parameters.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Body of a `generateContent` call.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Map a transcript plus system prompt into the upstream shape.
    ///
    /// User turns keep the `user` tag, assistant turns become `model`, and
    /// the system prompt travels in the separate instruction channel.
    pub fn from_turns(
        turns: &[ChatTurn],
        system_prompt: &str,
        generation_config: GenerationConfig,
    ) -> Self {
        let contents = turns
            .iter()
            .map(|turn| Content {
                role: Some(turn.role.into()),
                parts: vec![Part::text(turn.content.clone())],
            })
            .collect();
        Self {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(system_prompt)],
            }),
            generation_config,
        }
    }
}

// ── Upstream response types ────────────────────────────────────────

/// Parsed `generateContent` response. Every field is optional because the
/// upstream omits candidates on safety blocks and empty generations.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if there is one.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the Gemini `generateContent` endpoint.
///
/// The API key is sent in the `x-goog-api-key` header so it never appears in
/// a URL that might end up in a log line.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint with the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, GEMINI_BASE_URL)
    }

    /// Create a client against a custom base URL (a proxy or a test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("digitai/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send a `generateContent` request.
    ///
    /// Non-success statuses become [`Error::Status`] carrying the response
    /// body so callers can log it.
    pub async fn generate(&self, body: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        debug!(
            "Gemini request: model={}, contents={}, max_output_tokens={}, temp={}",
            self.model,
            body.contents.len(),
            body.generation_config.max_output_tokens,
            body.generation_config.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        debug!(
            "Gemini response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;

        if let Some(ref usage) = parsed.usage_metadata {
            debug!(
                "Token usage: prompt={}, candidates={}, total={}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count.unwrap_or(0),
            );
        }

        Ok(parsed)
    }
}
