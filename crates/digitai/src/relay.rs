//! Chat relay contract and client.
//!
//! The relay endpoint (`POST /api/chat`, served by `digitai-web`) is the only
//! component holding the upstream API key. The session controller talks to
//! it through the [`ChatRelay`] trait so tests can substitute a scripted
//! relay; [`RelayClient`] is the HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ChatTurn;
use crate::error::{Error, Result};

/// Path of the relay route, relative to the server base URL.
pub const RELAY_PATH: &str = "/api/chat";

/// Request body accepted by the relay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub messages: Vec<ChatTurn>,
    pub system_prompt: String,
}

/// Success body returned by the relay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelayReply {
    pub message: String,
}

/// Failure body returned by the relay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelayErrorBody {
    pub error: String,
}

/// Boxed future returned by [`ChatRelay::send`].
pub type RelayFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Anything that can turn a conversation into the assistant's next reply.
pub trait ChatRelay: Send + Sync {
    /// Send the full history plus system prompt and return the reply text.
    fn send<'a>(&'a self, request: &'a RelayRequest) -> RelayFuture<'a>;
}

/// HTTP client for a running relay server.
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
}

impl RelayClient {
    /// Create a client for the relay hosted at `base_url`
    /// (e.g. `http://127.0.0.1:3001`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}{RELAY_PATH}", base_url.as_ref().trim_end_matches('/')),
        })
    }

    /// Full URL of the relay route.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, request: &RelayRequest) -> Result<String> {
        debug!("relay request: {} message(s) -> {}", request.messages.len(), self.url);

        let resp = self.client.post(&self.url).json(request).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let reply: RelayReply = serde_json::from_str(&text)?;
        Ok(reply.message)
    }
}

impl ChatRelay for RelayClient {
    fn send<'a>(&'a self, request: &'a RelayRequest) -> RelayFuture<'a> {
        Box::pin(self.post(request))
    }
}
