//! Chat relay server for the DigitAI demo.
//!
//! `digitai-web` is an axum server that holds the upstream API key and
//! exposes a single stateless chat route to the browser (or to the
//! `digitai demo` terminal client). It also serves the PWA manifest and,
//! optionally, the exported frontend.
//!
//! # Quick start
//!
//! ```ignore
//! use digitai_web::{RelayConfig, WebConfig, spawn_web};
//!
//! let config = WebConfig {
//!     relay: RelayConfig {
//!         api_key: std::env::var("GOOGLE_GENERATIVE_AI_API_KEY").ok(),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! let addr = spawn_web(config).await?;
//! println!("Relay: http://{addr}/api/chat");
//! ```
//!
//! # Routes
//!
//! ```text
//! POST /api/chat               {messages, systemPrompt} -> {message} | {error}
//! GET  /health                 {"status":"ok"}
//! GET  /manifest.webmanifest   generated web app manifest
//! GET  /*                      static files (when static_dir is set)
//! ```

mod api;
pub mod error;
mod server;

pub use error::RelayError;
pub use server::{build_router, start_server};

use std::net::SocketAddr;
use std::path::PathBuf;

use digitai::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GEMINI_BASE_URL};

/// Reply sent when the upstream returns no text.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Desculpe, não consegui gerar uma resposta.";

/// Upstream settings for the chat relay.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Upstream API key. `None` makes every chat request fail with
    /// "API key not configured".
    pub api_key: Option<String>,
    /// Default: `gemini-2.0-flash`.
    pub model: String,
    /// Base URL of the generative-language API.
    pub upstream_base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Reply used when the upstream response carries no candidate text.
    pub fallback_message: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            upstream_base_url: GEMINI_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory of the exported frontend, served as a fallback for any
    /// path not matched by a route. `None` serves the API only.
    pub static_dir: Option<PathBuf>,
    pub relay: RelayConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
            relay: RelayConfig::default(),
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// Fails if the upstream HTTP client cannot be built or the address cannot
/// be bound. The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(config: WebConfig) -> digitai::Result<SocketAddr> {
    let router = build_router(config.relay, config.static_dir)?;
    start_server(router, config.bind_addr).await
}
