//! DigitAI chat relay server.
//!
//! # Usage
//!
//! ```bash
//! GOOGLE_GENERATIVE_AI_API_KEY=... cargo run -p digitai-web
//! GOOGLE_GENERATIVE_AI_API_KEY=... cargo run -p digitai-web -- --port 8080 --static-dir out
//! ```
//!
//! Then chat through it from the terminal:
//!
//! ```bash
//! cargo run -p digitai -- demo --name "Clínica X" --services "Consultas"
//! ```
//!
//! or directly:
//!
//! ```bash
//! curl -s localhost:3001/api/chat -H 'content-type: application/json' \
//!   -d '{"messages":[{"role":"user","content":"Oi"}],"systemPrompt":"Seja breve."}'
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use digitai::{API_KEY_ENV, DEFAULT_MODEL, GEMINI_BASE_URL};
use digitai_web::{DEFAULT_FALLBACK_MESSAGE, RelayConfig, WebConfig, spawn_web};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chat relay server for the DigitAI demo.
#[derive(Parser)]
#[command(about = "Relay chat requests from the DigitAI demo to the Gemini API")]
struct Args {
    /// Upstream API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the relay server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Exported frontend to serve for non-API paths.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Upstream model.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generative-language API.
    #[arg(long, default_value = GEMINI_BASE_URL)]
    upstream_url: String,

    /// Reply used when the upstream returns no text.
    #[arg(long, default_value = DEFAULT_FALLBACK_MESSAGE)]
    fallback_message: String,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = WebConfig {
        bind_addr: (args.host, args.port).into(),
        static_dir: args.static_dir,
        relay: RelayConfig {
            api_key: args.api_key,
            model: args.model,
            upstream_base_url: args.upstream_url,
            fallback_message: args.fallback_message,
            ..Default::default()
        },
    };

    let addr = spawn_web(config).await.map_err(|e| e.to_string())?;
    info!("relay listening on http://{addr}");
    println!("Relay: http://{addr}/api/chat");

    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
    info!("shutting down");
    Ok(())
}
