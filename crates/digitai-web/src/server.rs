//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use digitai::relay::RELAY_PATH;
use digitai::{GeminiClient, GenerationConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::RelayConfig;
use crate::api::{self, AppState};

/// Build the full axum router.
///
/// The router serves:
/// - the chat relay at `/api/chat`
/// - `/health` and `/manifest.webmanifest`
/// - optional static files for the exported frontend
pub fn build_router(relay: RelayConfig, static_dir: Option<PathBuf>) -> digitai::Result<Router> {
    let gemini = match relay.api_key {
        Some(key) if !key.is_empty() => Some(Arc::new(
            GeminiClient::with_base_url(key, relay.upstream_base_url)?.with_model(relay.model),
        )),
        _ => {
            warn!("no upstream API key configured; chat requests will fail");
            None
        }
    };

    let app_state = AppState {
        gemini,
        generation: GenerationConfig {
            temperature: relay.temperature,
            max_output_tokens: relay.max_output_tokens,
        },
        fallback_message: relay.fallback_message.into(),
    };

    // The frontend dev server runs on a different port.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route(RELAY_PATH, post(api::post_chat))
        .route("/health", get(api::health))
        .route("/manifest.webmanifest", get(api::manifest))
        .with_state(app_state)
        .layer(cors);

    if let Some(dir) = static_dir {
        info!("serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    Ok(router)
}

/// Bind `bind_addr`, start serving on a background task and return the
/// bound address (useful with port 0).
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> digitai::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("server error: {e}");
        }
    });

    Ok(addr)
}
