use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{delete, get, post},
    },
    secrecy::Secret,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use {sift_config::SiftConfig, sift_gemini::GeminiClient, sift_state::StoreRegistry};

use crate::{admin, chat, files, state::GatewayState, stores, upload};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_bytes = state.config.uploads.max_bytes;

    Router::new()
        .route("/health", get(admin::health))
        .route("/upload", post(upload::upload))
        .route("/chat", post(chat::chat))
        .route("/clear", post(chat::clear))
        .route("/files", get(files::list))
        .route("/delete-file/{index}", delete(files::delete))
        .route("/store-info", get(stores::info))
        .route("/stores", get(stores::list))
        .route("/delete-store", delete(stores::delete))
        .route("/status", get(admin::status))
        .route("/api-info", get(admin::api_info))
        .route("/update-api-key", post(admin::update_api_key))
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Startup ──────────────────────────────────────────────────────────────────

/// Resolve credentials, restore persisted state, and serve.
pub async fn start_gateway(config: SiftConfig) -> anyhow::Result<()> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| config.gemini.api_key.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("GEMINI_API_KEY not set (env var or [gemini].api_key in config)")
        })?;

    let mut client = GeminiClient::new(Secret::new(api_key));
    if let Some(base) = &config.gemini.base_url {
        client = client.with_base_url(base);
    }

    let mut registry = StoreRegistry::load(config.uploads.state_file.clone());
    verify_restored_store(&client, &mut registry).await;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = GatewayState::new(config, client, registry);

    // Startup banner.
    let store_line = {
        let registry = state.registry.try_read();
        match registry {
            Ok(r) => format!(
                "store: {}, {} file(s)",
                r.store_name().unwrap_or("<none>"),
                r.len()
            ),
            Err(_) => "store: <unknown>".to_string(),
        }
    };
    let lines = [
        format!("sift gateway v{}", state.version),
        format!("listening on {addr}"),
        format!("model: {}", state.config.gemini.model),
        store_line,
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    let app = build_app(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Drop persisted state that references a store the vendor no longer has.
/// A record pointing into a dead store is useless after restart.
async fn verify_restored_store(client: &GeminiClient, registry: &mut StoreRegistry) {
    let Some(name) = registry.store_name().map(str::to_string) else {
        return;
    };
    match client.get_store(&name).await {
        Ok(_) => {
            info!(store = %name, files = registry.len(), "restored file search store");
        },
        Err(e) => {
            warn!(store = %name, error = %e, "persisted store not found, discarding stale state");
            registry.reset();
            if let Err(e) = registry.save() {
                warn!(error = %e, "failed to rewrite state file");
            }
        },
    }
}
