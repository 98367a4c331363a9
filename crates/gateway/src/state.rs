use std::sync::Arc;

use tokio::sync::RwLock;

use {
    sift_chat::ConversationLog, sift_config::SiftConfig, sift_gemini::GeminiClient,
    sift_state::StoreRegistry,
};

/// Shared gateway runtime state, wrapped in Arc for use across requests.
///
/// Each mutable piece sits behind its own tokio lock so concurrent requests
/// stay safe without serializing the whole handler.
pub struct GatewayState {
    pub config: SiftConfig,
    /// Swapped wholesale by `/update-api-key`.
    pub client: RwLock<GeminiClient>,
    /// Store handle + file records, mirrored to disk after every mutation.
    pub registry: RwLock<StoreRegistry>,
    /// Bounded conversation history. Not persisted.
    pub history: RwLock<ConversationLog>,
    pub version: String,
}

impl GatewayState {
    pub fn new(config: SiftConfig, client: GeminiClient, registry: StoreRegistry) -> Arc<Self> {
        Arc::new(Self {
            config,
            client: RwLock::new(client),
            registry: RwLock::new(registry),
            history: RwLock::new(ConversationLog::new()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Snapshot of the current client (cheap clone, shared pool).
    pub async fn client(&self) -> GeminiClient {
        self.client.read().await.clone()
    }

    /// Persist the registry. Failures are logged, not returned: the
    /// vendor-side work already happened.
    pub async fn save_registry(&self) {
        if let Err(e) = self.registry.read().await.save() {
            tracing::warn!(error = %e, "failed to persist store state");
        }
    }
}
