//! Operational routes: `/status`, `/api-info`, `/health`, `/update-api-key`.

use std::{path::Path, sync::Arc};

use {
    axum::{Json, extract::State},
    secrecy::Secret,
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::info,
};

use sift_gemini::GeminiClient;

use crate::{GatewayError, GatewayState};

/// Env file rewritten by `/update-api-key`.
const ENV_FILE: &str = ".env";
const API_KEY_VAR: &str = "GEMINI_API_KEY";

pub(crate) async fn health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": state.version,
    }))
}

pub(crate) async fn status(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let registry = state.registry.read().await;
    let conversation_length = state.history.read().await.len();
    Json(json!({
        "file_uploaded": registry.store_name().is_some(),
        "conversation_length": conversation_length,
        "store_name": registry.store_name(),
        "uploaded_files": registry.files(),
    }))
}

/// Summary for a documentation/debug view. The API key itself is never
/// returned.
pub(crate) async fn api_info(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let registry = state.registry.read().await;
    Json(json!({
        "success": true,
        "model": state.config.gemini.model,
        "store_exists": registry.store_name().is_some(),
        "store_name": registry.store_name(),
        "store_display_name": state.config.gemini.store_display_name,
        "file_count": registry.len(),
        "files": registry.files(),
        "metadata_keys": registry.metadata_keys(),
        "example_metadata_filters": [],
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateApiKeyRequest {
    #[serde(default)]
    api_key: String,
}

pub(crate) async fn update_api_key(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<Value>, GatewayError> {
    let new_key = request.api_key.trim().to_string();
    if new_key.is_empty() {
        return Err(GatewayError::BadRequest("API key cannot be empty".into()));
    }

    rewrite_env_var(Path::new(ENV_FILE), API_KEY_VAR, &new_key)
        .map_err(GatewayError::Internal)?;

    // Swap the live client; in-flight requests keep their old snapshot.
    let mut client = GeminiClient::new(Secret::new(new_key));
    if let Some(base) = &state.config.gemini.base_url {
        client = client.with_base_url(base);
    }
    *state.client.write().await = client;
    info!("api key updated and client reinitialized");

    Ok(Json(json!({
        "success": true,
        "message": "API key updated successfully",
    })))
}

/// Replace `key=...` in a dotenv-style file, preserving every other line.
/// Appends the assignment when the key is absent; creates the file when
/// missing.
fn rewrite_env_var(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let prefix = format!("{key}=");
    let mut lines: Vec<String> = if path.exists() {
        std::fs::read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let mut found = false;
    for line in &mut lines {
        if line.starts_with(&prefix) {
            *line = format!("{prefix}{value}");
            found = true;
        }
    }
    if !found {
        lines.push(format!("{prefix}{value}"));
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_replaces_existing_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OTHER=1\nGEMINI_API_KEY=old\nMORE=2\n").unwrap();

        rewrite_env_var(&path, "GEMINI_API_KEY", "new-key").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "OTHER=1\nGEMINI_API_KEY=new-key\nMORE=2\n");
    }

    #[test]
    fn rewrite_appends_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OTHER=1\n").unwrap();

        rewrite_env_var(&path, "GEMINI_API_KEY", "k").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "OTHER=1\nGEMINI_API_KEY=k\n");
    }

    #[test]
    fn rewrite_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        rewrite_env_var(&path, "GEMINI_API_KEY", "k").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "GEMINI_API_KEY=k\n"
        );
    }
}
