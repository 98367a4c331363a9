//! `GET /files` and `DELETE /delete-file/{index}`.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, State},
    },
    serde_json::{Value, json},
    tracing::{info, warn},
};

use crate::{GatewayError, GatewayState};

pub(crate) async fn list(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let registry = state.registry.read().await;
    Json(json!({
        "success": true,
        "files": registry.files(),
        "store_name": registry.store_name(),
    }))
}

pub(crate) async fn delete(
    State(state): State<Arc<GatewayState>>,
    Path(index): Path<usize>,
) -> Result<Json<Value>, GatewayError> {
    // Bounds check up front so nothing is mutated on a bad index.
    let record = {
        let registry = state.registry.read().await;
        registry
            .files()
            .get(index)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("no file at index {index}")))?
    };

    // Vendor-side raw file deletion is best-effort; the local record goes
    // away regardless.
    let client = state.client().await;
    if let Err(e) = client.delete_file(&record.file_api_name).await {
        warn!(file = %record.file_api_name, error = %e, "could not delete raw file");
    }

    let files = {
        let mut registry = state.registry.write().await;
        registry.remove(index);
        serde_json::to_value(registry.files()).unwrap_or_default()
    };
    state.save_registry().await;
    info!(filename = %record.filename, index, "file deleted");

    Ok(Json(json!({
        "success": true,
        "message": format!("File '{}' deleted successfully", record.filename),
        "uploaded_files": files,
    })))
}
