//! Store-level routes: `/store-info`, `/stores`, `/delete-store`.

use std::sync::Arc;

use {
    axum::{Json, extract::State},
    serde_json::{Value, json},
    tracing::info,
};

use crate::{GatewayError, GatewayState};

pub(crate) async fn info(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Value>, GatewayError> {
    let (store_name, document_count) = {
        let registry = state.registry.read().await;
        (registry.store_name().map(str::to_string), registry.len())
    };
    let Some(store_name) = store_name else {
        return Ok(Json(json!({
            "success": true,
            "store_exists": false,
            "message": "No file search store created yet",
        })));
    };

    let client = state.client().await;
    let store = client.get_store(&store_name).await?;

    Ok(Json(json!({
        "success": true,
        "store_exists": true,
        "name": store.name,
        "display_name": store.display_name,
        "create_time": store.create_time,
        "update_time": store.update_time,
        "document_count": document_count,
    })))
}

pub(crate) async fn list(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Value>, GatewayError> {
    let client = state.client().await;
    let stores = client.list_stores().await?;
    let stores: Vec<Value> = stores
        .into_iter()
        .map(|s| {
            json!({
                "name": s.name,
                "display_name": s.display_name,
                "create_time": s.create_time,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": stores.len(),
        "stores": stores,
    })))
}

pub(crate) async fn delete(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Value>, GatewayError> {
    let store_name = {
        let registry = state.registry.read().await;
        registry.store_name().map(str::to_string)
    };
    let Some(store_name) = store_name else {
        return Err(GatewayError::BadRequest("no store to delete".into()));
    };

    let client = state.client().await;
    client.delete_store(&store_name, true).await?;

    // Handle and records go together.
    state.registry.write().await.reset();
    state.save_registry().await;
    info!(store = %store_name, "store deleted and state reset");

    Ok(Json(json!({
        "success": true,
        "message": "File search store deleted successfully",
    })))
}
