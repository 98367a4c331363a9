//! `POST /chat` and `POST /clear`: bounded-history chat with retrieval.

use std::sync::Arc;

use {
    axum::{Json, extract::State},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::info,
};

use crate::{GatewayError, GatewayState};

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    metadata_filter: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
}

pub(crate) async fn chat(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, GatewayError> {
    if request.message.is_empty() {
        return Err(GatewayError::BadRequest("no message provided".into()));
    }

    let store_name = {
        let registry = state.registry.read().await;
        registry.store_name().map(str::to_string)
    };
    // Reject before any generation call.
    let Some(store_name) = store_name else {
        return Err(GatewayError::BadRequest("please upload a file first".into()));
    };

    let prompt = {
        let mut history = state.history.write().await;
        history.push_user(&request.message);
        history.render_prompt(request.system_prompt.as_deref())
    };

    let filter = request
        .metadata_filter
        .as_deref()
        .filter(|f| !f.is_empty());
    info!(filter = filter.unwrap_or("<none>"), "running retrieval query");

    let client = state.client().await;
    let response = client
        .generate_with_file_search(
            &state.config.gemini.model,
            &prompt,
            std::slice::from_ref(&store_name),
            filter,
        )
        .await?;

    let answer = response.text();
    let conversation_length = {
        let mut history = state.history.write().await;
        history.push_assistant(&answer);
        history.len()
    };

    // `metadata` is null when the vendor attached no grounding metadata at
    // all, not an empty citation list.
    let metadata = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|_| {
            let citations = response.citations();
            json!({
                "citation_count": citations.len(),
                "citations": citations,
            })
        });

    Ok(Json(json!({
        "success": true,
        "response": answer,
        "metadata": metadata,
        "conversation_length": conversation_length,
        "metadata_filter_used": filter,
    })))
}

pub(crate) async fn clear(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    state.history.write().await.clear();
    info!("conversation history cleared");
    Json(json!({ "success": true, "message": "Conversation cleared" }))
}
