//! `POST /upload`: stage the file locally, upload it to the raw Files API,
//! import it into the store, and poll the import to completion.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use {
    axum::{Json, extract::Multipart, extract::State},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{info, warn},
};

use {
    sift_gemini::{CustomMetadataEntry, GeminiClient, ImportOptions},
    sift_state::{ChunkingOptions, FileRecord, MetadataValue},
};

use crate::{GatewayError, GatewayState};

/// Client-side chunking toggle, as sent in the `chunking_config` form field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkingRequest {
    enabled: bool,
    max_tokens_per_chunk: Option<u32>,
    max_overlap_tokens: Option<u32>,
}

impl ChunkingRequest {
    fn into_options(self) -> Option<ChunkingOptions> {
        if !self.enabled {
            return None;
        }
        let defaults = ChunkingOptions::default();
        Some(ChunkingOptions {
            max_tokens_per_chunk: self
                .max_tokens_per_chunk
                .unwrap_or(defaults.max_tokens_per_chunk),
            max_overlap_tokens: self.max_overlap_tokens.unwrap_or(defaults.max_overlap_tokens),
        })
    }
}

/// Strip path components and anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Convert user metadata JSON into persisted values plus the wire entries
/// for the import call. Numbers stay numeric; everything else becomes text.
fn convert_metadata(
    raw: BTreeMap<String, Value>,
) -> (BTreeMap<String, MetadataValue>, Vec<CustomMetadataEntry>) {
    let mut persisted = BTreeMap::new();
    let mut entries = Vec::new();
    for (key, value) in raw {
        match value.as_f64() {
            Some(n) => {
                entries.push(CustomMetadataEntry::number(&key, n));
                persisted.insert(key, MetadataValue::Number(n));
            },
            None => {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                entries.push(CustomMetadataEntry::text(&key, &text));
                persisted.insert(key, MetadataValue::Text(text));
            },
        }
    }
    (persisted, entries)
}

async fn remove_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove staged file");
    }
}

/// Best-effort deletion of an orphaned raw file after a failed import.
async fn remove_orphan(client: &GeminiClient, file_api_name: &str) {
    if let Err(e) = client.delete_file(file_api_name).await {
        warn!(file = file_api_name, error = %e, "failed to delete orphaned raw file");
    }
}

pub(crate) async fn upload(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut metadata_raw: Option<String> = None;
    let mut chunking_raw: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::BadRequest(format!("failed to read file: {e}")))?;
                file = Some((filename, bytes));
            },
            Some("metadata") => {
                metadata_raw = Some(field.text().await.map_err(|e| {
                    GatewayError::BadRequest(format!("failed to read metadata: {e}"))
                })?);
            },
            Some("chunking_config") => {
                chunking_raw = Some(field.text().await.map_err(|e| {
                    GatewayError::BadRequest(format!("failed to read chunking config: {e}"))
                })?);
            },
            _ => {},
        }
    }

    let (raw_name, bytes) = file.ok_or_else(|| GatewayError::BadRequest("no file provided".into()))?;
    if raw_name.is_empty() {
        return Err(GatewayError::BadRequest("no file selected".into()));
    }
    if !state.config.uploads.is_allowed(&raw_name) {
        return Err(GatewayError::BadRequest("file type not supported".into()));
    }

    let metadata: BTreeMap<String, Value> = match metadata_raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| GatewayError::BadRequest(format!("invalid metadata JSON: {e}")))?,
        _ => BTreeMap::new(),
    };
    let chunking: Option<ChunkingOptions> = match chunking_raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<ChunkingRequest>(&raw)
            .map_err(|e| GatewayError::BadRequest(format!("invalid chunking config: {e}")))?
            .into_options(),
        _ => None,
    };
    let (persisted_metadata, metadata_entries) = convert_metadata(metadata);

    // Stage the file locally before any vendor call.
    let filename = sanitize_filename(&raw_name);
    let file_size = bytes.len() as u64;
    tokio::fs::create_dir_all(&state.config.uploads.dir)
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;
    let staged = state.config.uploads.dir.join(&filename);
    tokio::fs::write(&staged, &bytes)
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;
    info!(%filename, file_size, "file staged");

    let client = state.client().await;

    // Create the store on first use. The write lock is held across the
    // create call so concurrent first uploads cannot race to two stores.
    let (store_name, store_created) = {
        let mut registry = state.registry.write().await;
        if let Some(name) = registry.store_name() {
            (name.to_string(), false)
        } else {
            let created = match client
                .create_store(&state.config.gemini.store_display_name)
                .await
            {
                Ok(store) => store,
                Err(e) => {
                    drop(registry);
                    remove_staged(&staged).await;
                    return Err(e.into());
                },
            };
            registry.set_store_name(Some(created.name.clone()));
            (created.name, true)
        }
    };
    if store_created {
        // Mirror the new handle right away so the sidecar stays exact even
        // if the import below fails.
        state.save_registry().await;
    }

    // Raw upload, then import, then poll.
    let api_file = match client.upload_file(&staged, &filename).await {
        Ok(f) => f,
        Err(e) => {
            remove_staged(&staged).await;
            return Err(e.into());
        },
    };

    let options = ImportOptions {
        custom_metadata: metadata_entries,
        chunking: chunking
            .as_ref()
            .map(|c| (c.max_tokens_per_chunk, c.max_overlap_tokens)),
    };
    let document_id = match async {
        let operation = client.import_file(&store_name, &api_file.name, &options).await?;
        client.wait_for_import(operation).await
    }
    .await
    {
        Ok(doc) => doc,
        Err(e) => {
            // The raw file is now orphaned; clean up both copies best-effort.
            remove_orphan(&client, &api_file.name).await;
            remove_staged(&staged).await;
            return Err(e.into());
        },
    };

    let record = FileRecord {
        filename: filename.clone(),
        size: file_size,
        uploaded_at: FileRecord::timestamp_now(),
        custom_metadata: persisted_metadata,
        chunking,
        file_api_name: api_file.name,
        document_id: document_id.clone(),
    };

    let files = {
        let mut registry = state.registry.write().await;
        registry.push(record);
        serde_json::to_value(registry.files()).unwrap_or_default()
    };
    state.save_registry().await;
    remove_staged(&staged).await;
    info!(%filename, store = %store_name, "file uploaded and imported");

    Ok(Json(json!({
        "success": true,
        "message": format!("File \"{filename}\" uploaded and processed successfully"),
        "filename": filename,
        "file_size": file_size,
        "store_name": store_name,
        "document_id": document_id,
        "uploaded_files": files,
    })))
}
