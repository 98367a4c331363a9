//! File search stores: CRUD, file import, and operation polling.

use std::time::Duration;

use {
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::{debug, error, info},
};

use crate::{Error, GeminiClient, Result};

/// How often the import operation is re-checked.
pub const IMPORT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Ceiling on the total import wait. The vendor-side job is not cancelled
/// when this is exceeded.
pub const IMPORT_POLL_CEILING: Duration = Duration::from_secs(120);

/// A vendor-managed file search store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSearchStore {
    /// Resource name, `fileSearchStores/...`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

/// One `customMetadata` entry on an import call. Exactly one of the two
/// value fields is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadataEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
}

impl CustomMetadataEntry {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            string_value: Some(value.into()),
            numeric_value: None,
        }
    }

    pub fn number(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            string_value: None,
            numeric_value: Some(value),
        }
    }
}

/// Optional knobs on an import call.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub custom_metadata: Vec<CustomMetadataEntry>,
    /// Whitespace chunking: (max tokens per chunk, max overlap tokens).
    pub chunking: Option<(u32, u32)>,
}

impl ImportOptions {
    fn is_empty(&self) -> bool {
        self.custom_metadata.is_empty() && self.chunking.is_none()
    }
}

/// A long-running operation returned by `importFile`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OperationResponse>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// Document resource name of the imported file, when reported.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListStoresPage {
    #[serde(default)]
    file_search_stores: Vec<FileSearchStore>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl GeminiClient {
    /// Create a new file search store.
    pub async fn create_store(&self, display_name: &str) -> Result<FileSearchStore> {
        let response = self
            .http
            .post(self.url("fileSearchStores"))
            .header("x-goog-api-key", self.api_key())
            .json(&json!({ "displayName": display_name }))
            .send()
            .await
            .map_err(Self::transport("fileSearchStores.create"))?;
        let response = Self::check("fileSearchStores.create", response).await?;
        let store: FileSearchStore = response
            .json()
            .await
            .map_err(Self::transport("fileSearchStores.create"))?;
        info!(name = %store.name, display_name, "created file search store");
        Ok(store)
    }

    /// Fetch a store by resource name.
    pub async fn get_store(&self, name: &str) -> Result<FileSearchStore> {
        let response = self
            .http
            .get(self.url(name))
            .header("x-goog-api-key", self.api_key())
            .send()
            .await
            .map_err(Self::transport("fileSearchStores.get"))?;
        let response = Self::check("fileSearchStores.get", response).await?;
        response
            .json()
            .await
            .map_err(Self::transport("fileSearchStores.get"))
    }

    /// List all stores, following pagination.
    pub async fn list_stores(&self) -> Result<Vec<FileSearchStore>> {
        let mut stores = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.url("fileSearchStores"))
                .header("x-goog-api-key", self.api_key());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let response = request
                .send()
                .await
                .map_err(Self::transport("fileSearchStores.list"))?;
            let response = Self::check("fileSearchStores.list", response).await?;
            let page: ListStoresPage = response
                .json()
                .await
                .map_err(Self::transport("fileSearchStores.list"))?;

            stores.extend(page.file_search_stores);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(stores),
            }
        }
    }

    /// Delete a store. `force` also removes its documents.
    pub async fn delete_store(&self, name: &str, force: bool) -> Result<()> {
        let response = self
            .http
            .delete(self.url(name))
            .header("x-goog-api-key", self.api_key())
            .query(&[("force", force)])
            .send()
            .await
            .map_err(Self::transport("fileSearchStores.delete"))?;
        Self::check("fileSearchStores.delete", response).await?;
        info!(name, "deleted file search store");
        Ok(())
    }

    /// Start importing a raw file into a store. Returns the long-running
    /// operation to poll.
    pub async fn import_file(
        &self,
        store_name: &str,
        file_name: &str,
        options: &ImportOptions,
    ) -> Result<Operation> {
        let mut body = json!({ "fileName": file_name });
        if !options.is_empty() {
            if !options.custom_metadata.is_empty() {
                body["customMetadata"] = serde_json::to_value(&options.custom_metadata)
                    .unwrap_or(serde_json::Value::Null);
            }
            if let Some((max_tokens, overlap)) = options.chunking {
                body["chunkingConfig"] = json!({
                    "whiteSpaceConfig": {
                        "maxTokensPerChunk": max_tokens,
                        "maxOverlapTokens": overlap,
                    }
                });
            }
        }

        let response = self
            .http
            .post(format!("{}:importFile", self.url(store_name)))
            .header("x-goog-api-key", self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(Self::transport("fileSearchStores.importFile"))?;
        let response = Self::check("fileSearchStores.importFile", response).await?;
        response
            .json()
            .await
            .map_err(Self::transport("fileSearchStores.importFile"))
    }

    /// Re-fetch a long-running operation.
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        let response = self
            .http
            .get(self.url(name))
            .header("x-goog-api-key", self.api_key())
            .send()
            .await
            .map_err(Self::transport("operations.get"))?;
        let response = Self::check("operations.get", response).await?;
        response.json().await.map_err(Self::transport("operations.get"))
    }

    /// Poll `operation` until done, with the default cadence (every 3s, up
    /// to 120s). Returns the imported document's resource name when the
    /// operation reports one.
    pub async fn wait_for_import(&self, operation: Operation) -> Result<Option<String>> {
        self.poll_import(operation, IMPORT_POLL_INTERVAL, IMPORT_POLL_CEILING)
            .await
    }

    /// Polling loop with explicit cadence (tests use short durations).
    pub async fn poll_import(
        &self,
        mut operation: Operation,
        interval: Duration,
        ceiling: Duration,
    ) -> Result<Option<String>> {
        let mut waited = Duration::ZERO;
        let mut ticks: u32 = 0;

        while !operation.done {
            if waited >= ceiling {
                error!(operation = %operation.name, waited_secs = waited.as_secs(), "import poll ceiling hit");
                return Err(Error::ImportTimeout(ceiling.as_secs()));
            }
            tokio::time::sleep(interval).await;
            waited += interval;
            ticks += 1;
            operation = self.get_operation(&operation.name).await?;
            if ticks % 5 == 0 {
                debug!(operation = %operation.name, waited_secs = waited.as_secs(), "still waiting for import");
            }
        }

        if let Some(err) = operation.error {
            return Err(Error::ImportFailed(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }
        Ok(operation.response.and_then(|r| r.name))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn client(base: &str) -> GeminiClient {
        GeminiClient::new(Secret::new("test-key".into())).with_base_url(base)
    }

    const FAST: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn create_store_parses_resource_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/fileSearchStores")
            .match_header("x-goog-api-key", "test-key")
            .with_body(r#"{"name": "fileSearchStores/abc", "displayName": "sift-store"}"#)
            .create_async()
            .await;

        let store = client(&server.url()).create_store("sift-store").await.unwrap();
        assert_eq!(store.name, "fileSearchStores/abc");
        assert_eq!(store.display_name.as_deref(), Some("sift-store"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_stores_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/fileSearchStores")
            .with_body(
                r#"{"fileSearchStores": [{"name": "fileSearchStores/a"}], "nextPageToken": "t2"}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/v1beta/fileSearchStores?pageToken=t2")
            .with_body(r#"{"fileSearchStores": [{"name": "fileSearchStores/b"}]}"#)
            .create_async()
            .await;

        let stores = client(&server.url()).list_stores().await.unwrap();
        let names: Vec<&str> = stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["fileSearchStores/a", "fileSearchStores/b"]);
    }

    #[tokio::test]
    async fn import_body_includes_metadata_and_chunking() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/fileSearchStores/abc:importFile")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "fileName": "files/xyz",
                "customMetadata": [
                    {"key": "author", "stringValue": "ada"},
                    {"key": "year", "numericValue": 2024.0}
                ],
                "chunkingConfig": {
                    "whiteSpaceConfig": {"maxTokensPerChunk": 150, "maxOverlapTokens": 10}
                }
            })))
            .with_body(r#"{"name": "operations/op1", "done": false}"#)
            .create_async()
            .await;

        let options = ImportOptions {
            custom_metadata: vec![
                CustomMetadataEntry::text("author", "ada"),
                CustomMetadataEntry::number("year", 2024.0),
            ],
            chunking: Some((150, 10)),
        };
        let op = client(&server.url())
            .import_file("fileSearchStores/abc", "files/xyz", &options)
            .await
            .unwrap();
        assert_eq!(op.name, "operations/op1");
        assert!(!op.done);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn poll_import_resolves_document_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/operations/op1")
            .with_body(
                r#"{"name": "operations/op1", "done": true,
                    "response": {"name": "fileSearchStores/abc/documents/d1"}}"#,
            )
            .create_async()
            .await;

        let pending = Operation {
            name: "operations/op1".into(),
            done: false,
            response: None,
            error: None,
        };
        let doc = client(&server.url())
            .poll_import(pending, FAST, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(doc.as_deref(), Some("fileSearchStores/abc/documents/d1"));
    }

    #[tokio::test]
    async fn poll_import_times_out_distinctly() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/operations/slow")
            .with_body(r#"{"name": "operations/slow", "done": false}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let pending = Operation {
            name: "operations/slow".into(),
            done: false,
            response: None,
            error: None,
        };
        let err = client(&server.url())
            .poll_import(pending, FAST, Duration::from_millis(25))
            .await
            .unwrap_err();
        assert!(err.is_import_timeout());
    }

    #[tokio::test]
    async fn poll_import_surfaces_operation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/operations/bad")
            .with_body(
                r#"{"name": "operations/bad", "done": true,
                    "error": {"code": 3, "message": "unsupported mime type"}}"#,
            )
            .create_async()
            .await;

        let pending = Operation {
            name: "operations/bad".into(),
            done: false,
            response: None,
            error: None,
        };
        let err = client(&server.url())
            .poll_import(pending, FAST, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImportFailed(msg) if msg.contains("unsupported mime type")));
    }

    #[tokio::test]
    async fn already_done_operation_skips_polling() {
        let server = mockito::Server::new_async().await;
        let done = Operation {
            name: "operations/done".into(),
            done: true,
            response: Some(OperationResponse {
                name: Some("fileSearchStores/abc/documents/d9".into()),
            }),
            error: None,
        };
        // No mocks registered, so any HTTP call would fail the test.
        let doc = client(&server.url())
            .poll_import(done, FAST, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(doc.as_deref(), Some("fileSearchStores/abc/documents/d9"));
    }

    #[tokio::test]
    async fn delete_store_passes_force() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1beta/fileSearchStores/abc?force=true")
            .with_body("{}")
            .create_async()
            .await;

        client(&server.url())
            .delete_store("fileSearchStores/abc", true)
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
