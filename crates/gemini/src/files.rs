//! Raw Files API: resumable upload and delete.

use std::path::Path;

use {
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::debug,
};

use crate::{Error, GeminiClient, Result};

/// A file registered with the raw Files API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFile {
    /// Resource name, `files/...`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: ApiFile,
}

impl GeminiClient {
    /// Upload a local file via the resumable upload protocol.
    ///
    /// Two requests: a `start` handshake carrying the metadata, which
    /// returns the session URL in `x-goog-upload-url`, then the bytes with
    /// `upload, finalize`.
    pub async fn upload_file(&self, path: &Path, display_name: &str) -> Result<ApiFile> {
        let bytes = tokio::fs::read(path).await.map_err(|source| Error::LocalIo {
            path: path.display().to_string(),
            source,
        })?;

        let start_url = format!("{}/upload/v1beta/files", self.base_url);
        let start = self
            .http
            .post(&start_url)
            .header("x-goog-api-key", self.api_key())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", "application/octet-stream")
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(Self::transport("files.upload.start"))?;
        let start = Self::check("files.upload.start", start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(Error::UploadHandshake)?;

        let finalize = self
            .http
            .post(&session_url)
            .header("x-goog-api-key", self.api_key())
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", 0)
            .body(bytes)
            .send()
            .await
            .map_err(Self::transport("files.upload.finalize"))?;
        let finalize = Self::check("files.upload.finalize", finalize).await?;

        let uploaded: UploadResponse = finalize
            .json()
            .await
            .map_err(Self::transport("files.upload.finalize"))?;
        debug!(name = %uploaded.file.name, display_name, "raw file uploaded");
        Ok(uploaded.file)
    }

    /// Delete a raw file by resource name (`files/...`).
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(name))
            .header("x-goog-api-key", self.api_key())
            .send()
            .await
            .map_err(Self::transport("files.delete"))?;
        Self::check("files.delete", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {secrecy::Secret, std::io::Write};

    use super::*;

    fn client(base: &str) -> GeminiClient {
        GeminiClient::new(Secret::new("test-key".into())).with_base_url(base)
    }

    #[tokio::test]
    async fn resumable_upload_two_phase() {
        let mut server = mockito::Server::new_async().await;
        let session = server
            .mock("POST", "/upload/session")
            .match_header("x-goog-upload-command", "upload, finalize")
            .with_body(r#"{"file": {"name": "files/xyz", "displayName": "notes.txt"}}"#)
            .create_async()
            .await;
        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-upload-protocol", "resumable")
            .with_header("x-goog-upload-url", &format!("{}/upload/session", server.url()))
            .with_body("{}")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello file search").unwrap();

        let file = client(&server.url())
            .upload_file(&path, "notes.txt")
            .await
            .unwrap();
        assert_eq!(file.name, "files/xyz");
        start.assert_async().await;
        session.assert_async().await;
    }

    #[tokio::test]
    async fn missing_session_url_is_handshake_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/v1beta/files")
            .with_body("{}")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "x").unwrap();

        let err = client(&server.url())
            .upload_file(&path, "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UploadHandshake));
    }

    #[tokio::test]
    async fn delete_file_hits_resource_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1beta/files/xyz")
            .with_body("{}")
            .create_async()
            .await;

        client(&server.url()).delete_file("files/xyz").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v1beta/files/gone")
            .with_status(404)
            .with_body(r#"{"error": {"message": "not found"}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).delete_file("files/gone").await.unwrap_err();
        match err {
            Error::Api { status, body, .. } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
