use reqwest::StatusCode;

/// Errors from the Gemini client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The resumable upload handshake did not yield a session URL.
    #[error("upload handshake missing session url")]
    UploadHandshake,

    /// The import operation reported an error payload.
    #[error("import operation failed: {0}")]
    ImportFailed(String),

    /// Polling hit the ceiling; the vendor-side job keeps running.
    #[error("file import did not complete within {0} seconds")]
    ImportTimeout(u64),

    #[error("failed to read {path}: {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True when the failure is the distinct import-poll timeout.
    pub fn is_import_timeout(&self) -> bool {
        matches!(self, Error::ImportTimeout(_))
    }
}
