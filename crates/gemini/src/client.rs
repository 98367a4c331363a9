use {
    reqwest::Response,
    secrecy::{ExposeSecret, Secret},
};

use crate::{Error, Result};

/// Production API base URL.
pub(crate) const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini File Search REST API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    api_key: Secret<String>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE.into(),
            api_key,
        }
    }

    /// Point the client at a different base URL (stub servers in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a `/v1beta/...` URL from a resource name or collection path.
    pub(crate) fn url(&self, resource: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, resource)
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Map a non-success response to [`Error::Api`], keeping the body for
    /// the log line.
    pub(crate) async fn check(endpoint: &'static str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            endpoint,
            status,
            body,
        })
    }

    pub(crate) fn transport(endpoint: &'static str) -> impl FnOnce(reqwest::Error) -> Error {
        move |source| Error::Transport { endpoint, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let client = GeminiClient::new(Secret::new("super-secret".into()));
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client =
            GeminiClient::new(Secret::new("k".into())).with_base_url("http://localhost:9/");
        assert_eq!(client.url("files/abc"), "http://localhost:9/v1beta/files/abc");
    }
}
