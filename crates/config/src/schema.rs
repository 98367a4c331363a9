//! Config schema types (server, gemini, uploads, state).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File extensions accepted by the upload endpoint.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "doc", "docx", "json", "md", "py", "js", "html", "css", "xml", "csv",
];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub uploads: UploadsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5001,
        }
    }
}

/// Gemini File Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Override the API key (the GEMINI_API_KEY env var takes precedence).
    pub api_key: Option<String>,

    /// Override the API base URL (used by tests to point at a stub server).
    pub base_url: Option<String>,

    /// Generation model ID.
    pub model: String,

    /// Display name given to the file search store on first creation.
    pub store_display_name: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gemini-2.5-flash".into(),
            store_display_name: "sift-store".into(),
        }
    }
}

/// Upload handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Directory where incoming files are staged before the vendor upload.
    pub dir: PathBuf,

    /// Maximum accepted request body size in bytes.
    pub max_bytes: usize,

    /// Accepted file extensions (lowercase, no dot).
    pub allowed_extensions: Vec<String>,

    /// Path of the JSON sidecar mirroring the store handle and file records.
    pub state_file: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_bytes: 100 * 1024 * 1024,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            state_file: PathBuf::from("store_state.json"),
        }
    }
}

impl UploadsConfig {
    /// Check a filename's extension against the allow-list.
    pub fn is_allowed(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extensions_allowed() {
        let uploads = UploadsConfig::default();
        assert!(uploads.is_allowed("notes.md"));
        assert!(uploads.is_allowed("REPORT.PDF"));
        assert!(!uploads.is_allowed("payload.exe"));
        assert!(!uploads.is_allowed("no_extension"));
    }

    #[test]
    fn config_roundtrips_toml() {
        let config = SiftConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: SiftConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.server.port, 5001);
        assert_eq!(parsed.gemini.model, "gemini-2.5-flash");
    }
}
