use std::{collections::BTreeMap, fs, path::PathBuf};

use {
    anyhow::Result,
    serde::{Deserialize, Serialize},
};

/// A user-supplied metadata value attached to an uploaded file.
///
/// Numbers and strings are distinguished because the vendor import call
/// takes them as separate fields (`numericValue` vs `stringValue`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

/// Whitespace chunking hints forwarded to the vendor import call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    pub max_tokens_per_chunk: u32,
    pub max_overlap_tokens: u32,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: 200,
            max_overlap_tokens: 20,
        }
    }
}

/// One registered file: what was uploaded, when, and under which vendor ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub size: u64,
    /// Local wall-clock time of the upload, `YYYY-MM-DD HH:MM:SS`.
    pub uploaded_at: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_metadata: BTreeMap<String, MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingOptions>,
    /// Raw Files API resource name (`files/...`).
    pub file_api_name: String,
    /// Document resource name inside the store, when the import reported one.
    #[serde(default)]
    pub document_id: Option<String>,
}

impl FileRecord {
    /// Current local time formatted the way records store it.
    pub fn timestamp_now() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Serialized shape of the sidecar file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    store_name: Option<String>,
    #[serde(default)]
    uploaded_files: Vec<FileRecord>,
}

/// JSON file-backed mirror of the active store handle and file records.
///
/// Invariant: the handle and the record list are written together in a
/// single file, so they cannot drift apart across a crash.
pub struct StoreRegistry {
    path: PathBuf,
    store_name: Option<String>,
    files: Vec<FileRecord>,
}

impl StoreRegistry {
    /// Load the registry from disk, or start empty if the file is missing
    /// or unreadable.
    pub fn load(path: PathBuf) -> Self {
        let state = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt state file, starting empty");
                    PersistedState::default()
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable state file, starting empty");
                    PersistedState::default()
                },
            }
        } else {
            PersistedState::default()
        };
        Self {
            path,
            store_name: state.store_name,
            files: state.uploaded_files,
        }
    }

    /// Persist the current handle and records to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let state = PersistedState {
            store_name: self.store_name.clone(),
            uploaded_files: self.files.clone(),
        };
        let data = serde_json::to_string_pretty(&state)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    pub fn set_store_name(&mut self, name: Option<String>) {
        self.store_name = name;
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Append a record, preserving insertion order.
    pub fn push(&mut self, record: FileRecord) {
        self.files.push(record);
    }

    /// Remove the record at `index`, if in bounds. The order of the
    /// remaining records is unchanged.
    pub fn remove(&mut self, index: usize) -> Option<FileRecord> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    /// Drop the store handle and every record (used when the store is
    /// deleted, or found stale at startup).
    pub fn reset(&mut self) {
        self.store_name = None;
        self.files.clear();
    }

    /// Distinct metadata keys across all records, sorted.
    pub fn metadata_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .files
            .iter()
            .flat_map(|f| f.custom_metadata.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
