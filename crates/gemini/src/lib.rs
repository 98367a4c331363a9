//! Typed client for the Gemini File Search REST surface.
//!
//! Covers exactly what the gateway orchestrates: the raw Files API
//! (resumable upload, delete), file search stores (create, get, list,
//! delete, import), long-running operation polling, and `generateContent`
//! with the `fileSearch` tool. Everything else the API offers is out of
//! scope here.

mod client;
mod error;
mod files;
mod generate;
mod stores;

pub use {
    client::GeminiClient,
    error::Error,
    files::ApiFile,
    generate::{Citation, GenerateContentResponse},
    stores::{CustomMetadataEntry, FileSearchStore, ImportOptions, Operation},
};

pub type Result<T> = std::result::Result<T, Error>;
