//! On-disk mirror of the active file search store and its registered files.
//!
//! The registry is the crash-recovery record: it is reloaded at process
//! start and rewritten after every mutating call, so a restart can pick up
//! the store handle and file list without re-uploading anything.

mod registry;

pub use registry::{ChunkingOptions, FileRecord, MetadataValue, StoreRegistry};
