//! Core domain types and shared logic for the depot artifact store.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Upload and download descriptors
//! - Chunk identity and on-disk chunk naming
//! - Location records and cached file metadata
//! - Content hashing
//! - Category-to-volume configuration and volume selection

pub mod chunk;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hash;
pub mod record;
pub mod volume;

pub use chunk::ChunkId;
pub use descriptor::{ByteRange, DownloadDescriptor, UploadDescriptor};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher, FileNameHash};
pub use record::{CachedFileInfo, FileInfo, LocationRecord};
pub use volume::VolumeRouter;

/// Default streaming buffer size: 40 KiB
pub const DEFAULT_BUFFER_SIZE: usize = 40 * 1024;

/// Default separator between a file name and its chunk ordinal.
pub const DEFAULT_CHUNK_SUFFIX: &str = "_chunk_";

/// Name prefix of in-flight upload temporaries; reserved in logical file names.
pub const TEMP_FILE_PREFIX: &str = ".tmp.";
