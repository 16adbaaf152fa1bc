//! Upload and download request descriptors.

use crate::chunk::ChunkId;
use serde::{Deserialize, Serialize};

/// Reject file names that could escape their assigned directory or collide
/// with upload temporaries.
pub fn validate_file_name(file_name: &str) -> crate::Result<()> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.starts_with(crate::TEMP_FILE_PREFIX)
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains('\0')
    {
        return Err(crate::Error::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

/// Parameters of an upload (whole file or a single chunk).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadDescriptor {
    /// Upload category selecting the candidate volumes.
    pub category: String,
    /// Logical file name.
    pub file_name: String,
    /// Declared number of chunks; absent or <= 0 means a whole-file upload.
    #[serde(default)]
    pub total_chunks: Option<i32>,
    /// Ordinal of this chunk (defaults to 0 for chunked uploads).
    #[serde(default)]
    pub ordinal: Option<u32>,
}

impl UploadDescriptor {
    /// Descriptor for a whole-file upload.
    pub fn whole(category: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            file_name: file_name.into(),
            total_chunks: None,
            ordinal: None,
        }
    }

    /// Descriptor for one chunk of a chunked upload.
    pub fn chunk(
        category: impl Into<String>,
        file_name: impl Into<String>,
        total_chunks: i32,
        ordinal: u32,
    ) -> Self {
        Self {
            category: category.into(),
            file_name: file_name.into(),
            total_chunks: Some(total_chunks),
            ordinal: Some(ordinal),
        }
    }

    /// Chunk identity if this is a chunked upload, `None` for a whole file.
    pub fn chunk_id(&self) -> Option<ChunkId> {
        match self.total_chunks {
            Some(total) if total > 0 => Some(ChunkId::new(
                self.file_name.clone(),
                self.ordinal.unwrap_or(0),
            )),
            _ => None,
        }
    }
}

/// A byte window within a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// Offset of the first byte.
    pub start: u64,
    /// Number of bytes; `None` reads to the end of the file.
    pub length: Option<u64>,
}

impl ByteRange {
    /// Build a range from optional request parameters.
    pub fn from_parts(start: Option<u64>, length: Option<u64>) -> Option<Self> {
        match (start, length) {
            (None, None) => None,
            (start, length) => Some(Self {
                start: start.unwrap_or(0),
                length,
            }),
        }
    }
}

/// Parameters of a download, size or info query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    /// Download category.
    pub category: String,
    /// Logical file name.
    pub file_name: String,
    /// Optional byte window.
    #[serde(default)]
    pub range: Option<ByteRange>,
}

impl DownloadDescriptor {
    /// Descriptor for a whole-file download.
    pub fn new(category: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            file_name: file_name.into(),
            range: None,
        }
    }

    /// Restrict the download to a byte window.
    pub fn with_range(mut self, start: u64, length: u64) -> Self {
        self.range = Some(ByteRange {
            start,
            length: Some(length),
        });
        self
    }
}
