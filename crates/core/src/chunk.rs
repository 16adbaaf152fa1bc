//! Chunk identity and on-disk chunk naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ordered fragment of a logical file.
///
/// On disk a chunk is stored as `<file_name><suffix><ordinal>`. The ordinal is
/// carried explicitly through upload and merge; parsing it back from an entry
/// name is only needed when enumerating a chunk directory.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    /// Logical file the chunk belongs to.
    pub file_name: String,
    /// Position of the chunk (0-indexed).
    pub ordinal: u32,
}

impl ChunkId {
    /// Create a new chunk identifier.
    pub fn new(file_name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            file_name: file_name.into(),
            ordinal,
        }
    }

    /// File name of this chunk inside its chunk directory.
    pub fn entry_name(&self, suffix: &str) -> String {
        format!("{}{}{}", self.file_name, suffix, self.ordinal)
    }

    /// Parse a chunk directory entry name back into a chunk identifier.
    ///
    /// An empty tail after the `<file_name><suffix>` prefix is ordinal 0.
    pub fn parse_entry(file_name: &str, suffix: &str, entry_name: &str) -> crate::Result<Self> {
        let tail = entry_name
            .strip_prefix(file_name)
            .and_then(|rest| rest.strip_prefix(suffix))
            .ok_or_else(|| crate::Error::InvalidChunkName(entry_name.to_string()))?;

        let ordinal = if tail.is_empty() {
            0
        } else {
            tail.parse::<u32>()
                .map_err(|_| crate::Error::InvalidChunkName(entry_name.to_string()))?
        };

        Ok(Self::new(file_name, ordinal))
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({}#{})", self.file_name, self.ordinal)
    }
}
