//! Content and file-name hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 content hash represented as 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute SHA-256 hash of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create an incremental hasher for streamed content.
    pub fn hasher() -> ContentHasher {
        ContentHasher(Sha256::new())
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 64 {
            return Err(crate::Error::InvalidHash(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str = std::str::from_utf8(chunk)
                .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
            bytes[i] = u8::from_str_radix(hex_str, 16)
                .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental SHA-256 hasher.
pub struct ContentHasher(Sha256);

impl ContentHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> ContentHash {
        ContentHash(self.0.finalize().into())
    }
}

/// Stable hash of a logical file name.
///
/// Used for three things that must agree for a given file name: the two-level
/// shard directory (`xx/yy`) under a volume root, the name of the temporary
/// chunk directory, and the key of the per-file merge lock.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FileNameHash(String);

impl FileNameHash {
    /// Hash a logical file name.
    pub fn of(file_name: &str) -> Self {
        Self(ContentHash::compute(file_name.as_bytes()).to_hex())
    }

    /// Full lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first and second shard directory names (2 hex chars each).
    pub fn shard_dirs(&self) -> (&str, &str) {
        (&self.0[..2], &self.0[2..4])
    }
}

impl fmt::Debug for FileNameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileNameHash({})", &self.0[..16])
    }
}

impl fmt::Display for FileNameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let hash = ContentHash::compute(b"hello world");
        let parsed = ContentHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_from_hex_rejects_malformed_input() {
        assert!(matches!(
            ContentHash::from_hex("abc"),
            Err(crate::Error::InvalidHash(_))
        ));
        let not_hex = "zz".repeat(32);
        assert!(matches!(
            ContentHash::from_hex(&not_hex),
            Err(crate::Error::InvalidHash(_))
        ));
    }

    #[test]
    fn test_incremental_hash_matches_one_shot() {
        let mut hasher = ContentHash::hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), ContentHash::compute(b"hello world"));
    }

    #[test]
    fn test_file_name_hash_is_stable() {
        let a = FileNameHash::of("report.json");
        let b = FileNameHash::of("report.json");
        assert_eq!(a, b);
        assert_ne!(a, FileNameHash::of("report.json.1"));

        let (first, second) = a.shard_dirs();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert!(a.as_str().starts_with(&format!("{first}{second}")));
    }
}
