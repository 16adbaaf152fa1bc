//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Byte transfer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Read/write buffer size in bytes for uploads and downloads.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Marker between a file name and a chunk ordinal in chunk file names.
    #[serde(default = "default_chunk_suffix")]
    pub chunk_suffix: String,
}

fn default_buffer_size() -> usize {
    crate::DEFAULT_BUFFER_SIZE
}

fn default_chunk_suffix() -> String {
    crate::DEFAULT_CHUNK_SUFFIX.to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            chunk_suffix: default_chunk_suffix(),
        }
    }
}

impl TransferConfig {
    /// Validate transfer configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("transfer.buffer_size must be greater than 0".to_string());
        }
        if self.chunk_suffix.is_empty() {
            return Err("transfer.chunk_suffix cannot be empty".to_string());
        }
        if self.chunk_suffix.contains('/') || self.chunk_suffix.contains('\\') {
            return Err(format!(
                "transfer.chunk_suffix '{}' cannot contain a path separator",
                self.chunk_suffix
            ));
        }
        Ok(())
    }
}

/// Category to volume mapping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Candidate volume roots per category name.
    #[serde(default)]
    pub volumes: BTreeMap<String, Vec<PathBuf>>,
    /// Download categories that always resolve through the location index.
    #[serde(default = "default_indexed_download")]
    pub indexed_download: Vec<String>,
}

fn default_indexed_download() -> Vec<String> {
    vec!["LAST_RESULT".to_string(), "GATHER".to_string()]
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            volumes: BTreeMap::new(),
            indexed_download: default_indexed_download(),
        }
    }
}

impl CategoryConfig {
    /// Validate category configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        for (name, roots) in &self.volumes {
            if roots.is_empty() {
                return Err(format!("category '{name}' has no volumes configured"));
            }
        }
        Ok(())
    }

    /// Build a category table where every category maps to the given roots.
    pub fn uniform<I, S>(categories: I, roots: Vec<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            volumes: categories
                .into_iter()
                .map(|c| (c.into(), roots.clone()))
                .collect(),
            indexed_download: default_indexed_download(),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Transfer configuration.
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Category table.
    #[serde(default)]
    pub categories: CategoryConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.transfer.validate()?;
        self.categories.validate()?;
        Ok(())
    }

    /// Create a test configuration rooted in `base`.
    ///
    /// **For testing only.** Every well-known category gets two volumes under
    /// `base/vol-a` and `base/vol-b`; the metadata database lives in `base`.
    pub fn for_testing(base: &std::path::Path) -> Self {
        let roots = vec![base.join("vol-a"), base.join("vol-b")];
        Self {
            server: ServerConfig::default(),
            transfer: TransferConfig::default(),
            categories: CategoryConfig::uniform(crate::volume::WELL_KNOWN_CATEGORIES, roots),
            metadata: MetadataConfig::Sqlite {
                path: base.join("metadata.db"),
            },
        }
    }
}
