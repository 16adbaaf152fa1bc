//! Category to volume routing.

use crate::config::CategoryConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Categories known to clients of the service.
pub const WELL_KNOWN_CATEGORIES: [&str; 10] = [
    "SUCCESS_RESULT",
    "FAIL_RESULT",
    "SCM_JSON",
    "AGGREGATE",
    "TOOL_CLIENT",
    "BUILD_SCRIPT",
    "SCM_TOOL",
    "P4_TOOL",
    "GATHER",
    "LAST_RESULT",
];

/// Immutable category table that selects a volume root for new assignments.
#[derive(Clone, Debug)]
pub struct VolumeRouter {
    volumes: BTreeMap<String, Vec<PathBuf>>,
    indexed: BTreeSet<String>,
}

impl VolumeRouter {
    /// Build a router from category configuration.
    pub fn new(config: &CategoryConfig) -> crate::Result<Self> {
        config.validate().map_err(crate::Error::Config)?;
        Ok(Self {
            volumes: config.volumes.clone(),
            indexed: config.indexed_download.iter().cloned().collect(),
        })
    }

    /// Candidate roots for a category.
    pub fn roots(&self, category: &str) -> crate::Result<&[PathBuf]> {
        match self.volumes.get(category) {
            Some(roots) if !roots.is_empty() => Ok(roots),
            _ => Err(crate::Error::UnknownCategory(category.to_string())),
        }
    }

    /// Select a root for a category using the current wall clock.
    pub fn resolve_root(&self, category: &str) -> crate::Result<&Path> {
        self.select_root_at(category, now_millis())
    }

    /// Select a root for a category at a given instant (`now_millis mod len`).
    pub fn select_root_at(&self, category: &str, now_millis: u64) -> crate::Result<&Path> {
        let roots = self.roots(category)?;
        let idx = (now_millis % roots.len() as u64) as usize;
        Ok(&roots[idx])
    }

    /// The first configured root, used for static bundles that are not indexed.
    pub fn primary_root(&self, category: &str) -> crate::Result<&Path> {
        Ok(&self.roots(category)?[0])
    }

    /// Whether downloads for this category always go through the location index.
    pub fn is_indexed(&self, category: &str) -> bool {
        self.indexed.contains(category)
    }

    /// Configured category names.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.volumes.keys().map(String::as_str)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
