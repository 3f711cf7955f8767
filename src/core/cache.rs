//! Shared translation cache and its persistence boundary

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::errors::Result;

/// Durable mapping from canonical source text to its translated template,
/// shared across every concurrent batch in a run. Once a key is present,
/// tasks for that text resolve without another network call.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache from a previously persisted mapping
    pub fn with_entries(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn get(&self, original: &str) -> Option<String> {
        self.entries.read().await.get(original).cloned()
    }

    pub async fn insert(&self, original: String, translated: String) {
        self.entries.write().await.insert(original, translated);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Copy of the full mapping, for persistence
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }
}

/// External key-value store the cache is loaded from at submission start
/// and handed back to at submission end. Format and location belong to the
/// store, not the orchestrator.
pub trait CacheStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, String>>;
    fn save(&self, entries: &HashMap<String, String>) -> Result<()>;
}

/// Pretty-printed JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            debug!("no cache file at {}, starting empty", self.path.display());
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            warn!("cache file {} is empty, starting fresh", self.path.display());
            return Ok(HashMap::new());
        }

        let entries: HashMap<String, String> = serde_json::from_str(&content)?;
        info!(
            "loaded {} cached translations from {}",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        debug!(
            "persisted {} cache entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
