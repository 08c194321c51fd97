use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::StoreError;
use crate::words::WordEntry;

/// Reads a JSON array of cards. A missing file is an empty list.
pub(crate) fn read_entries(path: &Path) -> Result<Vec<WordEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read word file: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<WordEntry> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse word file JSON: {}", path.display()))?;
    Ok(entries)
}

pub(crate) fn write_entries(path: &Path, entries: &[WordEntry]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
    }
    let content = serde_json::to_string_pretty(entries)?;
    fs::write(path, content)
        .with_context(|| format!("failed to write word file: {}", path.display()))?;
    Ok(())
}

/// Local copy of the last known card list, used while the service is down.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<WordEntry>, StoreError> {
        read_entries(&self.path).map_err(|err| StoreError::Cache(format!("{:#}", err)))
    }

    pub fn save(&self, entries: &[WordEntry]) -> Result<(), StoreError> {
        write_entries(&self.path, entries).map_err(|err| StoreError::Cache(format!("{:#}", err)))
    }

    /// Replaces the card with the same id, or appends it.
    pub fn upsert(&self, entry: &WordEntry) -> Result<(), StoreError> {
        let mut entries = self.load_or_reset();
        match entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        self.save(&entries)
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.load_or_reset();
        entries.retain(|entry| entry.id != id);
        self.save(&entries)
    }

    fn load_or_reset(&self) -> Vec<WordEntry> {
        self.load().unwrap_or_else(|err| {
            warn!("discarding unreadable cache: {}", err);
            Vec::new()
        })
    }
}
