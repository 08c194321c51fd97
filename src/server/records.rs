use anyhow::Result;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::store::{read_entries, write_entries};
use crate::words::{WordDraft, WordEntry};

/// The service's JSON word file. Every read-modify-write holds `lock`.
#[derive(Debug)]
pub(crate) struct RecordFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RecordFile {
    /// Opens `path`, creating it as an empty list if it does not exist.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            write_entries(&path, &[])?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn list(&self) -> Result<Vec<WordEntry>> {
        let _guard = self.lock.lock().await;
        read_entries(&self.path)
    }

    /// Appends `draft`, assigning an id and creation time when it has none.
    pub(crate) async fn create(&self, draft: WordDraft) -> Result<WordEntry> {
        let _guard = self.lock.lock().await;
        let mut entries = read_entries(&self.path)?;
        let now = now_millis();
        let requested = draft
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && !entries.iter().any(|entry| entry.id == *id))
            .map(str::to_string);
        let id = requested.unwrap_or_else(|| unique_id(&entries, now));
        let created_at = draft.created_at.unwrap_or(now);
        let entry = draft.into_entry(id, created_at);
        entries.push(entry.clone());
        write_entries(&self.path, &entries)?;
        Ok(entry)
    }

    /// Full replace. Keeps the stored `createdAt` and the addressed id.
    pub(crate) async fn replace(&self, id: &str, entry: WordEntry) -> Result<Option<WordEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = read_entries(&self.path)?;
        let Some(existing) = entries.iter_mut().find(|existing| existing.id == id) else {
            return Ok(None);
        };
        *existing = WordEntry {
            id: id.to_string(),
            created_at: existing.created_at,
            ..entry
        };
        let updated = existing.clone();
        write_entries(&self.path, &entries)?;
        Ok(Some(updated))
    }

    /// Returns whether a card was removed.
    pub(crate) async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = read_entries(&self.path)?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        write_entries(&self.path, &entries)?;
        Ok(true)
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn unique_id(entries: &[WordEntry], now: i64) -> String {
    let mut candidate = now;
    while entries.iter().any(|entry| entry.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
