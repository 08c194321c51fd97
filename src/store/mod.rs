use futures_util::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::words::{WordDraft, WordEntry, filter_by_category};

mod cache;
mod remote;

pub(crate) use cache::{read_entries, write_entries};
pub use cache::LocalCache;
pub use remote::HttpRecordService;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("word not found: {0}")]
    NotFound(String),
    #[error("record service unreachable: {0}")]
    Transport(String),
    #[error("record service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("local cache error: {0}")]
    Cache(String),
}

pub type RecordFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Remote persistence for cards.
pub trait RecordService: Send + Sync {
    fn list(&self) -> RecordFuture<'_, Vec<WordEntry>>;
    fn create<'a>(&'a self, draft: &'a WordDraft) -> RecordFuture<'a, WordEntry>;
    fn update<'a>(&'a self, id: &'a str, entry: &'a WordEntry) -> RecordFuture<'a, WordEntry>;
    fn delete<'a>(&'a self, id: &'a str) -> RecordFuture<'a, ()>;
}

/// Change notification sent to subscribers after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(WordEntry),
    Updated(WordEntry),
    Deleted(String),
}

/// Card persistence: the record service first, the local cache when it is down.
pub struct WordStore {
    service: Arc<dyn RecordService>,
    cache: LocalCache,
    events: broadcast::Sender<StoreEvent>,
}

impl WordStore {
    pub fn new(service: Arc<dyn RecordService>, cache: LocalCache) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            cache,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// All cards. Never fails: an unreachable service falls back to the cache
    /// and an unreadable cache to an empty list.
    pub async fn list(&self) -> Vec<WordEntry> {
        match self.service.list().await {
            Ok(entries) => {
                if let Err(err) = self.cache.save(&entries) {
                    warn!("failed to refresh cache: {}", err);
                }
                entries
            }
            Err(err) => {
                warn!("listing from cache: {}", err);
                self.cache.load().unwrap_or_else(|err| {
                    warn!("{}", err);
                    Vec::new()
                })
            }
        }
    }

    pub async fn list_by_category(&self, category: &str) -> Vec<WordEntry> {
        let entries = self.list().await;
        filter_by_category(&entries, category)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn create(&self, draft: &WordDraft) -> Result<WordEntry, StoreError> {
        let created = self.service.create(draft).await?;
        self.remember(&created);
        self.publish(StoreEvent::Created(created.clone()));
        Ok(created)
    }

    /// Full replace of the card stored under `id`.
    pub async fn update(&self, id: &str, entry: &WordEntry) -> Result<WordEntry, StoreError> {
        let updated = self.service.update(id, entry).await?;
        self.remember(&updated);
        self.publish(StoreEvent::Updated(updated.clone()));
        Ok(updated)
    }

    /// Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.service.delete(id).await?;
        if let Err(err) = self.cache.remove(id) {
            warn!("failed to update cache: {}", err);
        }
        self.publish(StoreEvent::Deleted(id.to_string()));
        Ok(())
    }

    fn remember(&self, entry: &WordEntry) {
        if let Err(err) = self.cache.upsert(entry) {
            warn!("failed to update cache: {}", err);
        }
    }

    fn publish(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            debug!("no store subscribers");
        }
    }
}
