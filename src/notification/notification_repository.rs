use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::notification_models::Notification;
use crate::{error::NotificationError, storage::StorageBackend};

pub const DEFAULT_CAPACITY: usize = 1000;

const STORE_KEY: &str = "notifications";

/// Which entries go first once the store is over capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Oldest entries regardless of read-state.
    #[default]
    OldestFirst,
    /// Oldest read entries, then oldest unread ones if still over capacity.
    ReadFirst,
}

impl std::str::FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "oldest_first" => Ok(EvictionPolicy::OldestFirst),
            "read_first" => Ok(EvictionPolicy::ReadFirst),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { evicted: usize },
    AlreadyPresent,
    /// The new entry was older than everything retained at capacity and was
    /// evicted by its own insert. It is not stored.
    EvictedOnInsert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub duplicates_removed: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCollection {
    next_seq: u64,
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    seq: u64,
    #[serde(flatten)]
    notification: Notification,
}

impl StoredCollection {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.notification.id == id)
    }

    fn for_recipient<'a>(&'a self, recipient_id: &'a str) -> impl Iterator<Item = &'a Notification> {
        self.entries
            .iter()
            .map(|e| &e.notification)
            .filter(move |n| n.recipient_id == recipient_id)
    }
}

/// Newest first; equal timestamps keep the later insertion first.
fn sort_entries(entries: &mut [StoredEntry]) {
    entries.sort_by(|a, b| {
        b.notification
            .created_at
            .cmp(&a.notification.created_at)
            .then(b.seq.cmp(&a.seq))
    });
}

/// The single authoritative local collection of notifications.
///
/// Every mutation is a read-modify-write over one persisted document and is
/// serialized through `write_lock`, which all clones share.
#[derive(Clone)]
pub struct NotificationRepository {
    storage: Arc<dyn StorageBackend>,
    capacity: usize,
    policy: EvictionPolicy,
    write_lock: Arc<Mutex<()>>,
}

impl NotificationRepository {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_limits(storage, DEFAULT_CAPACITY, EvictionPolicy::default())
    }

    pub fn with_limits(
        storage: Arc<dyn StorageBackend>,
        capacity: usize,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            storage,
            capacity,
            policy,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn insert(&self, notification: Notification) -> Result<InsertOutcome, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        if collection.position(&notification.id).is_some() {
            tracing::debug!("Notification {} already stored, skipping insert", notification.id);
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let seq = collection.next_seq;
        collection.next_seq += 1;
        collection.entries.push(StoredEntry { seq, notification });
        sort_entries(&mut collection.entries);

        let evicted = self.evict(&mut collection);
        self.commit(&collection).await?;
        self.log_eviction(&evicted);

        if evicted.iter().any(|e| e.seq == seq) {
            return Ok(InsertOutcome::EvictedOnInsert);
        }

        Ok(InsertOutcome::Inserted {
            evicted: evicted.len(),
        })
    }

    pub async fn query(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut collection = self.load().await?;
        sort_entries(&mut collection.entries);

        Ok(collection
            .for_recipient(recipient_id)
            .filter(|n| !unread_only || !n.read)
            .cloned()
            .collect())
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        let collection = self.load().await?;
        Ok(collection.for_recipient(recipient_id).filter(|n| !n.read).count())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Notification>, NotificationError> {
        let collection = self.load().await?;
        Ok(collection
            .position(id)
            .map(|idx| collection.entries[idx].notification.clone()))
    }

    pub async fn len(&self) -> Result<usize, NotificationError> {
        Ok(self.load().await?.entries.len())
    }

    /// Marks one notification read. Already-read notifications are returned untouched.
    pub async fn mark_read(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        let idx = collection
            .position(id)
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))?;

        if !collection.entries[idx].notification.mark_read(at) {
            return Ok(collection.entries[idx].notification.clone());
        }
        let updated = collection.entries[idx].notification.clone();
        self.commit(&collection).await?;

        self.ensure(
            |c| c.position(id).map_or(false, |i| c.entries[i].notification.read),
            &format!("notification {} still unread", id),
        )
        .await?;

        Ok(updated)
    }

    /// Marks every unread notification of the recipient read; returns how many changed.
    pub async fn mark_all_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        let mut transitioned = 0;
        for entry in collection.entries.iter_mut() {
            if entry.notification.recipient_id == recipient_id && entry.notification.mark_read(at) {
                transitioned += 1;
            }
        }

        if transitioned > 0 {
            self.commit(&collection).await?;
        }

        self.ensure(
            |c| c.for_recipient(recipient_id).all(|n| n.read),
            &format!("unread notifications remain for {}", recipient_id),
        )
        .await?;

        Ok(transitioned)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<Notification, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        let idx = collection
            .position(id)
            .ok_or_else(|| NotificationError::NotFound(id.to_string()))?;
        let removed = collection.entries.remove(idx);
        self.commit(&collection).await?;

        self.ensure(
            |c| c.position(id).is_none(),
            &format!("notification {} still present", id),
        )
        .await?;

        Ok(removed.notification)
    }

    pub async fn delete_all_for_recipient(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        self.delete_for_recipient(recipient_id, false).await
    }

    pub async fn delete_read_for_recipient(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        self.delete_for_recipient(recipient_id, true).await
    }

    async fn delete_for_recipient(
        &self,
        recipient_id: &str,
        only_read: bool,
    ) -> Result<usize, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        let targeted = |n: &Notification| n.recipient_id == recipient_id && (!only_read || n.read);

        let before = collection.entries.len();
        collection.entries.retain(|e| !targeted(&e.notification));
        let removed = before - collection.entries.len();

        if removed > 0 {
            self.commit(&collection).await?;
        }

        self.ensure(
            |c| !c.entries.iter().any(|e| targeted(&e.notification)),
            &format!("targeted notifications remain for {}", recipient_id),
        )
        .await?;

        Ok(removed)
    }

    /// Rewrites the persisted document in canonical form: unique ids, sorted,
    /// within capacity. Nothing is written when it is already canonical.
    pub async fn reconcile(&self) -> Result<ReconcileReport, NotificationError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;

        // Earliest insertion wins for a duplicated id.
        collection.entries.sort_by_key(|e| e.seq);
        let mut seen = HashSet::new();
        let before = collection.entries.len();
        collection
            .entries
            .retain(|e| seen.insert(e.notification.id.clone()));
        let duplicates_removed = before - collection.entries.len();

        sort_entries(&mut collection.entries);
        let evicted = self.evict(&mut collection);

        if let Some(max_seq) = collection.entries.iter().map(|e| e.seq).max() {
            collection.next_seq = collection.next_seq.max(max_seq + 1);
        }

        let canonical = serde_json::to_string(&collection).map_err(encode_error)?;
        let current = self.storage.get(STORE_KEY).await?;
        if current.as_deref() != Some(canonical.as_str()) && (current.is_some() || !collection.entries.is_empty()) {
            self.commit(&collection).await?;
        }
        self.log_eviction(&evicted);

        Ok(ReconcileReport {
            duplicates_removed,
            evicted: evicted.len(),
        })
    }

    async fn load(&self) -> Result<StoredCollection, NotificationError> {
        match self.storage.get(STORE_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                NotificationError::Persistence(format!("failed to decode notification store: {}", e))
            }),
            None => Ok(StoredCollection::default()),
        }
    }

    /// Writes the document and re-reads it. A mismatch gets one rewrite and one
    /// more check before it is reported.
    async fn commit(&self, collection: &StoredCollection) -> Result<(), NotificationError> {
        let serialized = serde_json::to_string(collection).map_err(encode_error)?;

        self.storage.set(STORE_KEY, &serialized).await?;
        if self.read_back_matches(&serialized).await? {
            return Ok(());
        }

        tracing::warn!("Notification store read-back mismatch, rewriting once");
        self.storage.set(STORE_KEY, &serialized).await?;
        if self.read_back_matches(&serialized).await? {
            return Ok(());
        }

        Err(NotificationError::Verification(
            "persisted notification store does not match the written value".to_string(),
        ))
    }

    async fn read_back_matches(&self, expected: &str) -> Result<bool, NotificationError> {
        Ok(self.storage.get(STORE_KEY).await?.as_deref() == Some(expected))
    }

    async fn ensure<F>(&self, check: F, failure: &str) -> Result<(), NotificationError>
    where
        F: Fn(&StoredCollection) -> bool,
    {
        let reloaded = self.load().await?;
        if check(&reloaded) {
            Ok(())
        } else {
            Err(NotificationError::Verification(format!(
                "post-condition failed: {}",
                failure
            )))
        }
    }

    /// Expects `entries` sorted newest first.
    fn evict(&self, collection: &mut StoredCollection) -> Vec<StoredEntry> {
        let len = collection.entries.len();
        if len <= self.capacity {
            return Vec::new();
        }
        let excess = len - self.capacity;

        match self.policy {
            EvictionPolicy::OldestFirst => collection.entries.split_off(self.capacity),
            EvictionPolicy::ReadFirst => {
                let read_victims: HashSet<u64> = collection
                    .entries
                    .iter()
                    .rev()
                    .filter(|e| e.notification.read)
                    .take(excess)
                    .map(|e| e.seq)
                    .collect();

                let (mut evicted, kept): (Vec<_>, Vec<_>) = collection
                    .entries
                    .drain(..)
                    .partition(|e| read_victims.contains(&e.seq));
                collection.entries = kept;

                if collection.entries.len() > self.capacity {
                    evicted.extend(collection.entries.split_off(self.capacity));
                }
                evicted
            }
        }
    }

    fn log_eviction(&self, evicted: &[StoredEntry]) {
        if evicted.is_empty() {
            return;
        }
        let unread = evicted.iter().filter(|e| !e.notification.read).count();
        tracing::warn!(
            "Notification store over capacity ({}), evicted {} entries ({} unread)",
            self.capacity,
            evicted.len(),
            unread
        );
    }
}

fn encode_error(err: serde_json::Error) -> NotificationError {
    NotificationError::Persistence(format!("failed to encode notification store: {}", err))
}
