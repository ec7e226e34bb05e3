use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;

use super::{
    channel::{EventStream, PushChannel},
    types::{DeliveryPayload, ListenerEvent, RemoteInsertEvent, UnreadCountPayload},
};
use crate::{
    error::NotificationError,
    notification::{InsertOutcome, Notification, NotificationRepository},
};

pub type ListenerSender = mpsc::UnboundedSender<ListenerEvent>;

struct Subscription {
    generation: u64,
    sender: ListenerSender,
    task: JoinHandle<()>,
}

/// Merges push-channel inserts into the store, one subscription per recipient.
#[derive(Clone)]
pub struct EventSourceListener {
    channel: Arc<dyn PushChannel>,
    store: NotificationRepository,
    subscriptions: Arc<DashMap<String, Subscription>>,
    generation: Arc<AtomicU64>,
}

impl EventSourceListener {
    pub fn new(channel: Arc<dyn PushChannel>, store: NotificationRepository) -> Self {
        Self {
            channel,
            store,
            subscriptions: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start listening for a recipient. An existing subscription for the same
    /// recipient is aborted and replaced.
    pub fn subscribe(&self, recipient_id: &str, sender: ListenerSender) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        // Subscribe to the channel before spawning so nothing published from
        // here on is missed.
        let stream = self.channel.subscribe(recipient_id);

        // The task is spawned while the entry is held, so its own `remove_if`
        // can only run once the subscription is registered.
        let previous = match self.subscriptions.entry(recipient_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let task = self.spawn_run(recipient_id, generation, stream, sender.clone());
                Some(occupied.insert(Subscription {
                    generation,
                    sender,
                    task,
                }))
            }
            Entry::Vacant(vacant) => {
                let task = self.spawn_run(recipient_id, generation, stream, sender.clone());
                vacant.insert(Subscription {
                    generation,
                    sender,
                    task,
                });
                None
            }
        };

        match previous {
            Some(previous) => {
                previous.task.abort();
                tracing::info!("Replaced push subscription for {}", recipient_id);
            }
            None => tracing::info!("Subscribed {} to push channel", recipient_id),
        }
    }

    fn spawn_run(
        &self,
        recipient_id: &str,
        generation: u64,
        stream: EventStream,
        sender: ListenerSender,
    ) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(recipient_id.to_string(), generation, stream, sender))
    }

    /// Safe to call any number of times. Returns whether a subscription was removed.
    pub fn unsubscribe(&self, recipient_id: &str) -> bool {
        match self.subscriptions.remove(recipient_id) {
            Some((_, subscription)) => {
                subscription.task.abort();
                tracing::info!("Unsubscribed {} from push channel", recipient_id);
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_all(&self) -> usize {
        let recipients: Vec<String> = self.subscriptions.iter().map(|e| e.key().clone()).collect();
        recipients
            .iter()
            .filter(|recipient| self.unsubscribe(recipient))
            .count()
    }

    pub fn is_subscribed(&self, recipient_id: &str) -> bool {
        self.subscriptions
            .get(recipient_id)
            .map_or(false, |s| !s.task.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| !entry.value().task.is_finished())
            .count()
    }

    /// Sends a fresh unread count to every live subscription and drops the dead
    /// ones. Returns how many sinks were refreshed.
    pub async fn refresh_unread_counts(&self) -> usize {
        self.subscriptions.retain(|recipient, s| {
            let alive = !s.task.is_finished() && !s.sender.is_closed();
            if !alive {
                tracing::debug!("Dropping finished push subscription for {}", recipient);
            }
            alive
        });

        let targets: Vec<(String, ListenerSender)> = self
            .subscriptions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        let mut refreshed = 0;
        for (recipient, sender) in targets {
            let event = match self.store.unread_count(&recipient).await {
                Ok(unread_count) => ListenerEvent::UnreadCount(UnreadCountPayload { unread_count }),
                Err(e) => ListenerEvent::error(&e),
            };
            if sender.send(event).is_ok() {
                refreshed += 1;
            }
        }
        refreshed
    }

    async fn run(self, recipient_id: String, generation: u64, mut stream: EventStream, sender: ListenerSender) {
        loop {
            let event = tokio::select! {
                _ = sender.closed() => break,
                item = stream.next() => match item {
                    Some(Ok(raw)) => self.handle_event(&recipient_id, raw).await,
                    Some(Err(e)) => {
                        tracing::warn!("Push channel error for {}: {}", recipient_id, e);
                        Some(ListenerEvent::error(&e))
                    }
                    None => break,
                },
            };

            if let Some(event) = event {
                if sender.send(event).is_err() {
                    break;
                }
            }
        }

        self.subscriptions
            .remove_if(&recipient_id, |_, s| s.generation == generation);
        tracing::debug!("Push subscription for {} ended", recipient_id);
    }

    async fn handle_event(&self, recipient_id: &str, raw: Value) -> Option<ListenerEvent> {
        let notification = match parse_event(raw) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!("Discarding push event for {}: {}", recipient_id, e);
                return Some(ListenerEvent::error(&e));
            }
        };

        match self.store.insert(notification.clone()).await {
            Ok(InsertOutcome::AlreadyPresent) => {
                tracing::debug!("Push echo of {} already stored", notification.id);
                None
            }
            Ok(InsertOutcome::EvictedOnInsert) => {
                tracing::warn!(
                    "Push event {} is older than every retained notification, not delivered",
                    notification.id
                );
                None
            }
            Ok(InsertOutcome::Inserted { .. }) => match self.store.unread_count(recipient_id).await {
                Ok(unread_count) => Some(ListenerEvent::Delivered(DeliveryPayload {
                    notification,
                    unread_count,
                })),
                Err(e) => Some(ListenerEvent::error(&e)),
            },
            Err(e) => {
                tracing::error!("Failed to store pushed notification {}: {}", notification.id, e);
                Some(ListenerEvent::error(&e))
            }
        }
    }
}

fn parse_event(raw: Value) -> Result<Notification, NotificationError> {
    let event: RemoteInsertEvent = serde_json::from_value(raw)
        .map_err(|e| NotificationError::Subscription(format!("malformed push event: {}", e)))?;
    Notification::try_from(event)
}
