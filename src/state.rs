use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{
    notification::{
        notification_repository::{EvictionPolicy, DEFAULT_CAPACITY},
        NotificationRepository, NotificationService, ReadStateService,
    },
    push::PushDispatcher,
    realtime::{BroadcastPushChannel, EventSourceListener},
    storage::StorageBackend,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: NotificationRepository,
    pub notification_service: NotificationService,
    pub read_state_service: ReadStateService,
    pub push_channel: BroadcastPushChannel,
    pub listener: EventSourceListener,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn StorageBackend>,
        push: Arc<dyn PushDispatcher>,
    ) -> Self {
        let store = NotificationRepository::with_limits(
            storage,
            config.store_capacity,
            config.eviction_policy,
        );
        let push_channel = BroadcastPushChannel::new(config.event_channel_capacity);
        let listener = EventSourceListener::new(Arc::new(push_channel.clone()), store.clone());

        Self {
            notification_service: NotificationService::new(store.clone(), push),
            read_state_service: ReadStateService::new(store.clone()),
            config,
            store,
            push_channel,
            listener,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub store_capacity: usize,
    pub eviction_policy: EvictionPolicy,
    pub push_gateway_url: Option<String>,
    pub event_channel_capacity: usize,
    pub reconcile_schedule: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let store_capacity = match optional("STORE_CAPACITY") {
            Some(raw) => raw
                .parse::<usize>()
                .context("STORE_CAPACITY must be a number")?,
            None => DEFAULT_CAPACITY,
        };
        anyhow::ensure!(store_capacity > 0, "STORE_CAPACITY must be positive");

        let eviction_policy = match optional("EVICTION_POLICY") {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => EvictionPolicy::default(),
        };

        let event_channel_capacity = match optional("EVENT_CHANNEL_CAPACITY") {
            Some(raw) => raw
                .parse::<usize>()
                .context("EVENT_CHANNEL_CAPACITY must be a number")?,
            None => 100,
        };
        anyhow::ensure!(event_channel_capacity > 0, "EVENT_CHANNEL_CAPACITY must be positive");

        Ok(Self {
            jwt_secret: optional("JWT_SECRET").context("JWT_SECRET must be set")?,
            database_url: optional("DATABASE_URL"),
            store_capacity,
            eviction_policy,
            push_gateway_url: optional("PUSH_GATEWAY_URL"),
            event_channel_capacity,
            reconcile_schedule: optional("RECONCILE_SCHEDULE")
                .unwrap_or_else(|| "0 */15 * * * *".to_string()),
            host: optional("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: match optional("PORT") {
                Some(raw) => raw.parse().context("PORT must be a number")?,
                None => 3000,
            },
        })
    }
}
