use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use super::notification_repository::NotificationRepository;
use crate::realtime::EventSourceListener;

/// Starts the periodic reconciliation job. Push-driven updates stay the
/// primary path; this only repairs the persisted document and refreshes
/// the unread counts of live subscriptions.
pub async fn start_reconcile_job(
    store: NotificationRepository,
    listener: EventSourceListener,
    schedule: &str,
) -> Result<JobScheduler, Box<dyn std::error::Error>> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let store = store.clone();
        let listener = listener.clone();

        Box::pin(async move {
            run_reconcile(&store, &listener).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Reconcile job scheduled with '{}'", schedule);
    Ok(scheduler)
}

pub async fn run_reconcile(store: &NotificationRepository, listener: &EventSourceListener) {
    match store.reconcile().await {
        Ok(report) if report.duplicates_removed > 0 || report.evicted > 0 => info!(
            "Reconciled store: {} duplicates removed, {} evicted",
            report.duplicates_removed, report.evicted
        ),
        Ok(_) => {}
        Err(e) => error!("Error reconciling notifications: {:?}", e),
    }

    let refreshed = listener.refresh_unread_counts().await;
    tracing::debug!("Refreshed unread count for {} subscriptions", refreshed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notification::notification_repository::tests::notification_at,
        realtime::{BroadcastPushChannel, ListenerEvent},
        storage::MemoryStorage,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_reconcile_refreshes_live_subscriptions() {
        let store = NotificationRepository::new(Arc::new(MemoryStorage::new()));
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        store.insert(notification_at("n-1", "alice", t)).await.unwrap();
        store.insert(notification_at("n-2", "alice", t)).await.unwrap();

        let listener = EventSourceListener::new(Arc::new(BroadcastPushChannel::new(8)), store.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        listener.subscribe("alice", tx);

        run_reconcile(&store, &listener).await;

        match rx.recv().await.unwrap() {
            ListenerEvent::UnreadCount(payload) => assert_eq!(payload.unread_count, 2),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(store.len().await.unwrap(), 2);
    }
}
