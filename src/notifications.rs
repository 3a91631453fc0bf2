use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::ApiError;
use crate::rest_types::Notification;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const RECENT_LIMIT: u32 = 20;

pub trait NotificationSource {
    fn unread_count(&self) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn recent(&self, limit: u32) -> impl Future<Output = Result<Vec<Notification>, ApiError>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub unread: u64,
    pub recent: Vec<Notification>,
    /// Number of completed polls, failed ones included.
    pub polls: u64,
}

pub fn badge(unread: u64) -> String {
    if unread > 99 {
        "99+".to_string()
    } else {
        unread.to_string()
    }
}

/// Background task refreshing the inbox on a fixed period. Stopping or dropping the
/// handle ends the task.
pub struct NotificationPoller {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    pub fn spawn<S>(source: Arc<S>, period: Duration) -> (Self, watch::Receiver<NotificationSnapshot>)
    where
        S: NotificationSource + Send + Sync + 'static,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(NotificationSnapshot::default());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        poll_once(source.as_ref(), &snapshot_tx).await;
                    }
                }
            }
            tracing::debug!("notification poller stopped");
        });

        (
            Self {
                shutdown: shutdown_tx,
                task: Some(task),
            },
            snapshot_rx,
        )
    }

    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn poll_once<S: NotificationSource>(source: &S, snapshot: &watch::Sender<NotificationSnapshot>) {
    let unread = source.unread_count().await;
    let recent = source.recent(RECENT_LIMIT).await;

    snapshot.send_modify(|current| {
        current.polls += 1;
        match unread {
            Ok(count) => current.unread = count,
            Err(e) => tracing::warn!(error = %e, "failed to fetch unread notification count"),
        }
        match recent {
            Ok(items) => current.recent = items,
            Err(e) => tracing::warn!(error = %e, "failed to fetch notifications"),
        }
    });
}
