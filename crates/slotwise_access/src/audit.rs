//! Fire-and-forget audit logging
//!
//! Entries go through a bounded channel to a single background writer. A
//! full queue drops the entry; a failed insert is logged. Neither ever
//! reaches the request that produced the entry.

use slotwise_common::models::ActivityLogEntry;
use slotwise_db::Datastore;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: mpsc::Sender<ActivityLogEntry>,
}

impl AuditLogger {
    /// Starts the writer task on the current runtime.
    pub fn spawn(store: Arc<dyn Datastore>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ActivityLogEntry>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = store.insert_activity(&entry).await {
                    warn!(
                        tenant_id = %entry.tenant_id,
                        action = %entry.action,
                        "Failed to write audit entry: {}",
                        e
                    );
                }
            }
            debug!("Audit writer stopped");
        });
        (Self { tx }, handle)
    }

    /// Queues `entry`. Returns `false` when it was dropped.
    pub fn log(&self, entry: ActivityLogEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(TrySendError::Full(entry)) => {
                warn!(
                    tenant_id = %entry.tenant_id,
                    action = %entry.action,
                    "Audit queue full, dropping entry"
                );
                false
            }
            Err(TrySendError::Closed(entry)) => {
                warn!(action = %entry.action, "Audit writer gone, dropping entry");
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<ActivityLogEntry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_db::MemoryDatastore;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (logger, mut rx) = AuditLogger::detached(1);
        let tenant = Uuid::new_v4();
        assert!(logger.log(ActivityLogEntry::new(tenant, None, "first")));
        assert!(!logger.log(ActivityLogEntry::new(tenant, None, "second")));
        assert_eq!(rx.recv().await.map(|e| e.action), Some("first".to_string()));
    }

    #[tokio::test]
    async fn writer_persists_entries_in_order() {
        let store = Arc::new(MemoryDatastore::new());
        let (logger, handle) = AuditLogger::spawn(store.clone(), 8);
        let tenant = Uuid::new_v4();

        assert!(logger.log(ActivityLogEntry::new(tenant, None, "one")));
        assert!(logger.log(ActivityLogEntry::new(tenant, None, "two")));

        drop(logger);
        handle.await.unwrap();
        let actions: Vec<_> = store
            .list_activity(tenant)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let store = Arc::new(MemoryDatastore::new());
        store.fail_writes(true);
        let (logger, handle) = AuditLogger::spawn(store.clone(), 8);
        let tenant = Uuid::new_v4();

        assert!(logger.log(ActivityLogEntry::new(tenant, None, "lost")));
        drop(logger);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("writer should stop once senders are gone")
            .unwrap();
        assert!(store.list_activity(tenant).await.unwrap().is_empty());
    }
}
