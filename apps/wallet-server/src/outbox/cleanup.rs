// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Periodic deletion of published outbox rows.
//!
//! Housekeeping only: unpublished and dead-lettered rows are never touched,
//! and a failed sweep is logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::{OutboxStore, StoreResult};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// How long a published row is kept before deletion
    pub retention: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            retention: DEFAULT_RETENTION,
        }
    }
}

pub struct OutboxSweeper {
    store: Arc<dyn OutboxStore>,
    config: SweeperConfig,
}

impl OutboxSweeper {
    pub fn new(store: Arc<dyn OutboxStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Run the sweeper loop until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            retention_hours = self.config.retention.as_secs() / 3600,
            "Outbox sweeper starting"
        );

        loop {
            // Sleep first: nothing published at boot is old enough to delete
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Outbox sweeper shutting down");
                    return;
                }
            }

            match self.sweep(Utc::now()).await {
                Ok(0) => {}
                Ok(deleted) => info!(deleted, "Outbox sweeper removed published messages"),
                Err(e) => warn!(error = %e, "Outbox sweep failed, will retry"),
            }
        }
    }

    /// Delete rows published before `now - retention`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let retention =
            chrono::Duration::from_std(self.config.retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(retention).unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.store.delete_published_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewOutboxMessage, OutboxRepository, TxManager, WalletDatabase};
    use uuid::Uuid;

    async fn published_row(db: &WalletDatabase, store: &OutboxRepository) -> u64 {
        let tx = db.begin().await.unwrap();
        let row = store
            .create(&tx, NewOutboxMessage::new(Uuid::new_v4(), "wallet.created", vec![]))
            .unwrap();
        tx.commit().unwrap();
        store.mark_as_published(row.id).await.unwrap();
        row.id
    }

    #[tokio::test]
    async fn sweep_respects_retention() {
        let db = Arc::new(WalletDatabase::in_memory().unwrap());
        let store = Arc::new(OutboxRepository::new(db.clone()));
        let id = published_row(&db, &store).await;

        let sweeper = OutboxSweeper::new(store.clone(), SweeperConfig::default());

        // Within the retention window
        assert_eq!(sweeper.sweep(Utc::now()).await.unwrap(), 0);
        assert!(store.get(id).unwrap().is_some());

        // Eight days later
        let later = Utc::now() + chrono::Duration::days(8);
        assert_eq!(sweeper.sweep(later).await.unwrap(), 1);
        assert!(store.get(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_keeps_unpublished_rows() {
        let db = Arc::new(WalletDatabase::in_memory().unwrap());
        let store = Arc::new(OutboxRepository::new(db.clone()));

        let tx = db.begin().await.unwrap();
        let row = store
            .create(&tx, NewOutboxMessage::new(Uuid::new_v4(), "wallet.created", vec![]))
            .unwrap();
        tx.commit().unwrap();

        let sweeper = OutboxSweeper::new(store.clone(), SweeperConfig::default());
        let later = Utc::now() + chrono::Duration::days(30);
        assert_eq!(sweeper.sweep(later).await.unwrap(), 0);
        assert!(store.get(row.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let db = Arc::new(WalletDatabase::in_memory().unwrap());
        let store = Arc::new(OutboxRepository::new(db));
        let sweeper = OutboxSweeper::new(store, SweeperConfig::default());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
