// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactional outbox.
//!
//! An outbox row is written in the same [`Transaction`] as the business row it
//! describes and is relayed to the broker later by
//! [`OutboxRelay`](crate::outbox::OutboxRelay).
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──publish ok──▶ published ──(retention elapsed)──▶ deleted by sweeper
//!    │
//!    └──retries reach max_retries──▶ dead-lettered (kept in place)
//! ```
//!
//! Every state has its own index keyed by `(timestamp micros, id)`, so the
//! relay reads only the head of `outbox_pending` and the sweeper only the
//! expired prefix of `outbox_published`. Dead-lettered rows move to
//! `outbox_dead_letters` and stay in `outbox_messages` untouched for operator
//! inspection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::database::{
    OutboxIndexKey, StoreError, StoreResult, WalletDatabase, OUTBOX_DEAD_LETTERS,
    OUTBOX_MESSAGES, OUTBOX_PENDING, OUTBOX_PUBLISHED, OUTBOX_SEQUENCE, SEQUENCES,
};
use crate::storage::Transaction;

/// Retry budget given to new outbox rows unless overridden.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Outbox row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Monotonically increasing surrogate key, also the delivery tie-breaker
    pub id: u64,
    pub aggregate_id: Uuid,
    /// Routing key on the broker, e.g. `wallet.created`
    pub event_type: String,
    /// Serialized snapshot of the aggregate at mutation time
    pub payload: Vec<u8>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub retries: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// True once the retry budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }

    /// True while the relay should still attempt delivery.
    pub fn is_pending(&self) -> bool {
        !self.published && !self.is_exhausted()
    }
}

/// Outbox row to be enqueued.
#[derive(Debug, Clone)]
pub struct NewOutboxMessage {
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub max_retries: u32,
}

impl NewOutboxMessage {
    pub fn new(aggregate_id: Uuid, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            aggregate_id,
            event_type: event_type.into(),
            payload,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Storage contract for the outbox.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Enqueue a message inside the caller's transaction.
    fn create(&self, tx: &Transaction, message: NewOutboxMessage) -> StoreResult<OutboxMessage>;

    /// Up to `limit` unpublished rows with retries left, oldest first
    /// (`created_at`, then `id`). Reads a snapshot; takes no write lock.
    fn get_pending_messages(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>>;

    /// Set `published` and `published_at`. Re-marking a published row is a no-op.
    async fn mark_as_published(&self, id: u64) -> StoreResult<()>;

    /// Add one failed attempt and return the new retry count.
    async fn increment_retries(&self, id: u64) -> StoreResult<u32>;

    /// Delete published rows whose `published_at` is older than `cutoff`.
    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    /// Retry-exhausted rows, oldest first.
    fn list_dead_lettered(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>>;

    /// Reset the retry counter of a dead-lettered row so the relay picks it up again.
    async fn requeue_dead_lettered(&self, id: u64) -> StoreResult<OutboxMessage>;

    fn get(&self, id: u64) -> StoreResult<Option<OutboxMessage>>;
}

/// redb-backed [`OutboxStore`].
pub struct OutboxRepository {
    db: Arc<WalletDatabase>,
}

impl OutboxRepository {
    pub fn new(db: Arc<WalletDatabase>) -> Self {
        Self { db }
    }
}

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Key of a row in the pending and dead-letter indexes.
fn created_key(message: &OutboxMessage) -> OutboxIndexKey {
    (micros(message.created_at), message.id)
}

fn load(txn: &WriteTransaction, id: u64) -> StoreResult<OutboxMessage> {
    let table = txn.open_table(OUTBOX_MESSAGES)?;
    let value = table
        .get(id)?
        .ok_or_else(|| StoreError::NotFound(format!("Outbox message {id}")))?;
    Ok(serde_json::from_slice(value.value())?)
}

fn store(txn: &WriteTransaction, message: &OutboxMessage) -> StoreResult<()> {
    let json = serde_json::to_vec(message)?;
    let mut table = txn.open_table(OUTBOX_MESSAGES)?;
    table.insert(message.id, json.as_slice())?;
    Ok(())
}

fn next_id(txn: &WriteTransaction) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(OUTBOX_SEQUENCE)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(OUTBOX_SEQUENCE, next)?;
    Ok(next)
}

/// Resolve up to `limit` rows of an index, in key order.
fn collect_indexed(
    read_txn: &ReadTransaction,
    index: TableDefinition<OutboxIndexKey, ()>,
    limit: usize,
    keep: impl Fn(&OutboxMessage) -> bool,
) -> StoreResult<Vec<OutboxMessage>> {
    let index = read_txn.open_table(index)?;
    let messages = read_txn.open_table(OUTBOX_MESSAGES)?;

    let mut batch = Vec::new();
    for entry in index.iter()? {
        if batch.len() >= limit {
            break;
        }
        let (key, _) = entry?;
        let (_, id) = key.value();
        let Some(value) = messages.get(id)? else {
            continue;
        };
        let message: OutboxMessage = serde_json::from_slice(value.value())?;
        if keep(&message) {
            batch.push(message);
        }
    }
    Ok(batch)
}

#[async_trait]
impl OutboxStore for OutboxRepository {
    fn create(&self, tx: &Transaction, message: NewOutboxMessage) -> StoreResult<OutboxMessage> {
        let txn = tx.write_txn()?;
        let now = Utc::now();

        let row = OutboxMessage {
            id: next_id(txn)?,
            aggregate_id: message.aggregate_id,
            event_type: message.event_type,
            payload: message.payload,
            published: false,
            published_at: None,
            retries: 0,
            max_retries: message.max_retries,
            created_at: now,
            updated_at: now,
        };

        store(txn, &row)?;
        if row.is_exhausted() {
            // A zero retry budget is dead on arrival
            txn.open_table(OUTBOX_DEAD_LETTERS)?.insert(created_key(&row), ())?;
        } else {
            txn.open_table(OUTBOX_PENDING)?.insert(created_key(&row), ())?;
        }

        Ok(row)
    }

    fn get_pending_messages(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>> {
        let read_txn = self.db.begin_read()?;
        collect_indexed(&read_txn, OUTBOX_PENDING, limit, OutboxMessage::is_pending)
    }

    async fn mark_as_published(&self, id: u64) -> StoreResult<()> {
        let tx = self.db.begin_write().await?;
        {
            let txn = tx.write_txn()?;
            let mut message = load(txn, id)?;
            if message.published {
                return Ok(());
            }

            let now = Utc::now();
            message.published = true;
            message.published_at = Some(now);
            message.updated_at = now;
            store(txn, &message)?;

            txn.open_table(OUTBOX_PENDING)?.remove(created_key(&message))?;
            txn.open_table(OUTBOX_DEAD_LETTERS)?.remove(created_key(&message))?;
            txn.open_table(OUTBOX_PUBLISHED)?.insert((micros(now), id), ())?;
        }
        tx.commit()
    }

    async fn increment_retries(&self, id: u64) -> StoreResult<u32> {
        let tx = self.db.begin_write().await?;
        let retries = {
            let txn = tx.write_txn()?;
            let mut message = load(txn, id)?;
            if message.published {
                return Ok(message.retries);
            }

            message.retries += 1;
            message.updated_at = Utc::now();
            store(txn, &message)?;

            if message.is_exhausted() {
                txn.open_table(OUTBOX_PENDING)?.remove(created_key(&message))?;
                txn.open_table(OUTBOX_DEAD_LETTERS)?.insert(created_key(&message), ())?;
            }
            message.retries
        };
        tx.commit()?;
        Ok(retries)
    }

    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let tx = self.db.begin_write().await?;
        let deleted = {
            let txn = tx.write_txn()?;
            let mut published = txn.open_table(OUTBOX_PUBLISHED)?;

            let mut expired = Vec::new();
            for entry in published.range(..(micros(cutoff), 0u64))? {
                let (key, _) = entry?;
                expired.push(key.value());
            }

            let mut messages = txn.open_table(OUTBOX_MESSAGES)?;
            for key in &expired {
                published.remove(*key)?;
                messages.remove(key.1)?;
            }
            expired.len()
        };
        tx.commit()?;
        Ok(deleted)
    }

    fn list_dead_lettered(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>> {
        let read_txn = self.db.begin_read()?;
        collect_indexed(&read_txn, OUTBOX_DEAD_LETTERS, limit, |_| true)
    }

    async fn requeue_dead_lettered(&self, id: u64) -> StoreResult<OutboxMessage> {
        let not_found = || StoreError::NotFound(format!("Dead-lettered outbox message {id}"));

        let tx = self.db.begin_write().await?;
        let message = {
            let txn = tx.write_txn()?;
            let mut message = match load(txn, id) {
                Ok(message) => message,
                Err(StoreError::NotFound(_)) => return Err(not_found()),
                Err(e) => return Err(e),
            };
            if txn
                .open_table(OUTBOX_DEAD_LETTERS)?
                .remove(created_key(&message))?
                .is_none()
            {
                return Err(not_found());
            }

            message.retries = 0;
            message.updated_at = Utc::now();
            store(txn, &message)?;
            txn.open_table(OUTBOX_PENDING)?.insert(created_key(&message), ())?;
            message
        };
        tx.commit()?;
        Ok(message)
    }

    fn get(&self, id: u64) -> StoreResult<Option<OutboxMessage>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTBOX_MESSAGES)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}
