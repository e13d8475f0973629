// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded wallet database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wallets`: wallet_id → serialized [`Wallet`](super::Wallet)
//! - `wallet_types`: wallet_type_id → serialized [`WalletType`](super::WalletType)
//! - `outbox_messages`: outbox id → serialized [`OutboxMessage`](super::OutboxMessage)
//! - `outbox_pending`: (created_at micros, outbox id), rows still eligible for relay
//! - `outbox_dead_letters`: (created_at micros, outbox id), retry-exhausted rows
//! - `outbox_published`: (published_at micros, outbox id), rows awaiting cleanup
//! - `sequences`: sequence name → last allocated value
//!
//! ## Writers
//!
//! redb admits a single write transaction at a time and `begin_write` blocks the
//! calling thread until the previous writer finishes. Every writer in this
//! process first acquires the async write gate, so waiting for the writer slot
//! parks a task instead of a runtime worker.

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadTransaction, ReadableDatabase, TableDefinition};
use tokio::sync::Mutex;

use super::transaction::Transaction;

// =============================================================================
// Table Definitions
// =============================================================================

/// Wallet rows: wallet_id (hyphenated uuid) → JSON bytes.
pub(crate) const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Wallet type rows: wallet_type_id (hyphenated uuid) → JSON bytes.
pub(crate) const WALLET_TYPES: TableDefinition<&str, &[u8]> = TableDefinition::new("wallet_types");

/// Outbox rows: monotonically increasing id → JSON bytes.
pub(crate) const OUTBOX_MESSAGES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("outbox_messages");

/// Outbox index key: (timestamp micros, outbox id). Iterates in delivery order.
pub(crate) type OutboxIndexKey = (i64, u64);

/// Unpublished, not yet exhausted outbox rows, keyed by creation time.
pub(crate) const OUTBOX_PENDING: TableDefinition<OutboxIndexKey, ()> =
    TableDefinition::new("outbox_pending");

/// Retry-exhausted outbox rows, keyed by creation time.
pub(crate) const OUTBOX_DEAD_LETTERS: TableDefinition<OutboxIndexKey, ()> =
    TableDefinition::new("outbox_dead_letters");

/// Published outbox rows, keyed by publication time.
pub(crate) const OUTBOX_PUBLISHED: TableDefinition<OutboxIndexKey, ()> =
    TableDefinition::new("outbox_published");

/// Named counters: name → last allocated value.
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence used to allocate outbox ids.
pub(crate) const OUTBOX_SEQUENCE: &str = "outbox_messages";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("transaction already finished")]
    TransactionFinished,
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// WalletDatabase
// =============================================================================

/// Embedded ACID store holding wallets, wallet types and the outbox.
pub struct WalletDatabase {
    db: Database,
    write_gate: Arc<Mutex<()>>,
}

impl WalletDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self::init(Database::create(path)?)
    }

    /// Create a database that lives only in memory.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Database::builder().create_with_backend(InMemoryBackend::new())?)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_TYPES)?;
            let _ = write_txn.open_table(OUTBOX_MESSAGES)?;
            let _ = write_txn.open_table(OUTBOX_PENDING)?;
            let _ = write_txn.open_table(OUTBOX_DEAD_LETTERS)?;
            let _ = write_txn.open_table(OUTBOX_PUBLISHED)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Begin a write transaction, waiting for the writer slot without blocking
    /// the runtime.
    pub async fn begin_write(&self) -> StoreResult<Transaction> {
        let permit = Arc::clone(&self.write_gate).lock_owned().await;
        let txn = self.db.begin_write()?;
        Ok(Transaction::new(txn, permit))
    }

    /// Begin a read-only snapshot. Readers never wait on writers.
    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness check used by the readiness endpoint.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}
