// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unit-of-work handling.
//!
//! A [`Transaction`] owns one redb write transaction plus the write-gate permit
//! that admitted it. `commit` and `rollback` consume the value, so a finished
//! transaction cannot be touched again. Dropping an unfinished transaction
//! rolls it back, which makes every early return on an error path safe.

use async_trait::async_trait;
use redb::WriteTransaction;
use tokio::sync::OwnedMutexGuard;

use super::database::{StoreError, StoreResult, WalletDatabase};

/// Opens units of work spanning one or more repository calls.
#[async_trait]
pub trait TxManager: Send + Sync {
    /// Open a new atomic unit of work.
    async fn begin(&self) -> StoreResult<Transaction>;
}

#[async_trait]
impl TxManager for WalletDatabase {
    async fn begin(&self) -> StoreResult<Transaction> {
        self.begin_write().await
    }
}

/// An open write transaction. Rolled back on drop unless committed.
pub struct Transaction {
    inner: Option<WriteTransaction>,
    _permit: OwnedMutexGuard<()>,
    #[cfg(test)]
    fail_commit: bool,
}

impl Transaction {
    pub(crate) fn new(inner: WriteTransaction, permit: OwnedMutexGuard<()>) -> Self {
        Self {
            inner: Some(inner),
            _permit: permit,
            #[cfg(test)]
            fail_commit: false,
        }
    }

    /// Make `commit` abort the unit and report a storage failure.
    #[cfg(test)]
    pub(crate) fn fail_on_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Borrow the underlying redb transaction for table access.
    pub(crate) fn write_txn(&self) -> StoreResult<&WriteTransaction> {
        self.inner.as_ref().ok_or(StoreError::TransactionFinished)
    }

    /// Make every write of this unit visible atomically.
    pub fn commit(mut self) -> StoreResult<()> {
        let txn = self.inner.take().ok_or(StoreError::TransactionFinished)?;
        #[cfg(test)]
        if self.fail_commit {
            txn.abort()?;
            return Err(redb::StorageError::Io(std::io::Error::other("commit failed")).into());
        }
        txn.commit()?;
        Ok(())
    }

    /// Discard every write of this unit.
    pub fn rollback(mut self) -> StoreResult<()> {
        let txn = self.inner.take().ok_or(StoreError::TransactionFinished)?;
        txn.abort()?;
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(txn) = self.inner.take() {
            if let Err(e) = txn.abort() {
                tracing::warn!(error = %e, "Failed to abort dropped transaction");
            } else {
                tracing::debug!("Uncommitted transaction rolled back on drop");
            }
        }
    }
}
