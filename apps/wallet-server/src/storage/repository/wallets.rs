// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet repository.
//!
//! Mutations only happen inside a caller-supplied [`Transaction`] so that the
//! wallet row and its outbox event commit together. Reads use a fresh snapshot
//! and therefore only see committed rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::database::{StoreError, StoreResult, WalletDatabase, WALLETS};
use crate::storage::Transaction;

/// Wallet row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Pre-assigned identifier, known before the remote deposit call
    pub id: Uuid,
    /// Owner (token subject)
    pub user_id: Uuid,
    pub wallet_type_id: Uuid,
    pub name: String,
    /// Account or card number, free-form
    pub number: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage contract for wallet rows.
pub trait WalletStore: Send + Sync {
    /// Insert a new wallet. Fails with `AlreadyExists` on id collision.
    fn create(&self, tx: &Transaction, wallet: &Wallet) -> StoreResult<()>;

    /// Overwrite an existing wallet row.
    fn update(&self, tx: &Transaction, wallet: &Wallet) -> StoreResult<()>;

    /// Remove a wallet row, returning what was removed.
    fn delete(&self, tx: &Transaction, wallet_id: Uuid) -> StoreResult<Wallet>;

    fn get(&self, wallet_id: Uuid) -> StoreResult<Option<Wallet>>;

    fn list_all(&self) -> StoreResult<Vec<Wallet>>;

    fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Wallet>>;
}

/// redb-backed [`WalletStore`].
pub struct WalletRepository {
    db: Arc<WalletDatabase>,
}

impl WalletRepository {
    pub fn new(db: Arc<WalletDatabase>) -> Self {
        Self { db }
    }

    fn scan(&self, mut keep: impl FnMut(&Wallet) -> bool) -> StoreResult<Vec<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;

        let mut wallets = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let wallet: Wallet = serde_json::from_slice(value.value())?;
            if keep(&wallet) {
                wallets.push(wallet);
            }
        }

        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }
}

impl WalletStore for WalletRepository {
    fn create(&self, tx: &Transaction, wallet: &Wallet) -> StoreResult<()> {
        let key = wallet.id.to_string();
        let json = serde_json::to_vec(wallet)?;

        let mut table = tx.write_txn()?.open_table(WALLETS)?;
        if table.get(key.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("Wallet {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    fn update(&self, tx: &Transaction, wallet: &Wallet) -> StoreResult<()> {
        let key = wallet.id.to_string();
        let json = serde_json::to_vec(wallet)?;

        let mut table = tx.write_txn()?.open_table(WALLETS)?;
        if table.get(key.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("Wallet {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    fn delete(&self, tx: &Transaction, wallet_id: Uuid) -> StoreResult<Wallet> {
        let key = wallet_id.to_string();

        let mut table = tx.write_txn()?.open_table(WALLETS)?;
        let removed = match table.remove(key.as_str())? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StoreError::NotFound(format!("Wallet {key}"))),
        };
        Ok(removed)
    }

    fn get(&self, wallet_id: Uuid) -> StoreResult<Option<Wallet>> {
        let key = wallet_id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> StoreResult<Vec<Wallet>> {
        self.scan(|_| true)
    }

    fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Wallet>> {
        self.scan(|wallet| wallet.user_id == user_id)
    }
}
