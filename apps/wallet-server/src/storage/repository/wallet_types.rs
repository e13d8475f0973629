// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet type repository (bank, e-wallet, physical, others).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::database::{StoreError, StoreResult, WalletDatabase, WALLET_TYPES};
use crate::storage::Transaction;

/// Broad category a wallet type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum WalletKind {
    #[serde(rename = "bank")]
    Bank,
    #[serde(rename = "e-wallet")]
    EWallet,
    #[serde(rename = "physical")]
    Physical,
    #[serde(rename = "others")]
    Others,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Bank => "bank",
            WalletKind::EWallet => "e-wallet",
            WalletKind::Physical => "physical",
            WalletKind::Others => "others",
        }
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet type row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletType {
    pub id: Uuid,
    pub name: String,
    pub kind: WalletKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage contract for wallet type rows.
pub trait WalletTypeStore: Send + Sync {
    fn create(&self, tx: &Transaction, wallet_type: &WalletType) -> StoreResult<()>;
    fn update(&self, tx: &Transaction, wallet_type: &WalletType) -> StoreResult<()>;
    fn delete(&self, tx: &Transaction, wallet_type_id: Uuid) -> StoreResult<WalletType>;
    fn get(&self, wallet_type_id: Uuid) -> StoreResult<Option<WalletType>>;
    fn list_all(&self) -> StoreResult<Vec<WalletType>>;
}

/// redb-backed [`WalletTypeStore`].
pub struct WalletTypeRepository {
    db: Arc<WalletDatabase>,
}

impl WalletTypeRepository {
    pub fn new(db: Arc<WalletDatabase>) -> Self {
        Self { db }
    }
}

impl WalletTypeStore for WalletTypeRepository {
    fn create(&self, tx: &Transaction, wallet_type: &WalletType) -> StoreResult<()> {
        let key = wallet_type.id.to_string();
        let json = serde_json::to_vec(wallet_type)?;

        let mut table = tx.write_txn()?.open_table(WALLET_TYPES)?;
        if table.get(key.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("Wallet type {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    fn update(&self, tx: &Transaction, wallet_type: &WalletType) -> StoreResult<()> {
        let key = wallet_type.id.to_string();
        let json = serde_json::to_vec(wallet_type)?;

        let mut table = tx.write_txn()?.open_table(WALLET_TYPES)?;
        if table.get(key.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("Wallet type {key}")));
        }
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }

    fn delete(&self, tx: &Transaction, wallet_type_id: Uuid) -> StoreResult<WalletType> {
        let key = wallet_type_id.to_string();

        let mut table = tx.write_txn()?.open_table(WALLET_TYPES)?;
        let removed = match table.remove(key.as_str())? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StoreError::NotFound(format!("Wallet type {key}"))),
        };
        Ok(removed)
    }

    fn get(&self, wallet_type_id: Uuid) -> StoreResult<Option<WalletType>> {
        let key = wallet_type_id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_TYPES)?;
        match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> StoreResult<Vec<WalletType>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_TYPES)?;

        let mut wallet_types = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            wallet_types.push(serde_json::from_slice::<WalletType>(value.value())?);
        }
        wallet_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wallet_types)
    }
}
