// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet type catalogue. Plain local transactions, no integration events.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{validation, WalletError};
use crate::models::{WalletTypeRequest, WalletTypeResponse};
use crate::storage::{StoreError, TxManager, WalletStore, WalletType, WalletTypeStore};

pub struct WalletTypeService {
    tx_manager: Arc<dyn TxManager>,
    wallet_types: Arc<dyn WalletTypeStore>,
    wallets: Arc<dyn WalletStore>,
}

impl WalletTypeService {
    pub fn new(
        tx_manager: Arc<dyn TxManager>,
        wallet_types: Arc<dyn WalletTypeStore>,
        wallets: Arc<dyn WalletStore>,
    ) -> Self {
        Self {
            tx_manager,
            wallet_types,
            wallets,
        }
    }

    pub fn get_all(&self) -> Result<Vec<WalletTypeResponse>, WalletError> {
        let types = self
            .wallet_types
            .list_all()
            .map_err(WalletError::persistence("list wallet types", "all"))?;
        Ok(types.into_iter().map(Into::into).collect())
    }

    pub fn get_by_id(&self, id: Uuid) -> Result<WalletTypeResponse, WalletError> {
        self.require(id).map(Into::into)
    }

    pub async fn create(&self, request: WalletTypeRequest) -> Result<WalletTypeResponse, WalletError> {
        validation::wallet_type(&request)?;

        let now = Utc::now();
        let wallet_type = WalletType {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            kind: request.kind,
            description: request.description,
            created_at: now,
            updated_at: now,
        };

        let tx = self
            .tx_manager
            .begin()
            .await
            .map_err(WalletError::persistence("open transaction for wallet type", wallet_type.id))?;
        self.wallet_types
            .create(&tx, &wallet_type)
            .map_err(WalletError::persistence("create wallet type", wallet_type.id))?;
        tx.commit()
            .map_err(WalletError::persistence("commit wallet type", wallet_type.id))?;

        tracing::info!(wallet_type_id = %wallet_type.id, kind = %wallet_type.kind, "Wallet type created");
        Ok(wallet_type.into())
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: WalletTypeRequest,
    ) -> Result<WalletTypeResponse, WalletError> {
        validation::wallet_type(&request)?;
        let mut wallet_type = self.require(id)?;

        wallet_type.name = request.name.trim().to_string();
        wallet_type.kind = request.kind;
        wallet_type.description = request.description;
        wallet_type.updated_at = Utc::now();

        let tx = self
            .tx_manager
            .begin()
            .await
            .map_err(WalletError::persistence("open transaction for wallet type", id))?;
        self.wallet_types
            .update(&tx, &wallet_type)
            .map_err(not_found_or("update wallet type", id))?;
        tx.commit()
            .map_err(WalletError::persistence("commit wallet type", id))?;

        Ok(wallet_type.into())
    }

    /// Delete a wallet type that no wallet refers to.
    pub async fn delete(&self, id: Uuid) -> Result<WalletTypeResponse, WalletError> {
        self.require(id)?;

        let tx = self
            .tx_manager
            .begin()
            .await
            .map_err(WalletError::persistence("open transaction for wallet type", id))?;

        // Checked with the writer slot held so no wallet can be created against it meanwhile
        let in_use = self
            .wallets
            .list_all()
            .map_err(WalletError::persistence("list wallets of wallet type", id))?
            .iter()
            .any(|w| w.wallet_type_id == id);
        if in_use {
            return Err(WalletError::InvalidState(format!(
                "Wallet type {id} is still used by at least one wallet"
            )));
        }

        let removed = self
            .wallet_types
            .delete(&tx, id)
            .map_err(not_found_or("delete wallet type", id))?;
        tx.commit()
            .map_err(WalletError::persistence("commit wallet type", id))?;

        Ok(removed.into())
    }

    fn require(&self, id: Uuid) -> Result<WalletType, WalletError> {
        self.wallet_types
            .get(id)
            .map_err(WalletError::persistence("load wallet type", id))?
            .ok_or(WalletError::NotFound {
                entity: "Wallet type",
                id,
            })
    }
}

fn not_found_or(operation: &'static str, id: Uuid) -> impl FnOnce(StoreError) -> WalletError {
    move |e| match e {
        StoreError::NotFound(_) => WalletError::NotFound {
            entity: "Wallet type",
            id,
        },
        other => WalletError::persistence(operation, id)(other),
    }
}
