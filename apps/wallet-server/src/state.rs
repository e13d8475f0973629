// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::service::{WalletService, WalletTypeService};
use crate::storage::{OutboxStore, WalletDatabase};

#[derive(Clone)]
pub struct AppState {
    pub wallets: Arc<WalletService>,
    pub wallet_types: Arc<WalletTypeService>,
    /// Operator access to dead-lettered messages.
    pub outbox: Arc<dyn OutboxStore>,
    /// Probed by the readiness check.
    pub db: Arc<WalletDatabase>,
}

impl AppState {
    pub fn new(
        wallets: WalletService,
        wallet_types: WalletTypeService,
        outbox: Arc<dyn OutboxStore>,
        db: Arc<WalletDatabase>,
    ) -> Self {
        Self {
            wallets: Arc::new(wallets),
            wallet_types: Arc::new(wallet_types),
            outbox,
            db,
        }
    }
}
