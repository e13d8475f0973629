// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the wallet database.
//!
//! Writes take a caller-owned [`Transaction`](super::Transaction); reads open
//! their own snapshot.

pub mod outbox;
pub mod wallet_types;
pub mod wallets;

pub use outbox::{NewOutboxMessage, OutboxMessage, OutboxRepository, OutboxStore, DEFAULT_MAX_RETRIES};
pub use wallet_types::{WalletKind, WalletType, WalletTypeRepository, WalletTypeStore};
pub use wallets::{Wallet, WalletRepository, WalletStore};
