// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded redb database:
//!
//! ```text
//! wallet.redb
//!   wallets              # wallet rows
//!   wallet_types         # wallet type catalogue
//!   outbox_messages      # integration events awaiting (or past) delivery
//!   outbox_pending       # index: rows the relay still has to publish
//!   outbox_dead_letters  # index: rows that ran out of retries
//!   sequences            # outbox id allocation
//! ```
//!
//! ## Important Notes
//!
//! - Every mutation of a wallet row goes through a [`Transaction`] that also
//!   carries its outbox event. There is no way to write one without the other.
//! - Reads see committed data only.
//! - redb takes an exclusive lock on the database file, so exactly one process
//!   (and therefore one outbox relay) owns a given database.

pub mod database;
pub mod repository;
pub mod transaction;

pub use database::{StoreError, StoreResult, WalletDatabase};
pub use repository::{
    NewOutboxMessage, OutboxMessage, OutboxRepository, OutboxStore, Wallet, WalletKind,
    WalletRepository, WalletStore, WalletType, WalletTypeRepository, WalletTypeStore,
    DEFAULT_MAX_RETRIES,
};
pub use transaction::{Transaction, TxManager};
