// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Layer
//!
//! Business operations behind the HTTP handlers. Services own their
//! collaborators as trait objects, so tests swap in in-memory fakes for the
//! transaction service and the token verifier.

pub mod error;
pub mod validation;
pub mod wallet_types;
pub mod wallets;

pub use error::WalletError;
pub use wallet_types::WalletTypeService;
pub use wallets::{
    SagaConfig, SagaState, WalletService, WALLET_CREATED, WALLET_DELETED, WALLET_UPDATED,
};
