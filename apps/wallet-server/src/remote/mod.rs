// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote Transaction Service
//!
//! The wallet saga records a wallet's opening balance as an initial deposit in
//! the transaction service, and cancels that deposit again if the local side of
//! the saga fails afterwards.
//!
//! [`TransactionClient`] is the seam the saga depends on; [`GrpcTransactionClient`]
//! is the production implementation.

pub mod grpc;
pub mod proto;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

pub use grpc::GrpcTransactionClient;

/// Identifier of a deposit recorded by the transaction service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepositId(String);

impl DepositId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure of a call to the transaction service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteCallError {
    #[error("transaction service did not answer within {0:?}")]
    Timeout(Duration),

    /// Worth retrying by the caller (service unavailable, overloaded, ...).
    #[error("transaction service temporarily unavailable: {0}")]
    Transient(String),

    #[error("transaction service rejected the call: {0}")]
    Permanent(String),
}

/// Client for the remote transaction service.
#[async_trait]
pub trait TransactionClient: Send + Sync {
    /// Record the opening balance of `wallet_id` as a deposit.
    async fn create_initial_deposit(
        &self,
        wallet_id: Uuid,
        amount: f64,
    ) -> Result<DepositId, RemoteCallError>;

    /// Undo a deposit created by [`create_initial_deposit`](Self::create_initial_deposit).
    async fn cancel_initial_deposit(&self, deposit_id: &DepositId) -> Result<(), RemoteCallError>;
}
