// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet gRPC Service
//!
//! `wallet.WalletService` for other backend services. Callers are trusted:
//! requests carry user and wallet ids directly, no bearer token.
//!
//! | RPC | Kind |
//! |-----|------|
//! | `GetWallets` | server streaming, every wallet |
//! | `GetUserWallets` | server streaming, wallets of one user |
//! | `GetWalletByID` | unary |
//! | `UpdateWallet` | unary, runs the update saga and enqueues `wallet.updated` |

pub mod proto;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tonic::{Request, Response, Status};
use tracing::error;
use uuid::Uuid;

use crate::models::{UpdateWalletRequest, WalletResponse};
use crate::service::{WalletError, WalletService};
use proto::wallet_service_server::{WalletService as WalletRpc, WalletServiceServer};

/// Stream of wallets answered by the streaming RPCs.
pub type WalletStream = tokio_stream::Iter<std::vec::IntoIter<Result<proto::Wallet, Status>>>;

/// Implements `wallet.WalletService` on top of [`WalletService`].
pub struct WalletGrpcService {
    wallets: Arc<WalletService>,
}

impl WalletGrpcService {
    pub fn new(wallets: Arc<WalletService>) -> Self {
        Self { wallets }
    }

    pub fn into_server(self) -> WalletServiceServer<Self> {
        WalletServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl WalletRpc for WalletGrpcService {
    type GetWalletsStream = WalletStream;
    type GetUserWalletsStream = WalletStream;

    async fn get_wallets(
        &self,
        _request: Request<proto::GetWalletOptions>,
    ) -> Result<Response<Self::GetWalletsStream>, Status> {
        let wallets = self.wallets.get_all_wallets().map_err(into_status)?;
        Ok(Response::new(stream(wallets)))
    }

    async fn get_user_wallets(
        &self,
        request: Request<proto::UserId>,
    ) -> Result<Response<Self::GetUserWalletsStream>, Status> {
        let user_id = parse_id("user id", &request.get_ref().id)?;
        let wallets = self
            .wallets
            .get_wallets_by_user_id(user_id)
            .map_err(into_status)?;
        Ok(Response::new(stream(wallets)))
    }

    async fn get_wallet_by_id(
        &self,
        request: Request<proto::WalletId>,
    ) -> Result<Response<proto::Wallet>, Status> {
        let wallet_id = parse_id("wallet id", &request.get_ref().id)?;
        let wallet = self
            .wallets
            .get_wallet_by_id(wallet_id)
            .map_err(into_status)?;
        Ok(Response::new(wallet.into()))
    }

    async fn update_wallet(
        &self,
        request: Request<proto::Wallet>,
    ) -> Result<Response<proto::Wallet>, Status> {
        let wallet = request.into_inner();
        let wallet_id = parse_id("wallet id", &wallet.id)?;
        // An empty type id keeps the current wallet type
        let wallet_type_id = match wallet.wallet_type_id.as_str() {
            "" => None,
            raw => Some(parse_id("wallet type id", raw)?),
        };

        let updated = self
            .wallets
            .update_wallet(
                wallet_id,
                UpdateWalletRequest {
                    name: wallet.name,
                    number: wallet.number,
                    balance: wallet.balance,
                    wallet_type_id,
                },
            )
            .await
            .map_err(into_status)?;
        Ok(Response::new(updated.into()))
    }
}

impl From<WalletResponse> for proto::Wallet {
    fn from(wallet: WalletResponse) -> Self {
        Self {
            id: wallet.id.to_string(),
            user_id: wallet.user_id.to_string(),
            name: wallet.name,
            number: wallet.number,
            balance: wallet.balance,
            wallet_type_id: wallet.wallet_type_id.to_string(),
            wallet_type: wallet
                .wallet_type
                .map(|kind| kind.as_str().to_string())
                .unwrap_or_default(),
            wallet_type_name: wallet.wallet_type_name.unwrap_or_default(),
            created_at: rfc3339(wallet.created_at),
            updated_at: rfc3339(wallet.updated_at),
        }
    }
}

fn stream(wallets: Vec<WalletResponse>) -> WalletStream {
    let items: Vec<_> = wallets.into_iter().map(|w| Ok(w.into())).collect();
    tokio_stream::iter(items)
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_id(what: &str, raw: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(raw).map_err(|_| Status::invalid_argument(format!("invalid {what}: {raw:?}")))
}

fn into_status(err: WalletError) -> Status {
    let message = err.to_string();
    match &err {
        WalletError::Validation(_) => Status::invalid_argument(message),
        WalletError::Unauthorized(_) => Status::unauthenticated(message),
        WalletError::NotFound { .. } => Status::not_found(message),
        WalletError::InvalidState(_) => Status::failed_precondition(message),
        WalletError::Persistence { .. } => {
            error!(error = %message, source = ?std::error::Error::source(&err), "Persistence failure");
            Status::internal(message)
        }
        WalletError::RemoteCall { .. } => {
            error!(error = %message, source = ?std::error::Error::source(&err), "Transaction service failure");
            Status::unavailable(message)
        }
    }
}
