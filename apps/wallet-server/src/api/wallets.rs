// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints.
//!
//! Mutations run through the wallet saga; the caller is identified by the
//! bearer token only where the operation is scoped to a user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::BearerToken,
    error::ApiError,
    models::{CreateWalletRequest, UpdateWalletRequest, UserWalletsByType, WalletResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    responses((status = 200, body = [WalletResponse]))
)]
pub async fn list_wallets(
    State(state): State<AppState>,
) -> Result<Json<Vec<WalletResponse>>, ApiError> {
    Ok(Json(state.wallets.get_all_wallets()?))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}",
    params(("wallet_id" = Uuid, Path, description = "Wallet identifier")),
    tag = "Wallets",
    responses(
        (status = 200, body = WalletResponse),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_wallet(
    Path(wallet_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, ApiError> {
    Ok(Json(state.wallets.get_wallet_by_id(wallet_id)?))
}

/// Wallets owned by the caller.
#[utoipa::path(
    get,
    path = "/v1/wallets/user",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [WalletResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_user_wallets(
    BearerToken(token): BearerToken,
    State(state): State<AppState>,
) -> Result<Json<Vec<WalletResponse>>, ApiError> {
    Ok(Json(state.wallets.get_wallets_by_user(&token)?))
}

/// Wallets owned by the caller, grouped by wallet kind.
#[utoipa::path(
    get,
    path = "/v1/wallets/user/by-type",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [UserWalletsByType]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_user_wallets_by_type(
    BearerToken(token): BearerToken,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWalletsByType>>, ApiError> {
    Ok(Json(state.wallets.get_wallets_by_user_grouped_by_type(&token)?))
}

/// Create a wallet for the caller and book its opening balance.
///
/// The saga runs on its own task, so a client that disconnects mid-request
/// cannot interrupt it between the remote deposit and its compensation.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Wallet type not found"),
        (status = 502, description = "Transaction service unavailable")
    )
)]
pub async fn create_wallet(
    BearerToken(token): BearerToken,
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let service = state.wallets.clone();
    let wallet = tokio::spawn(async move { service.create_wallet(&token, request).await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Wallet creation task failed");
            ApiError::internal("failed to create wallet")
        })??;

    Ok((StatusCode::CREATED, Json(wallet)))
}

#[utoipa::path(
    put,
    path = "/v1/wallets/{wallet_id}",
    params(("wallet_id" = Uuid, Path, description = "Wallet identifier")),
    tag = "Wallets",
    request_body = UpdateWalletRequest,
    responses(
        (status = 200, body = WalletResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn update_wallet(
    Path(wallet_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<UpdateWalletRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    Ok(Json(state.wallets.update_wallet(wallet_id, request).await?))
}

/// Delete a wallet with a zero balance.
#[utoipa::path(
    delete,
    path = "/v1/wallets/{wallet_id}",
    params(("wallet_id" = Uuid, Path, description = "Wallet identifier")),
    tag = "Wallets",
    responses(
        (status = 200, description = "Deleted wallet", body = WalletResponse),
        (status = 404, description = "Wallet not found"),
        (status = 409, description = "Wallet balance is not zero")
    )
)]
pub async fn delete_wallet(
    Path(wallet_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, ApiError> {
    Ok(Json(state.wallets.delete_wallet(wallet_id).await?))
}
