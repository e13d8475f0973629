// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{WalletTypeRequest, WalletTypeResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/wallet-types",
    tag = "Wallet Types",
    responses((status = 200, body = [WalletTypeResponse]))
)]
pub async fn list_wallet_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<WalletTypeResponse>>, ApiError> {
    Ok(Json(state.wallet_types.get_all()?))
}

#[utoipa::path(
    get,
    path = "/v1/wallet-types/{wallet_type_id}",
    params(("wallet_type_id" = Uuid, Path, description = "Wallet type identifier")),
    tag = "Wallet Types",
    responses(
        (status = 200, body = WalletTypeResponse),
        (status = 404, description = "Wallet type not found")
    )
)]
pub async fn get_wallet_type(
    Path(wallet_type_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WalletTypeResponse>, ApiError> {
    Ok(Json(state.wallet_types.get_by_id(wallet_type_id)?))
}

#[utoipa::path(
    post,
    path = "/v1/wallet-types",
    request_body = WalletTypeRequest,
    tag = "Wallet Types",
    responses(
        (status = 201, body = WalletTypeResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_wallet_type(
    State(state): State<AppState>,
    Json(request): Json<WalletTypeRequest>,
) -> Result<(StatusCode, Json<WalletTypeResponse>), ApiError> {
    let created = state.wallet_types.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/v1/wallet-types/{wallet_type_id}",
    params(("wallet_type_id" = Uuid, Path, description = "Wallet type identifier")),
    request_body = WalletTypeRequest,
    tag = "Wallet Types",
    responses(
        (status = 200, body = WalletTypeResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Wallet type not found")
    )
)]
pub async fn update_wallet_type(
    Path(wallet_type_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<WalletTypeRequest>,
) -> Result<Json<WalletTypeResponse>, ApiError> {
    Ok(Json(state.wallet_types.update(wallet_type_id, request).await?))
}

/// Delete a wallet type no wallet refers to.
#[utoipa::path(
    delete,
    path = "/v1/wallet-types/{wallet_type_id}",
    params(("wallet_type_id" = Uuid, Path, description = "Wallet type identifier")),
    tag = "Wallet Types",
    responses(
        (status = 200, body = WalletTypeResponse),
        (status = 404, description = "Wallet type not found"),
        (status = 409, description = "Wallet type still in use")
    )
)]
pub async fn delete_wallet_type(
    Path(wallet_type_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WalletTypeResponse>, ApiError> {
    Ok(Json(state.wallet_types.delete(wallet_type_id).await?))
}
