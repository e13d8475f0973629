// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator endpoints for outbox messages that exhausted their retries.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    models::DeadLetterResponse,
    state::AppState,
    storage::StoreError,
};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeadLetterQuery {
    /// Maximum number of messages to return (default 50, at most 500).
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/v1/outbox/dead-letters",
    params(DeadLetterQuery),
    tag = "Outbox",
    responses((status = 200, body = [DeadLetterResponse]))
)]
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<DeadLetterQuery>,
) -> Result<Json<Vec<DeadLetterResponse>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let messages = state
        .outbox
        .list_dead_lettered(limit)
        .map_err(|e| internal("list dead-lettered messages", e))?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Put a dead-lettered message back in the relay queue with a fresh retry budget.
#[utoipa::path(
    post,
    path = "/v1/outbox/dead-letters/{message_id}/requeue",
    params(("message_id" = u64, Path, description = "Outbox message identifier")),
    tag = "Outbox",
    responses(
        (status = 200, body = DeadLetterResponse),
        (status = 404, description = "No dead-lettered message with this id")
    )
)]
pub async fn requeue_dead_letter(
    Path(message_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<DeadLetterResponse>, ApiError> {
    match state.outbox.requeue_dead_lettered(message_id).await {
        Ok(message) => {
            tracing::info!(outbox_id = message_id, event_type = %message.event_type, "Dead letter requeued");
            Ok(Json(message.into()))
        }
        Err(StoreError::NotFound(_)) => Err(ApiError::not_found(format!(
            "Dead-lettered message {message_id} not found"
        ))),
        Err(e) => Err(internal("requeue outbox message", e)),
    }
}

fn internal(operation: &str, err: StoreError) -> ApiError {
    tracing::error!(error = %err, "Failed to {operation}");
    ApiError::internal(format!("failed to {operation}"))
}
