// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service-level error taxonomy.
//!
//! Messages name the failed operation and the entity id only. Storage and
//! transport details stay in the `source` chain for logging and never reach
//! API callers.

use uuid::Uuid;

use crate::auth::AuthError;
use crate::remote::RemoteCallError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Bad input, rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The entity exists but is not in a state that permits the operation.
    #[error("{0}")]
    InvalidState(String),

    #[error("failed to {operation} {entity_id}")]
    Persistence {
        operation: &'static str,
        entity_id: String,
        #[source]
        source: StoreError,
    },

    #[error("transaction service call failed while trying to {operation} {entity_id}")]
    RemoteCall {
        operation: &'static str,
        entity_id: String,
        #[source]
        source: RemoteCallError,
    },
}

impl WalletError {
    pub fn validation(message: impl Into<String>) -> Self {
        WalletError::Validation(message.into())
    }

    /// Build a `map_err` adapter that wraps a [`StoreError`] with context.
    pub(crate) fn persistence(
        operation: &'static str,
        entity_id: impl ToString,
    ) -> impl FnOnce(StoreError) -> Self {
        let entity_id = entity_id.to_string();
        move |source| WalletError::Persistence {
            operation,
            entity_id,
            source,
        }
    }
}
