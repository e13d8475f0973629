// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures of the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! [`WalletResponse`] doubles as the payload of `wallet.*` outbox events, so
//! its field names are part of the integration contract with downstream
//! consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::{OutboxMessage, Wallet, WalletKind, WalletType};

// =============================================================================
// Wallet Models
// =============================================================================

/// Request to create a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CreateWalletRequest {
    pub wallet_type_id: Uuid,
    /// Display name, 1 to 50 characters.
    pub name: String,
    /// Account or card number, up to 50 characters.
    #[serde(default)]
    pub number: String,
    /// Opening balance, recorded as an initial deposit.
    #[serde(default)]
    pub balance: f64,
}

/// Request to update a wallet's mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UpdateWalletRequest {
    pub name: String,
    #[serde(default)]
    pub number: String,
    pub balance: f64,
    /// Move the wallet to another wallet type; unchanged when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WalletResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_type_id: Uuid,
    /// Kind of the wallet type, absent if the type no longer exists.
    pub wallet_type: Option<WalletKind>,
    pub wallet_type_name: Option<String>,
    pub name: String,
    pub number: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletResponse {
    pub fn from_wallet(wallet: &Wallet, wallet_type: Option<&WalletType>) -> Self {
        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            wallet_type_id: wallet.wallet_type_id,
            wallet_type: wallet_type.map(|t| t.kind),
            wallet_type_name: wallet_type.map(|t| t.name.clone()),
            name: wallet.name.clone(),
            number: wallet.number.clone(),
            balance: wallet.balance,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

/// Wallet entry inside a [`UserWalletsByType`] group.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WalletSummary {
    pub id: Uuid,
    pub name: String,
    pub number: String,
    pub balance: f64,
}

/// A user's wallets of one kind.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserWalletsByType {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: WalletKind,
    pub wallets: Vec<WalletSummary>,
}

// =============================================================================
// Wallet Type Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WalletTypeRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WalletKind,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WalletTypeResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WalletKind,
    pub description: String,
}

impl From<WalletType> for WalletTypeResponse {
    fn from(value: WalletType) -> Self {
        Self {
            id: value.id,
            name: value.name,
            kind: value.kind,
            description: value.description,
        }
    }
}

// =============================================================================
// Outbox Models
// =============================================================================

/// An outbox message that ran out of delivery attempts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DeadLetterResponse {
    pub id: u64,
    pub aggregate_id: Uuid,
    pub event_type: String,
    /// Event payload; a JSON string if the stored bytes are not JSON.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub retries: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OutboxMessage> for DeadLetterResponse {
    fn from(message: OutboxMessage) -> Self {
        let payload = serde_json::from_slice(&message.payload).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&message.payload).into_owned())
        });

        Self {
            id: message.id,
            aggregate_id: message.aggregate_id,
            event_type: message.event_type,
            payload,
            retries: message.retries,
            max_retries: message.max_retries,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}
