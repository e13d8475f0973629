// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Protobuf messages of `transaction.TransactionService`.
//!
//! Declared directly with prost derives (standard protobuf wire format), so no
//! `.proto` compilation step is needed for the two RPCs this service calls.

/// Fully qualified method paths.
pub const CREATE_TRANSACTION_PATH: &str = "/transaction.TransactionService/CreateTransaction";
pub const DELETE_TRANSACTION_PATH: &str = "/transaction.TransactionService/DeleteTransaction";

#[derive(Clone, PartialEq, prost::Message)]
pub struct NewTransaction {
    #[prost(string, tag = "1")]
    pub wallet_id: String,
    #[prost(double, tag = "2")]
    pub amount: f64,
    #[prost(string, tag = "3")]
    pub category_id: String,
    /// RFC 3339
    #[prost(string, tag = "4")]
    pub transaction_date: String,
    #[prost(string, tag = "5")]
    pub description: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionId {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Transaction {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub wallet_id: String,
    #[prost(string, tag = "3")]
    pub category_id: String,
    #[prost(double, tag = "4")]
    pub amount: f64,
    #[prost(string, tag = "5")]
    pub transaction_date: String,
    #[prost(string, tag = "6")]
    pub description: String,
}
