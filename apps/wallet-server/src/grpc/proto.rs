// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Messages of `wallet.WalletService` and the generated stubs.

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetWalletOptions {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UserId {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WalletId {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Wallet {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub user_id: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub number: String,
    #[prost(double, tag = "5")]
    pub balance: f64,
    #[prost(string, tag = "6")]
    pub wallet_type_id: String,
    /// Wallet kind, e.g. `bank`; empty if the type no longer exists
    #[prost(string, tag = "7")]
    pub wallet_type: String,
    #[prost(string, tag = "8")]
    pub wallet_type_name: String,
    /// RFC 3339
    #[prost(string, tag = "9")]
    pub created_at: String,
    /// RFC 3339
    #[prost(string, tag = "10")]
    pub updated_at: String,
}

include!(concat!(env!("OUT_DIR"), "/wallet.WalletService.rs"));
