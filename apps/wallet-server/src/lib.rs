// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Server - wallet management backend
//!
//! Wallets are created, updated and deleted through a saga that keeps the
//! local database, the remote transaction service and the integration events
//! consistent. Events are written to a transactional outbox in the same
//! database transaction as the wallet row and relayed to AMQP in the
//! background.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token extraction and JWT verification
//! - `grpc` - gRPC wallet service for internal callers
//! - `outbox` - Outbox relay, cleanup sweeper and AMQP broker
//! - `remote` - gRPC client of the transaction service
//! - `service` - Wallet saga orchestrator and wallet type catalogue
//! - `storage` - redb tables, transactions and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod models;
pub mod outbox;
pub mod remote;
pub mod service;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
