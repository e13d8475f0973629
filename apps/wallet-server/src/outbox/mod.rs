// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Outbox Delivery
//!
//! Background side of the transactional outbox:
//!
//! - [`OutboxRelay`] polls pending rows and publishes them to the broker,
//!   oldest first, one message at a time.
//! - [`OutboxSweeper`] deletes published rows once their retention elapsed.
//!
//! Both run as independent tokio tasks and stop on the shared
//! `CancellationToken`. Every store write they issue is a single atomic
//! transaction, so cancelling a pass midway never leaves a row half updated.

pub mod broker;
pub mod cleanup;
pub mod relay;

pub use broker::{AmqpBroker, MessageBroker, PublishError};
pub use cleanup::{OutboxSweeper, SweeperConfig};
pub use relay::{OutboxRelay, RelayConfig, RelayReport};

/// Default exchange integration events are published to.
pub const DEFAULT_EXCHANGE: &str = "refina_microservice";
