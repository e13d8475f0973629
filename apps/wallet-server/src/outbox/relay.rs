// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Outbox Relay
//!
//! Every `interval` (default 5 s) the relay:
//! 1. Reads up to `batch_size` pending rows, oldest first.
//! 2. Publishes each one with its `event_type` as routing key and the stored
//!    payload as body.
//! 3. Marks the row published on success, or bumps its retry counter on
//!    failure. A row that reaches `max_retries` is dead-lettered and reported
//!    with `alert = "outbox_retry_exhausted"`.
//!
//! One failing message never stops the rest of the batch. Each publish is
//! bounded by `publish_timeout`; an unanswered publish counts as a failed
//! attempt. Delivery is at-least-once: if marking fails after a successful
//! publish, or shutdown interrupts a pass between publish and mark, the
//! message is published again later.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::broker::{MessageBroker, PublishError};
use super::DEFAULT_EXCHANGE;
use crate::storage::{OutboxMessage, OutboxStore};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub exchange: String,
    pub interval: Duration,
    pub batch_size: usize,
    /// Upper bound for one broker publish, connection setup included
    pub publish_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

/// Outcome of one relay pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub published: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// Publishes pending outbox rows to the message broker.
pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    broker: Arc<dyn MessageBroker>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        broker: Arc<dyn MessageBroker>,
        config: RelayConfig,
    ) -> Self {
        Self {
            store,
            broker,
            config,
        }
    }

    /// Run the relay loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(relay.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            exchange = %self.config.exchange,
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Outbox relay starting"
        );

        loop {
            let report = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Outbox relay shutting down");
                    return;
                }
                report = self.relay_batch() => report,
            };

            if report != RelayReport::default() {
                info!(
                    published = report.published,
                    failed = report.failed,
                    dead_lettered = report.dead_lettered,
                    "Outbox relay pass complete"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Outbox relay shutting down");
                    return;
                }
            }
        }
    }

    /// Publish one batch of pending messages.
    pub async fn relay_batch(&self) -> RelayReport {
        let mut report = RelayReport::default();

        let batch = match self.store.get_pending_messages(self.config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Outbox relay: failed to load pending messages");
                return report;
            }
        };

        for message in &batch {
            self.relay_message(message, &mut report).await;
        }

        report
    }

    async fn relay_message(&self, message: &OutboxMessage, report: &mut RelayReport) {
        let message_id = message.id.to_string();
        let timeout = self.config.publish_timeout;
        let publish = self.broker.publish(
            &self.config.exchange,
            &message.event_type,
            &message_id,
            &message.payload,
        );
        let published = match tokio::time::timeout(timeout, publish).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PublishError::Timeout(timeout)),
        };

        match published {
            Ok(()) => {
                report.published += 1;
                if let Err(e) = self.store.mark_as_published(message.id).await {
                    // Stays pending and is published again next tick
                    warn!(
                        outbox_id = message.id,
                        error = %e,
                        "Outbox relay: published but failed to mark message"
                    );
                } else {
                    debug!(
                        outbox_id = message.id,
                        event_type = %message.event_type,
                        "Outbox message published"
                    );
                }
            }
            Err(publish_error) => {
                report.failed += 1;
                let retries = match self.store.increment_retries(message.id).await {
                    Ok(retries) => retries,
                    Err(e) => {
                        warn!(
                            outbox_id = message.id,
                            error = %e,
                            "Outbox relay: failed to record retry"
                        );
                        return;
                    }
                };

                if retries >= message.max_retries {
                    report.dead_lettered += 1;
                    error!(
                        alert = "outbox_retry_exhausted",
                        outbox_id = message.id,
                        aggregate_id = %message.aggregate_id,
                        event_type = %message.event_type,
                        retries,
                        error = %publish_error,
                        "Outbox message exhausted its retries and will not be relayed again"
                    );
                } else {
                    warn!(
                        outbox_id = message.id,
                        event_type = %message.event_type,
                        retries,
                        max_retries = message.max_retries,
                        error = %publish_error,
                        "Outbox relay: publish failed, will retry"
                    );
                }
            }
        }
    }
}
