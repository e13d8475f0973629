// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Message broker abstraction and its AMQP 0-9-1 implementation.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("broker refused message {message_id}")]
    Rejected { message_id: String },

    #[error("broker did not confirm within {0:?}")]
    Timeout(Duration),
}

/// Destination for integration events.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish `body` to `exchange` under `routing_key`. Returns once the
    /// broker has accepted the message.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message_id: &str,
        body: &[u8],
    ) -> Result<(), PublishError>;
}

struct AmqpState {
    connection: Option<Connection>,
    declared: HashSet<String>,
}

/// [`MessageBroker`] backed by a RabbitMQ-compatible server.
///
/// The connection is opened on first use and re-opened after it drops.
/// Each publish runs on its own short-lived channel with publisher confirms.
pub struct AmqpBroker {
    url: String,
    state: Mutex<AmqpState>,
}

impl AmqpBroker {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Mutex::new(AmqpState {
                connection: None,
                declared: HashSet::new(),
            }),
        }
    }

    async fn open_channel(&self, exchange: &str) -> Result<Channel, PublishError> {
        let mut state = self.state.lock().await;

        let connected = state
            .connection
            .as_ref()
            .is_some_and(|c| c.status().connected());
        if !connected {
            let connection = Connection::connect(&self.url, ConnectionProperties::default())
                .await
                .map_err(|e| PublishError::Connection(e.to_string()))?;
            tracing::info!("Connected to message broker");
            state.connection = Some(connection);
        }

        let connection = state
            .connection
            .as_ref()
            .ok_or_else(|| PublishError::Connection("no broker connection".to_string()))?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        if !state.declared.contains(exchange) {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Topic,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
            state.declared.insert(exchange.to_string());
            tracing::info!(exchange, "Declared outbox exchange");
        }

        Ok(channel)
    }

    /// Close the broker connection, if one is open.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(connection) = state.connection.take() {
            if let Err(e) = connection.close(200, "shutdown").await {
                tracing::warn!(error = %e, "Failed to close broker connection");
            }
        }
    }
}

#[async_trait]
impl MessageBroker for AmqpBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message_id: &str,
        body: &[u8],
    ) -> Result<(), PublishError> {
        let channel = self.open_channel(exchange).await?;

        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into())
            .with_message_id(message_id.into());

        let confirmation = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await?
            .await?;

        if let Err(e) = channel.close(200, "published").await {
            tracing::debug!(error = %e, "Failed to close publish channel");
        }

        match confirmation {
            Confirmation::Nack(_) => Err(PublishError::Rejected {
                message_id: message_id.to_string(),
            }),
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
        }
    }
}
