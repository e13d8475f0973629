// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! tonic client for `transaction.TransactionService`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tonic::client::Grpc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use uuid::Uuid;

use super::proto::{
    NewTransaction, Transaction, TransactionId, CREATE_TRANSACTION_PATH, DELETE_TRANSACTION_PATH,
};
use super::{DepositId, RemoteCallError, TransactionClient};

/// Category the transaction service files opening balances under.
pub const INITIAL_DEPOSIT_CATEGORY_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Description attached to opening-balance deposits.
pub const INITIAL_DEPOSIT_DESCRIPTION: &str = "Deposit awal";

const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// [`TransactionClient`] over a lazily connected gRPC channel.
#[derive(Clone)]
pub struct GrpcTransactionClient {
    inner: Grpc<Channel>,
    call_timeout: Duration,
}

impl GrpcTransactionClient {
    /// Build a client for `addr` (e.g. `http://transaction:50051`).
    ///
    /// No connection is made until the first call, so the wallet service can
    /// start while the transaction service is still coming up.
    pub fn connect_lazy(addr: &str, call_timeout: Duration) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(addr.to_string())?
            .http2_keep_alive_interval(Duration::from_secs(10))
            .keep_alive_timeout(Duration::from_secs(3))
            .keep_alive_while_idle(true)
            .timeout(call_timeout)
            .connect_lazy();

        let inner = Grpc::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE);

        Ok(Self {
            inner,
            call_timeout,
        })
    }

    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp, RemoteCallError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| RemoteCallError::Transient(format!("channel not ready: {e}")))?;

        let mut request = tonic::Request::new(message);
        request.set_timeout(self.call_timeout);

        let codec = tonic_prost::ProstCodec::<Req, Resp>::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
            .map_err(|status| classify(status, self.call_timeout))?;

        Ok(response.into_inner())
    }
}

/// Split gRPC failures into ones a caller may retry and ones it may not.
fn classify(status: Status, call_timeout: Duration) -> RemoteCallError {
    match status.code() {
        Code::DeadlineExceeded => RemoteCallError::Timeout(call_timeout),
        Code::Unavailable | Code::ResourceExhausted | Code::Aborted | Code::Unknown => {
            RemoteCallError::Transient(status.message().to_string())
        }
        _ => RemoteCallError::Permanent(format!("{:?}: {}", status.code(), status.message())),
    }
}

#[async_trait]
impl TransactionClient for GrpcTransactionClient {
    async fn create_initial_deposit(
        &self,
        wallet_id: Uuid,
        amount: f64,
    ) -> Result<DepositId, RemoteCallError> {
        let request = NewTransaction {
            wallet_id: wallet_id.to_string(),
            amount,
            category_id: INITIAL_DEPOSIT_CATEGORY_ID.to_string(),
            transaction_date: Utc::now().to_rfc3339(),
            description: INITIAL_DEPOSIT_DESCRIPTION.to_string(),
        };

        let transaction: Transaction = self.unary(CREATE_TRANSACTION_PATH, request).await?;
        if transaction.id.is_empty() {
            return Err(RemoteCallError::Permanent(
                "transaction service returned an empty deposit id".to_string(),
            ));
        }

        tracing::debug!(%wallet_id, deposit_id = %transaction.id, "Initial deposit recorded");
        Ok(DepositId::new(transaction.id))
    }

    async fn cancel_initial_deposit(&self, deposit_id: &DepositId) -> Result<(), RemoteCallError> {
        let request = TransactionId {
            id: deposit_id.as_str().to_string(),
        };
        let _: Transaction = self.unary(DELETE_TRANSACTION_PATH, request).await?;

        tracing::debug!(%deposit_id, "Initial deposit cancelled");
        Ok(())
    }
}
