// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fakes for the external collaborators, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AuthError, TokenVerifier, VerifiedIdentity};
use crate::outbox::{MessageBroker, PublishError};
use crate::remote::{DepositId, RemoteCallError, TransactionClient};
use crate::service::{WalletService, WalletTypeService};
use crate::state::AppState;
use crate::storage::{
    NewOutboxMessage, OutboxMessage, OutboxRepository, OutboxStore, StoreError, StoreResult,
    Transaction, TxManager, WalletDatabase, WalletRepository, WalletTypeRepository,
};

// =============================================================================
// Transaction service
// =============================================================================

#[derive(Debug, Clone)]
pub enum DepositBehavior {
    Succeed,
    Fail(RemoteCallError),
    /// Never answer within the caller's timeout
    Hang,
}

/// Scriptable [`TransactionClient`] recording every call.
pub struct FakeTransactionClient {
    behavior: Mutex<DepositBehavior>,
    fail_cancel: AtomicBool,
    next_id: AtomicUsize,
    deposits: Mutex<Vec<(Uuid, f64)>>,
    cancelled: Mutex<Vec<DepositId>>,
}

impl Default for FakeTransactionClient {
    fn default() -> Self {
        Self {
            behavior: Mutex::new(DepositBehavior::Succeed),
            fail_cancel: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
            deposits: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }
}

impl FakeTransactionClient {
    pub fn set_behavior(&self, behavior: DepositBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub fn deposits(&self) -> Vec<(Uuid, f64)> {
        self.deposits.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<DepositId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionClient for FakeTransactionClient {
    async fn create_initial_deposit(
        &self,
        wallet_id: Uuid,
        amount: f64,
    ) -> Result<DepositId, RemoteCallError> {
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            DepositBehavior::Succeed => {
                self.deposits.lock().unwrap().push((wallet_id, amount));
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(DepositId::new(format!("D{n}")))
            }
            DepositBehavior::Fail(e) => Err(e),
            DepositBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RemoteCallError::Transient("hung".to_string()))
            }
        }
    }

    async fn cancel_initial_deposit(&self, deposit_id: &DepositId) -> Result<(), RemoteCallError> {
        self.cancelled.lock().unwrap().push(deposit_id.clone());
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(RemoteCallError::Transient("cancel refused".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Message broker
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub message_id: String,
    pub body: Vec<u8>,
}

/// [`MessageBroker`] that keeps accepted messages in memory.
#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<PublishedMessage>>,
    fail_all: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
}

impl RecordingBroker {
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_routing_key(&self, routing_key: &str) {
        self.failing_keys
            .lock()
            .unwrap()
            .insert(routing_key.to_string());
    }
}

#[async_trait]
impl MessageBroker for RecordingBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message_id: &str,
        body: &[u8],
    ) -> Result<(), PublishError> {
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_keys.lock().unwrap().contains(routing_key)
        {
            return Err(PublishError::Connection("broker unreachable".to_string()));
        }

        self.published.lock().unwrap().push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            message_id: message_id.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }
}

/// [`MessageBroker`] that never answers.
#[derive(Default)]
pub struct StalledBroker {
    attempts: AtomicUsize,
}

impl StalledBroker {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBroker for StalledBroker {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        _message_id: &str,
        _body: &[u8],
    ) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(PublishError::Connection("stalled".to_string()))
    }
}

// =============================================================================
// Token verifier
// =============================================================================

/// [`TokenVerifier`] with a fixed token → user table.
#[derive(Default)]
pub struct StaticVerifier {
    users: HashMap<String, Uuid>,
}

impl StaticVerifier {
    pub fn with_user(mut self, token: &str, user_id: Uuid) -> Self {
        self.users.insert(token.to_string(), user_id);
        self
    }
}

impl TokenVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let subject_id = *self.users.get(token).ok_or(AuthError::InvalidSignature)?;
        Ok(VerifiedIdentity {
            subject_id,
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
        })
    }
}

// =============================================================================
// Fault-injecting outbox
// =============================================================================

/// [`OutboxStore`] wrapper that fails selected operations on demand.
pub struct FailingOutbox {
    inner: Arc<dyn OutboxStore>,
    fail_create: AtomicBool,
    fail_mark: AtomicBool,
}

impl FailingOutbox {
    pub fn new(inner: Arc<dyn OutboxStore>) -> Self {
        Self {
            inner,
            fail_create: AtomicBool::new(false),
            fail_mark: AtomicBool::new(false),
        }
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_as_published(&self, fail: bool) {
        self.fail_mark.store(fail, Ordering::SeqCst);
    }

    fn injected() -> StoreError {
        StoreError::NotFound("injected outbox failure".to_string())
    }
}

#[async_trait]
impl OutboxStore for FailingOutbox {
    fn create(&self, tx: &Transaction, message: NewOutboxMessage) -> StoreResult<OutboxMessage> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create(tx, message)
    }

    fn get_pending_messages(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>> {
        self.inner.get_pending_messages(limit)
    }

    async fn mark_as_published(&self, id: u64) -> StoreResult<()> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.mark_as_published(id).await
    }

    async fn increment_retries(&self, id: u64) -> StoreResult<u32> {
        self.inner.increment_retries(id).await
    }

    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.inner.delete_published_before(cutoff).await
    }

    fn list_dead_lettered(&self, limit: usize) -> StoreResult<Vec<OutboxMessage>> {
        self.inner.list_dead_lettered(limit)
    }

    async fn requeue_dead_lettered(&self, id: u64) -> StoreResult<OutboxMessage> {
        self.inner.requeue_dead_lettered(id).await
    }

    fn get(&self, id: u64) -> StoreResult<Option<OutboxMessage>> {
        self.inner.get(id)
    }
}

// =============================================================================
// Fault-injecting transactions
// =============================================================================

/// [`TxManager`] whose transactions fail to commit while the flag is set.
pub struct FailingCommits {
    db: Arc<WalletDatabase>,
    fail: AtomicBool,
}

impl FailingCommits {
    pub fn new(db: Arc<WalletDatabase>) -> Self {
        Self {
            db,
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TxManager for FailingCommits {
    async fn begin(&self) -> StoreResult<Transaction> {
        let tx = self.db.begin().await?;
        if self.fail.load(Ordering::SeqCst) {
            return Ok(tx.fail_on_commit());
        }
        Ok(tx)
    }
}

// =============================================================================
// HTTP state
// =============================================================================

pub const TEST_TOKEN: &str = "test-token";

/// Fully wired [`AppState`] over an in-memory database.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<WalletDatabase>,
    pub outbox: Arc<OutboxRepository>,
    pub client: Arc<FakeTransactionClient>,
    pub user_id: Uuid,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(WalletDatabase::in_memory().unwrap());
        let wallets = Arc::new(WalletRepository::new(db.clone()));
        let wallet_types = Arc::new(WalletTypeRepository::new(db.clone()));
        let outbox = Arc::new(OutboxRepository::new(db.clone()));
        let client = Arc::new(FakeTransactionClient::default());
        let user_id = Uuid::new_v4();

        let wallet_service = WalletService::new(
            db.clone(),
            wallets.clone(),
            wallet_types.clone(),
            outbox.clone(),
            client.clone(),
            Arc::new(StaticVerifier::default().with_user(TEST_TOKEN, user_id)),
        );
        let wallet_type_service = WalletTypeService::new(db.clone(), wallet_types, wallets);

        Self {
            state: AppState::new(wallet_service, wallet_type_service, outbox.clone(), db.clone()),
            db,
            outbox,
            client,
            user_id,
        }
    }
}
