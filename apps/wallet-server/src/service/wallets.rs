// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Service
//!
//! Wallet mutations run as small sagas over the local database and the remote
//! transaction service:
//!
//! ```text
//! create:        Validating → RemoteInvoked → TxOpen → LocalMutated → OutboxEnqueued → Committed
//! update/delete: Validating → TxOpen → LocalMutated → OutboxEnqueued → Committed
//!
//! any failure ──▶ RolledBack          (no deposit recorded yet)
//!             └─▶ Compensating ──▶ RolledBack
//! ```
//!
//! Create is the only flow with a remote leg. The wallet id is assigned up
//! front and the opening balance is recorded as an initial deposit *before*
//! the local transaction opens, so a slow transaction service never holds the
//! database writer slot. If the insert, the enqueue or the commit then fails,
//! the local transaction is rolled back and the deposit is cancelled once,
//! best-effort. Update and delete skip the remote leg.
//!
//! The outbox event is written in the same transaction as the wallet row, so
//! an event is only ever relayed for a committed wallet.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{validation, WalletError};
use crate::auth::TokenVerifier;
use crate::models::{
    CreateWalletRequest, UpdateWalletRequest, UserWalletsByType, WalletResponse, WalletSummary,
};
use crate::remote::{DepositId, RemoteCallError, TransactionClient};
use crate::storage::{
    NewOutboxMessage, OutboxStore, StoreError, Transaction, TxManager, Wallet, WalletKind,
    WalletStore, WalletType, WalletTypeStore, DEFAULT_MAX_RETRIES,
};

pub const WALLET_CREATED: &str = "wallet.created";
pub const WALLET_UPDATED: &str = "wallet.updated";
pub const WALLET_DELETED: &str = "wallet.deleted";

const DEFAULT_REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Upper bound for each call to the transaction service
    pub remote_call_timeout: Duration,
    /// Retry budget of the outbox events this service enqueues
    pub max_retries: u32,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            remote_call_timeout: DEFAULT_REMOTE_CALL_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    Validating,
    TxOpen,
    LocalMutated,
    RemoteInvoked,
    OutboxEnqueued,
    Committed,
    Compensating,
    RolledBack,
}

impl SagaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Validating => "validating",
            SagaState::TxOpen => "tx_open",
            SagaState::LocalMutated => "local_mutated",
            SagaState::RemoteInvoked => "remote_invoked",
            SagaState::OutboxEnqueued => "outbox_enqueued",
            SagaState::Committed => "committed",
            SagaState::Compensating => "compensating",
            SagaState::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of one saga execution.
struct SagaContext {
    wallet_id: Uuid,
    state: SagaState,
    history: Vec<SagaState>,
    tx: Option<Transaction>,
    /// Deposit to cancel if the saga fails after the remote leg
    deposit: Option<DepositId>,
}

impl SagaContext {
    fn new(wallet_id: Uuid) -> Self {
        Self {
            wallet_id,
            state: SagaState::Validating,
            history: vec![SagaState::Validating],
            tx: None,
            deposit: None,
        }
    }

    fn enter(&mut self, state: SagaState) {
        debug!(wallet_id = %self.wallet_id, from = %self.state, to = %state, "Wallet saga transition");
        self.state = state;
        self.history.push(state);
    }

    fn transaction(&self) -> Result<&Transaction, WalletError> {
        self.tx.as_ref().ok_or_else(|| {
            WalletError::persistence("use transaction for wallet", self.wallet_id)(
                StoreError::TransactionFinished,
            )
        })
    }

    fn take_transaction(&mut self) -> Result<Transaction, WalletError> {
        self.tx.take().ok_or_else(|| {
            WalletError::persistence("commit wallet", self.wallet_id)(StoreError::TransactionFinished)
        })
    }
}

/// Wallet reads and saga-coordinated wallet mutations.
pub struct WalletService {
    tx_manager: Arc<dyn TxManager>,
    wallets: Arc<dyn WalletStore>,
    wallet_types: Arc<dyn WalletTypeStore>,
    outbox: Arc<dyn OutboxStore>,
    transactions: Arc<dyn TransactionClient>,
    verifier: Arc<dyn TokenVerifier>,
    config: SagaConfig,
}

impl WalletService {
    pub fn new(
        tx_manager: Arc<dyn TxManager>,
        wallets: Arc<dyn WalletStore>,
        wallet_types: Arc<dyn WalletTypeStore>,
        outbox: Arc<dyn OutboxStore>,
        transactions: Arc<dyn TransactionClient>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            tx_manager,
            wallets,
            wallet_types,
            outbox,
            transactions,
            verifier,
            config: SagaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a wallet for the token's owner and record its opening balance
    /// with the transaction service.
    pub async fn create_wallet(
        &self,
        token: &str,
        request: CreateWalletRequest,
    ) -> Result<WalletResponse, WalletError> {
        self.execute_create(token, request).await.0
    }

    pub async fn update_wallet(
        &self,
        wallet_id: Uuid,
        request: UpdateWalletRequest,
    ) -> Result<WalletResponse, WalletError> {
        let mut saga = SagaContext::new(wallet_id);
        let result = self.run_update(&mut saga, request).await;
        self.settle(&mut saga, result).await
    }

    /// Delete a wallet. Only wallets with a zero balance can be deleted.
    pub async fn delete_wallet(&self, wallet_id: Uuid) -> Result<WalletResponse, WalletError> {
        let mut saga = SagaContext::new(wallet_id);
        let result = self.run_delete(&mut saga).await;
        self.settle(&mut saga, result).await
    }

    async fn execute_create(
        &self,
        token: &str,
        request: CreateWalletRequest,
    ) -> (Result<WalletResponse, WalletError>, SagaContext) {
        let mut saga = SagaContext::new(Uuid::new_v4());
        let result = self.run_create(&mut saga, token, request).await;
        let result = self.settle(&mut saga, result).await;
        (result, saga)
    }

    async fn run_create(
        &self,
        saga: &mut SagaContext,
        token: &str,
        request: CreateWalletRequest,
    ) -> Result<WalletResponse, WalletError> {
        let identity = self.verifier.verify(token)?;
        validation::create_wallet(&request)?;
        let wallet_type = self.require_wallet_type(request.wallet_type_id)?;

        let now = Utc::now();
        let wallet = Wallet {
            id: saga.wallet_id,
            user_id: identity.subject_id,
            wallet_type_id: wallet_type.id,
            name: request.name.trim().to_string(),
            number: request.number.trim().to_string(),
            balance: request.balance,
            created_at: now,
            updated_at: now,
        };

        // Remote leg runs without the writer slot held
        let deposit = self
            .call_remote(
                "record the initial deposit of wallet",
                wallet.id,
                self.transactions
                    .create_initial_deposit(wallet.id, wallet.balance),
            )
            .await?;
        info!(wallet_id = %wallet.id, deposit_id = %deposit, "Initial deposit recorded");
        saga.deposit = Some(deposit);
        saga.enter(SagaState::RemoteInvoked);

        saga.tx = Some(self.begin(saga.wallet_id).await?);
        saga.enter(SagaState::TxOpen);

        self.wallets
            .create(saga.transaction()?, &wallet)
            .map_err(WalletError::persistence("create wallet", wallet.id))?;
        saga.enter(SagaState::LocalMutated);

        let response = WalletResponse::from_wallet(&wallet, Some(&wallet_type));
        self.enqueue(saga.transaction()?, WALLET_CREATED, &response)?;
        saga.enter(SagaState::OutboxEnqueued);

        saga.take_transaction()?
            .commit()
            .map_err(WalletError::persistence("commit wallet", wallet.id))?;
        saga.enter(SagaState::Committed);

        info!(wallet_id = %wallet.id, user_id = %wallet.user_id, "Wallet created");
        Ok(response)
    }

    async fn run_update(
        &self,
        saga: &mut SagaContext,
        request: UpdateWalletRequest,
    ) -> Result<WalletResponse, WalletError> {
        validation::update_wallet(&request)?;
        let mut wallet = self.require_wallet(saga.wallet_id)?;
        let wallet_type = match request.wallet_type_id {
            Some(id) if id != wallet.wallet_type_id => Some(self.require_wallet_type(id)?),
            _ => self.find_wallet_type(wallet.wallet_type_id)?,
        };

        saga.tx = Some(self.begin(saga.wallet_id).await?);
        saga.enter(SagaState::TxOpen);

        if let Some(id) = request.wallet_type_id {
            wallet.wallet_type_id = id;
        }
        wallet.name = request.name.trim().to_string();
        wallet.number = request.number.trim().to_string();
        wallet.balance = request.balance;
        wallet.updated_at = Utc::now();
        self.wallets
            .update(saga.transaction()?, &wallet)
            .map_err(wallet_store_error("update wallet", wallet.id))?;
        saga.enter(SagaState::LocalMutated);

        let response = WalletResponse::from_wallet(&wallet, wallet_type.as_ref());
        self.enqueue(saga.transaction()?, WALLET_UPDATED, &response)?;
        saga.enter(SagaState::OutboxEnqueued);

        saga.take_transaction()?
            .commit()
            .map_err(WalletError::persistence("commit wallet", wallet.id))?;
        saga.enter(SagaState::Committed);

        info!(wallet_id = %wallet.id, "Wallet updated");
        Ok(response)
    }

    async fn run_delete(&self, saga: &mut SagaContext) -> Result<WalletResponse, WalletError> {
        let wallet = self.require_wallet(saga.wallet_id)?;
        ensure_empty(&wallet)?;

        saga.tx = Some(self.begin(saga.wallet_id).await?);
        saga.enter(SagaState::TxOpen);

        let removed = self
            .wallets
            .delete(saga.transaction()?, wallet.id)
            .map_err(wallet_store_error("delete wallet", wallet.id))?;
        // Re-checked under the write lock: the balance may have changed since the read
        ensure_empty(&removed)?;
        saga.enter(SagaState::LocalMutated);

        let wallet_type = self.find_wallet_type(removed.wallet_type_id)?;
        let response = WalletResponse::from_wallet(&removed, wallet_type.as_ref());
        self.enqueue(saga.transaction()?, WALLET_DELETED, &response)?;
        saga.enter(SagaState::OutboxEnqueued);

        saga.take_transaction()?
            .commit()
            .map_err(WalletError::persistence("commit wallet", removed.id))?;
        saga.enter(SagaState::Committed);

        info!(wallet_id = %removed.id, "Wallet deleted");
        Ok(response)
    }

    /// Pass a successful result through, or roll the saga back.
    async fn settle<T>(
        &self,
        saga: &mut SagaContext,
        result: Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.roll_back(saga, &e).await;
                Err(e)
            }
        }
    }

    async fn roll_back(&self, saga: &mut SagaContext, cause: &WalletError) {
        let failed_at = saga.state;

        if let Some(tx) = saga.tx.take() {
            if let Err(e) = tx.rollback() {
                warn!(wallet_id = %saga.wallet_id, error = %e, "Failed to roll back wallet transaction");
            }
        }

        if let Some(deposit) = saga.deposit.take() {
            saga.enter(SagaState::Compensating);
            let cancelled = self
                .call_remote(
                    "cancel the initial deposit of wallet",
                    saga.wallet_id,
                    self.transactions.cancel_initial_deposit(&deposit),
                )
                .await;

            match cancelled {
                Ok(()) => info!(
                    wallet_id = %saga.wallet_id,
                    deposit_id = %deposit,
                    "Initial deposit cancelled"
                ),
                Err(e) => error!(
                    alert = "deposit_compensation_failed",
                    wallet_id = %saga.wallet_id,
                    deposit_id = %deposit,
                    error = ?e,
                    "Failed to cancel initial deposit, manual reconciliation required"
                ),
            }
        }

        saga.enter(SagaState::RolledBack);
        if failed_at == SagaState::Validating {
            debug!(wallet_id = %saga.wallet_id, error = %cause, "Wallet request rejected");
        } else {
            warn!(
                wallet_id = %saga.wallet_id,
                failed_at = %failed_at,
                error = ?cause,
                "Wallet saga rolled back"
            );
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_all_wallets(&self) -> Result<Vec<WalletResponse>, WalletError> {
        let wallets = self
            .wallets
            .list_all()
            .map_err(WalletError::persistence("list wallets", "all"))?;
        self.to_responses(&wallets)
    }

    pub fn get_wallet_by_id(&self, wallet_id: Uuid) -> Result<WalletResponse, WalletError> {
        let wallet = self.require_wallet(wallet_id)?;
        let wallet_type = self.find_wallet_type(wallet.wallet_type_id)?;
        Ok(WalletResponse::from_wallet(&wallet, wallet_type.as_ref()))
    }

    /// Wallets owned by the token's subject.
    pub fn get_wallets_by_user(&self, token: &str) -> Result<Vec<WalletResponse>, WalletError> {
        let identity = self.verifier.verify(token)?;
        self.get_wallets_by_user_id(identity.subject_id)
    }

    /// Wallets owned by `user_id`, for trusted internal callers.
    pub fn get_wallets_by_user_id(&self, user_id: Uuid) -> Result<Vec<WalletResponse>, WalletError> {
        let wallets = self
            .wallets
            .list_by_user(user_id)
            .map_err(WalletError::persistence("list wallets of user", user_id))?;
        self.to_responses(&wallets)
    }

    /// Wallets owned by the token's subject, grouped by wallet kind. Groups
    /// without wallets are omitted.
    pub fn get_wallets_by_user_grouped_by_type(
        &self,
        token: &str,
    ) -> Result<Vec<UserWalletsByType>, WalletError> {
        let identity = self.verifier.verify(token)?;
        let wallets = self
            .wallets
            .list_by_user(identity.subject_id)
            .map_err(WalletError::persistence("list wallets of user", identity.subject_id))?;
        let types = self.wallet_type_index()?;

        let mut groups: BTreeMap<WalletKind, Vec<WalletSummary>> = BTreeMap::new();
        for wallet in wallets {
            let kind = types
                .get(&wallet.wallet_type_id)
                .map(|t| t.kind)
                .unwrap_or(WalletKind::Others);
            groups.entry(kind).or_default().push(WalletSummary {
                id: wallet.id,
                name: wallet.name,
                number: wallet.number,
                balance: wallet.balance,
            });
        }

        Ok(groups
            .into_iter()
            .map(|(kind, wallets)| UserWalletsByType {
                user_id: identity.subject_id,
                kind,
                wallets,
            })
            .collect())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn begin(&self, wallet_id: Uuid) -> Result<Transaction, WalletError> {
        self.tx_manager
            .begin()
            .await
            .map_err(WalletError::persistence("open transaction for wallet", wallet_id))
    }

    /// Run a transaction service call under the configured timeout.
    async fn call_remote<T>(
        &self,
        operation: &'static str,
        wallet_id: Uuid,
        call: impl Future<Output = Result<T, RemoteCallError>>,
    ) -> Result<T, WalletError> {
        let timeout = self.config.remote_call_timeout;
        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RemoteCallError::Timeout(timeout)),
        };

        outcome.map_err(|source| WalletError::RemoteCall {
            operation,
            entity_id: wallet_id.to_string(),
            source,
        })
    }

    fn enqueue(
        &self,
        tx: &Transaction,
        event_type: &'static str,
        response: &WalletResponse,
    ) -> Result<(), WalletError> {
        let payload = serde_json::to_vec(response)
            .map_err(|e| WalletError::persistence("serialize event of wallet", response.id)(e.into()))?;
        let message = NewOutboxMessage::new(response.id, event_type, payload)
            .with_max_retries(self.config.max_retries);

        let row = self
            .outbox
            .create(tx, message)
            .map_err(WalletError::persistence("enqueue event of wallet", response.id))?;
        debug!(outbox_id = row.id, event_type, wallet_id = %response.id, "Outbox event enqueued");
        Ok(())
    }

    fn require_wallet(&self, wallet_id: Uuid) -> Result<Wallet, WalletError> {
        self.wallets
            .get(wallet_id)
            .map_err(WalletError::persistence("load wallet", wallet_id))?
            .ok_or(WalletError::NotFound {
                entity: "Wallet",
                id: wallet_id,
            })
    }

    fn find_wallet_type(&self, wallet_type_id: Uuid) -> Result<Option<WalletType>, WalletError> {
        self.wallet_types
            .get(wallet_type_id)
            .map_err(WalletError::persistence("load wallet type", wallet_type_id))
    }

    fn require_wallet_type(&self, wallet_type_id: Uuid) -> Result<WalletType, WalletError> {
        self.find_wallet_type(wallet_type_id)?
            .ok_or(WalletError::NotFound {
                entity: "Wallet type",
                id: wallet_type_id,
            })
    }

    fn wallet_type_index(&self) -> Result<HashMap<Uuid, WalletType>, WalletError> {
        let types = self
            .wallet_types
            .list_all()
            .map_err(WalletError::persistence("list wallet types", "all"))?;
        Ok(types.into_iter().map(|t| (t.id, t)).collect())
    }

    fn to_responses(&self, wallets: &[Wallet]) -> Result<Vec<WalletResponse>, WalletError> {
        let types = self.wallet_type_index()?;
        Ok(wallets
            .iter()
            .map(|w| WalletResponse::from_wallet(w, types.get(&w.wallet_type_id)))
            .collect())
    }
}

fn ensure_empty(wallet: &Wallet) -> Result<(), WalletError> {
    if wallet.balance != 0.0 {
        return Err(WalletError::InvalidState(format!(
            "Wallet {} still holds a balance of {:.2} and cannot be deleted",
            wallet.id, wallet.balance
        )));
    }
    Ok(())
}

/// Like [`WalletError::persistence`], but a missing row is reported as
/// `NotFound` (the wallet was deleted concurrently).
fn wallet_store_error(
    operation: &'static str,
    wallet_id: Uuid,
) -> impl FnOnce(StoreError) -> WalletError {
    move |e| match e {
        StoreError::NotFound(_) => WalletError::NotFound {
            entity: "Wallet",
            id: wallet_id,
        },
        other => WalletError::persistence(operation, wallet_id)(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::{OutboxRelay, RelayConfig};
    use crate::storage::{
        OutboxMessage, OutboxRepository, WalletDatabase, WalletRepository, WalletTypeRepository,
    };
    use crate::testing::{
        DepositBehavior, FailingCommits, FailingOutbox, FakeTransactionClient, RecordingBroker,
        StaticVerifier,
    };

    const TOKEN: &str = "token-a";

    struct Fixture {
        db: Arc<WalletDatabase>,
        wallets: Arc<WalletRepository>,
        outbox: Arc<OutboxRepository>,
        faulty_outbox: Arc<FailingOutbox>,
        client: Arc<FakeTransactionClient>,
        user_id: Uuid,
        bank: WalletType,
        cash: WalletType,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Arc::new(WalletDatabase::in_memory().unwrap());
            let wallet_types = WalletTypeRepository::new(db.clone());
            let outbox = Arc::new(OutboxRepository::new(db.clone()));

            let bank = wallet_type("BCA", WalletKind::Bank);
            let cash = wallet_type("Cash", WalletKind::Physical);
            let tx = db.begin().await.unwrap();
            wallet_types.create(&tx, &bank).unwrap();
            wallet_types.create(&tx, &cash).unwrap();
            tx.commit().unwrap();

            Self {
                wallets: Arc::new(WalletRepository::new(db.clone())),
                faulty_outbox: Arc::new(FailingOutbox::new(outbox.clone())),
                outbox,
                client: Arc::new(FakeTransactionClient::default()),
                user_id: Uuid::new_v4(),
                bank,
                cash,
                db,
            }
        }

        fn service(&self) -> WalletService {
            self.service_with(self.db.clone())
        }

        fn service_with(&self, tx_manager: Arc<dyn TxManager>) -> WalletService {
            WalletService::new(
                tx_manager,
                self.wallets.clone(),
                Arc::new(WalletTypeRepository::new(self.db.clone())),
                self.faulty_outbox.clone(),
                self.client.clone(),
                Arc::new(StaticVerifier::default().with_user(TOKEN, self.user_id)),
            )
        }

        fn request(&self, wallet_type: &WalletType, balance: f64) -> CreateWalletRequest {
            CreateWalletRequest {
                wallet_type_id: wallet_type.id,
                name: "Payroll".to_string(),
                number: "0123456789".to_string(),
                balance,
            }
        }

        fn pending(&self) -> Vec<OutboxMessage> {
            self.outbox.get_pending_messages(100).unwrap()
        }
    }

    fn wallet_type(name: &str, kind: WalletKind) -> WalletType {
        let now = Utc::now();
        WalletType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_commits_wallet_and_event_together() {
        let fx = Fixture::new().await;
        let (result, saga) = fx
            .service()
            .execute_create(TOKEN, fx.request(&fx.bank, 100.0))
            .await;
        let created = result.unwrap();

        assert_eq!(
            saga.history,
            vec![
                SagaState::Validating,
                SagaState::RemoteInvoked,
                SagaState::TxOpen,
                SagaState::LocalMutated,
                SagaState::OutboxEnqueued,
                SagaState::Committed,
            ]
        );

        let stored = fx.wallets.get(created.id).unwrap().unwrap();
        assert_eq!(stored.user_id, fx.user_id);
        assert_eq!(stored.balance, 100.0);
        assert_eq!(fx.client.deposits(), vec![(created.id, 100.0)]);

        let pending = fx.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, WALLET_CREATED);
        assert_eq!(pending[0].aggregate_id, created.id);
        assert!(!pending[0].published);
        let payload: WalletResponse = serde_json::from_slice(&pending[0].payload).unwrap();
        assert_eq!(payload, created);
        assert_eq!(payload.wallet_type, Some(WalletKind::Bank));
    }

    #[tokio::test]
    async fn created_event_is_relayed_and_marked_published() {
        let fx = Fixture::new().await;
        let created = fx
            .service()
            .create_wallet(TOKEN, fx.request(&fx.bank, 100.0))
            .await
            .unwrap();
        assert_eq!(fx.client.deposits().len(), 1);

        let broker = Arc::new(RecordingBroker::default());
        let relay = OutboxRelay::new(fx.outbox.clone(), broker.clone(), RelayConfig::default());
        assert_eq!(relay.relay_batch().await.published, 1);

        let sent = broker.published();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].routing_key, WALLET_CREATED);
        let body: WalletResponse = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(body.id, created.id);

        assert!(fx.pending().is_empty());
        let row = fx.outbox.get(sent[0].message_id.parse().unwrap()).unwrap().unwrap();
        assert!(row.published);
    }

    #[tokio::test]
    async fn remote_failure_leaves_no_wallet_and_no_event() {
        let fx = Fixture::new().await;
        fx.client.set_behavior(DepositBehavior::Fail(RemoteCallError::Permanent(
            "category missing".to_string(),
        )));

        let (result, saga) = fx
            .service()
            .execute_create(TOKEN, fx.request(&fx.bank, 100.0))
            .await;

        assert!(matches!(result, Err(WalletError::RemoteCall { .. })));
        assert!(fx.wallets.list_all().unwrap().is_empty());
        assert!(fx.pending().is_empty());
        assert!(fx.client.cancelled().is_empty(), "nothing to compensate");
        assert!(!saga.history.contains(&SagaState::Compensating));
        assert_eq!(saga.state, SagaState::RolledBack);
    }

    #[tokio::test]
    async fn remote_timeout_aborts_before_commit() {
        let fx = Fixture::new().await;
        fx.client.set_behavior(DepositBehavior::Hang);
        let service = fx.service().with_config(SagaConfig {
            remote_call_timeout: Duration::from_millis(50),
            ..SagaConfig::default()
        });

        let result = service
            .create_wallet(TOKEN, fx.request(&fx.bank, 50.0))
            .await;

        match result {
            Err(WalletError::RemoteCall { source, .. }) => {
                assert_eq!(source, RemoteCallError::Timeout(Duration::from_millis(50)))
            }
            other => panic!("expected a remote timeout, got {other:?}"),
        }
        assert!(fx.wallets.list_all().unwrap().is_empty());
        assert!(fx.pending().is_empty());
        assert!(fx.outbox.list_dead_lettered(10).unwrap().is_empty());
        assert!(fx.client.cancelled().is_empty());
    }

    #[tokio::test]
    async fn outbox_failure_after_deposit_cancels_it_exactly_once() {
        let fx = Fixture::new().await;
        fx.faulty_outbox.fail_create(true);

        let (result, saga) = fx
            .service()
            .execute_create(TOKEN, fx.request(&fx.bank, 100.0))
            .await;

        assert!(matches!(result, Err(WalletError::Persistence { .. })));
        assert_eq!(fx.client.cancelled(), vec![DepositId::new("D1")]);
        assert!(fx.wallets.list_all().unwrap().is_empty());
        assert!(fx.pending().is_empty());
        assert_eq!(
            &saga.history[saga.history.len() - 2..],
            &[SagaState::Compensating, SagaState::RolledBack]
        );
    }

    #[tokio::test]
    async fn commit_failure_after_deposit_cancels_it() {
        let fx = Fixture::new().await;
        let commits = Arc::new(FailingCommits::new(fx.db.clone()));
        commits.fail_commit(true);

        let (result, saga) = fx
            .service_with(commits.clone())
            .execute_create(TOKEN, fx.request(&fx.bank, 100.0))
            .await;

        assert!(matches!(
            result,
            Err(WalletError::Persistence {
                operation: "commit wallet",
                ..
            })
        ));
        assert_eq!(fx.client.deposits().len(), 1);
        assert_eq!(fx.client.cancelled(), vec![DepositId::new("D1")]);
        assert!(fx.wallets.list_all().unwrap().is_empty());
        assert!(fx.pending().is_empty());
        assert_eq!(
            &saga.history[saga.history.len() - 3..],
            &[SagaState::OutboxEnqueued, SagaState::Compensating, SagaState::RolledBack]
        );
    }

    #[tokio::test]
    async fn slow_deposit_does_not_hold_the_writer_slot() {
        let fx = Fixture::new().await;
        let service = Arc::new(fx.service());
        let other = service
            .create_wallet(TOKEN, fx.request(&fx.bank, 10.0))
            .await
            .unwrap();
        let other_event = fx.pending()[0].id;

        fx.client.set_behavior(DepositBehavior::Hang);
        let stuck = tokio::spawn({
            let service = service.clone();
            let request = fx.request(&fx.cash, 5.0);
            async move { service.create_wallet(TOKEN, request).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let updated = tokio::time::timeout(
            Duration::from_secs(1),
            service.update_wallet(
                other.id,
                UpdateWalletRequest {
                    name: "Savings".to_string(),
                    number: "999".to_string(),
                    balance: 20.0,
                    wallet_type_id: None,
                },
            ),
        )
        .await
        .expect("update waited on the pending create")
        .unwrap();
        assert_eq!(updated.balance, 20.0);

        tokio::time::timeout(Duration::from_secs(1), fx.outbox.mark_as_published(other_event))
            .await
            .expect("relay bookkeeping waited on the pending create")
            .unwrap();

        assert!(!stuck.is_finished());
        stuck.abort();
        assert_eq!(fx.wallets.list_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_compensation_keeps_the_original_error() {
        let fx = Fixture::new().await;
        fx.faulty_outbox.fail_create(true);
        fx.client.fail_cancel(true);

        let result = fx
            .service()
            .create_wallet(TOKEN, fx.request(&fx.bank, 100.0))
            .await;

        assert!(matches!(
            result,
            Err(WalletError::Persistence {
                operation: "enqueue event of wallet",
                ..
            })
        ));
        assert_eq!(fx.client.cancelled().len(), 1);
        assert!(fx.wallets.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_token_fails_before_any_side_effect() {
        let fx = Fixture::new().await;
        let (result, saga) = fx
            .service()
            .execute_create("forged", fx.request(&fx.bank, 100.0))
            .await;

        assert!(matches!(result, Err(WalletError::Unauthorized(_))));
        assert_eq!(saga.history, vec![SagaState::Validating, SagaState::RolledBack]);
        assert!(fx.client.deposits().is_empty());
    }

    #[tokio::test]
    async fn unknown_wallet_type_and_bad_input_are_rejected() {
        let fx = Fixture::new().await;
        let service = fx.service();

        let mut request = fx.request(&fx.bank, 10.0);
        request.wallet_type_id = Uuid::new_v4();
        assert!(matches!(
            service.create_wallet(TOKEN, request).await,
            Err(WalletError::NotFound { entity: "Wallet type", .. })
        ));

        let mut request = fx.request(&fx.bank, 10.0);
        request.name = String::new();
        assert!(matches!(
            service.create_wallet(TOKEN, request).await,
            Err(WalletError::Validation(_))
        ));

        assert!(fx.client.deposits().is_empty());
    }

    #[tokio::test]
    async fn update_rewrites_fields_and_enqueues_event() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let created = service
            .create_wallet(TOKEN, fx.request(&fx.bank, 100.0))
            .await
            .unwrap();

        let updated = service
            .update_wallet(
                created.id,
                UpdateWalletRequest {
                    name: "Savings".to_string(),
                    number: "999".to_string(),
                    balance: 250.0,
                    wallet_type_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Savings");
        assert_eq!(fx.wallets.get(created.id).unwrap().unwrap().balance, 250.0);

        let events: Vec<_> = fx.pending().into_iter().map(|m| m.event_type).collect();
        assert_eq!(events, vec![WALLET_CREATED, WALLET_UPDATED]);
        // No remote leg on update
        assert_eq!(fx.client.deposits().len(), 1);
    }

    #[tokio::test]
    async fn update_can_move_wallet_to_another_type() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let created = service
            .create_wallet(TOKEN, fx.request(&fx.bank, 0.0))
            .await
            .unwrap();

        let moved = service
            .update_wallet(
                created.id,
                UpdateWalletRequest {
                    name: "Pocket".to_string(),
                    number: String::new(),
                    balance: 0.0,
                    wallet_type_id: Some(fx.cash.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.wallet_type_id, fx.cash.id);
        assert_eq!(moved.wallet_type, Some(WalletKind::Physical));
        assert_eq!(fx.wallets.get(created.id).unwrap().unwrap().wallet_type_id, fx.cash.id);

        let unknown = service
            .update_wallet(
                created.id,
                UpdateWalletRequest {
                    name: "Pocket".to_string(),
                    number: String::new(),
                    balance: 0.0,
                    wallet_type_id: Some(Uuid::new_v4()),
                },
            )
            .await;
        assert!(matches!(unknown, Err(WalletError::NotFound { entity: "Wallet type", .. })));
        assert_eq!(fx.pending().len(), 2);
    }

    #[tokio::test]
    async fn update_of_missing_wallet_is_not_found() {
        let fx = Fixture::new().await;
        let result = fx
            .service()
            .update_wallet(
                Uuid::new_v4(),
                UpdateWalletRequest {
                    name: "Savings".to_string(),
                    number: String::new(),
                    balance: 0.0,
                    wallet_type_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(WalletError::NotFound { entity: "Wallet", .. })));
        assert!(fx.pending().is_empty());
    }

    #[tokio::test]
    async fn delete_with_balance_is_rejected_before_any_transaction() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let created = service
            .create_wallet(TOKEN, fx.request(&fx.bank, 10.0))
            .await
            .unwrap();
        let pending_before = fx.pending();

        let mut saga = SagaContext::new(created.id);
        let result = service.run_delete(&mut saga).await;

        assert!(matches!(result, Err(WalletError::InvalidState(_))));
        assert_eq!(saga.history, vec![SagaState::Validating]);
        assert!(fx.wallets.get(created.id).unwrap().is_some());
        assert_eq!(fx.pending(), pending_before);

        assert!(matches!(
            service.delete_wallet(created.id).await,
            Err(WalletError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn delete_of_empty_wallet_removes_it_with_event() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let created = service
            .create_wallet(TOKEN, fx.request(&fx.cash, 0.0))
            .await
            .unwrap();

        let deleted = service.delete_wallet(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(fx.wallets.get(created.id).unwrap().is_none());

        let last = fx.pending().pop().unwrap();
        assert_eq!(last.event_type, WALLET_DELETED);
        assert_eq!(last.aggregate_id, created.id);
    }

    #[tokio::test]
    async fn reads_resolve_owner_and_group_by_kind() {
        let fx = Fixture::new().await;
        let service = fx.service();
        service
            .create_wallet(TOKEN, fx.request(&fx.cash, 5.0))
            .await
            .unwrap();
        service
            .create_wallet(TOKEN, fx.request(&fx.bank, 7.0))
            .await
            .unwrap();
        service
            .create_wallet(TOKEN, fx.request(&fx.bank, 9.0))
            .await
            .unwrap();

        assert_eq!(service.get_all_wallets().unwrap().len(), 3);
        assert_eq!(service.get_wallets_by_user(TOKEN).unwrap().len(), 3);
        assert!(matches!(
            service.get_wallets_by_user("forged"),
            Err(WalletError::Unauthorized(_))
        ));

        let groups = service.get_wallets_by_user_grouped_by_type(TOKEN).unwrap();
        let kinds: Vec<_> = groups.iter().map(|g| (g.kind, g.wallets.len())).collect();
        assert_eq!(kinds, vec![(WalletKind::Bank, 2), (WalletKind::Physical, 1)]);
        assert!(groups.iter().all(|g| g.user_id == fx.user_id));
    }

    #[tokio::test]
    async fn get_wallet_by_id_reports_missing_wallet() {
        let fx = Fixture::new().await;
        assert!(matches!(
            fx.service().get_wallet_by_id(Uuid::new_v4()),
            Err(WalletError::NotFound { .. })
        ));
    }
}
