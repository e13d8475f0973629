// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wallet_server::{
    api::router,
    auth::JwtVerifier,
    config::{Config, LogFormat},
    grpc::WalletGrpcService,
    outbox::{AmqpBroker, OutboxRelay, OutboxSweeper, RelayConfig, SweeperConfig},
    remote::GrpcTransactionClient,
    service::{SagaConfig, WalletService, WalletTypeService},
    state::AppState,
    storage::{OutboxRepository, WalletDatabase, WalletRepository, WalletTypeRepository},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(?config, "Starting wallet server");

    let db = Arc::new(WalletDatabase::open(&config.database_path)?);
    let wallets = Arc::new(WalletRepository::new(db.clone()));
    let wallet_types = Arc::new(WalletTypeRepository::new(db.clone()));
    let outbox = Arc::new(OutboxRepository::new(db.clone()));

    let transactions = Arc::new(GrpcTransactionClient::connect_lazy(
        &config.transaction_service_addr,
        config.remote_call_timeout,
    )?);
    let verifier = Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes()));
    let broker = Arc::new(AmqpBroker::new(config.amqp_url.clone()));

    let wallet_service = WalletService::new(
        db.clone(),
        wallets.clone(),
        wallet_types.clone(),
        outbox.clone(),
        transactions,
        verifier,
    )
    .with_config(SagaConfig {
        remote_call_timeout: config.remote_call_timeout,
        max_retries: config.outbox_max_retries,
    });
    let wallet_type_service = WalletTypeService::new(db.clone(), wallet_types, wallets);

    // Servers and background workers share one token, cancelled on SIGINT/SIGTERM
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let relay = OutboxRelay::new(
        outbox.clone(),
        broker.clone(),
        RelayConfig {
            exchange: config.outbox_exchange.clone(),
            interval: config.outbox_publish_interval,
            batch_size: config.outbox_batch_size,
            publish_timeout: config.outbox_publish_timeout,
        },
    );
    let sweeper = OutboxSweeper::new(
        outbox.clone(),
        SweeperConfig {
            interval: config.outbox_cleanup_interval,
            retention: config.outbox_retention,
        },
    );
    let relay_handle = tokio::spawn(relay.run(shutdown.clone()));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let state = AppState::new(wallet_service, wallet_type_service, outbox, db);

    let grpc_addr: SocketAddr = config.grpc_bind_address().parse()?;
    let grpc_server = WalletGrpcService::new(state.wallets.clone()).into_server();
    let grpc_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tracing::info!(addr = %grpc_addr, "Wallet gRPC service listening");
            tonic::transport::Server::builder()
                .add_service(grpc_server)
                .serve_with_shutdown(grpc_addr, shutdown.cancelled_owned())
                .await
        }
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        addr = %config.bind_address(),
        "Wallet server listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    tracing::info!("HTTP server stopped, draining gRPC service and background workers");
    shutdown.cancel();
    match grpc_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "gRPC server failed"),
        Err(e) => tracing::error!(error = %e, "gRPC server task failed"),
    }
    for (name, handle) in [("outbox relay", relay_handle), ("outbox sweeper", sweeper_handle)] {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "{name} task failed");
        }
    }
    broker.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
