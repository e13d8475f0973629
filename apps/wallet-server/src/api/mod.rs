// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CreateWalletRequest, DeadLetterResponse, UpdateWalletRequest, UserWalletsByType,
        WalletResponse, WalletSummary, WalletTypeRequest, WalletTypeResponse,
    },
    state::AppState,
    storage::WalletKind,
};

pub mod health;
pub mod outbox;
pub mod wallet_types;
pub mod wallets;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/wallets",
            get(wallets::list_wallets).post(wallets::create_wallet),
        )
        .route("/wallets/user", get(wallets::list_user_wallets))
        .route(
            "/wallets/user/by-type",
            get(wallets::list_user_wallets_by_type),
        )
        .route(
            "/wallets/{wallet_id}",
            get(wallets::get_wallet)
                .put(wallets::update_wallet)
                .delete(wallets::delete_wallet),
        )
        .route(
            "/wallet-types",
            get(wallet_types::list_wallet_types).post(wallet_types::create_wallet_type),
        )
        .route(
            "/wallet-types/{wallet_type_id}",
            get(wallet_types::get_wallet_type)
                .put(wallet_types::update_wallet_type)
                .delete(wallet_types::delete_wallet_type),
        )
        .route("/outbox/dead-letters", get(outbox::list_dead_letters))
        .route(
            "/outbox/dead-letters/{message_id}/requeue",
            post(outbox::requeue_dead_letter),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        wallets::list_wallets,
        wallets::get_wallet,
        wallets::list_user_wallets,
        wallets::list_user_wallets_by_type,
        wallets::create_wallet,
        wallets::update_wallet,
        wallets::delete_wallet,
        wallet_types::list_wallet_types,
        wallet_types::get_wallet_type,
        wallet_types::create_wallet_type,
        wallet_types::update_wallet_type,
        wallet_types::delete_wallet_type,
        outbox::list_dead_letters,
        outbox::requeue_dead_letter
    ),
    components(
        schemas(
            CreateWalletRequest,
            UpdateWalletRequest,
            WalletResponse,
            WalletSummary,
            UserWalletsByType,
            WalletKind,
            WalletTypeRequest,
            WalletTypeResponse,
            DeadLetterResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Wallets", description = "Wallet management"),
        (name = "Wallet Types", description = "Wallet type catalogue"),
        (name = "Outbox", description = "Dead-lettered integration events")
    )
)]
struct ApiDoc;
