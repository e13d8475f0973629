// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generates the `wallet.WalletService` server and client stubs.
//!
//! Messages are plain prost structs in `src/grpc/proto.rs`, so codegen runs
//! without `.proto` files or `protoc`.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str, streaming: bool) -> Method {
    let builder = Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::grpc::proto::{input}"))
        .output_type(format!("crate::grpc::proto::{output}"))
        .codec_path(CODEC);

    if streaming {
        builder.server_streaming().build()
    } else {
        builder.build()
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let service = Service::builder()
        .name("WalletService")
        .package("wallet")
        .method(method("get_wallets", "GetWallets", "GetWalletOptions", "Wallet", true))
        .method(method("get_user_wallets", "GetUserWallets", "UserId", "Wallet", true))
        .method(method("get_wallet_by_id", "GetWalletByID", "WalletId", "Wallet", false))
        .method(method("update_wallet", "UpdateWallet", "Wallet", "Wallet", false))
        .build();

    Builder::new().compile(&[service]);
}
