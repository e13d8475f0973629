// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request validation shared by the services.

use super::WalletError;
use crate::models::{CreateWalletRequest, UpdateWalletRequest, WalletTypeRequest};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_NUMBER_LEN: usize = 50;

fn wallet_fields(name: &str, number: &str, balance: f64) -> Result<(), WalletError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WalletError::validation("Wallet name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(WalletError::validation(format!(
            "Wallet name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if number.chars().count() > MAX_NUMBER_LEN {
        return Err(WalletError::validation(format!(
            "Wallet number must be at most {MAX_NUMBER_LEN} characters"
        )));
    }
    if !balance.is_finite() || balance < 0.0 {
        return Err(WalletError::validation(
            "Wallet balance must be a non-negative number",
        ));
    }
    Ok(())
}

pub fn create_wallet(request: &CreateWalletRequest) -> Result<(), WalletError> {
    wallet_fields(&request.name, &request.number, request.balance)
}

pub fn update_wallet(request: &UpdateWalletRequest) -> Result<(), WalletError> {
    wallet_fields(&request.name, &request.number, request.balance)
}

pub fn wallet_type(request: &WalletTypeRequest) -> Result<(), WalletError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(WalletError::validation("Wallet type name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(WalletError::validation(format!(
            "Wallet type name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}
