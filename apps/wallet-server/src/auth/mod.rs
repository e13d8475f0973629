// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! ## Auth Flow
//!
//! 1. The user service issues an HS256 JWT carrying `id`, `username`, `email`
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. [`BearerToken`] extracts the raw token in the HTTP layer
//! 4. Services verify it through [`TokenVerifier`] and use `id` as the
//!    wallet owner
//!
//! Clock skew tolerance is 60 seconds.

pub mod error;
pub mod extractor;
pub mod verifier;

pub use error::AuthError;
pub use extractor::BearerToken;
pub use verifier::{JwtVerifier, TokenVerifier, VerifiedIdentity};
