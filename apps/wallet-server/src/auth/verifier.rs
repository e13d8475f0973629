// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! Tokens are HS256 JWTs issued by the user service with the shared
//! `JWT_SECRET_KEY`. The `id` claim is the caller's user id. The user service
//! may issue tokens without `exp`; those are accepted, and `exp` is enforced
//! whenever it is present.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Identity established from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: Uuid,
    pub username: String,
    pub email: String,
}

/// Turns a bearer token into a caller identity.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct UserClaims {
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
}

/// HMAC-SHA256 [`TokenVerifier`].
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let data = decode::<UserClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = data.claims;
        let subject_id = Uuid::parse_str(&claims.id).map_err(|_| AuthError::InvalidSubject)?;

        Ok(VerifiedIdentity {
            subject_id,
            username: claims.username,
            email: claims.email,
        })
    }
}
