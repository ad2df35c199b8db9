//! Bearer-token authentication.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("malformed Authorization header")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// The caller a request was verified for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// HS256 tokens signed with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken(
                jsonwebtoken::errors::ErrorKind::InvalidSubject.into(),
            ));
        }
        Ok(data.claims.into())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

pub fn authenticate(parts: &Parts, verifier: &Arc<dyn TokenVerifier>) -> Result<AuthUser, AuthError> {
    verifier.verify(bearer_token(parts)?)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, &state.verifier).map_err(|e| {
            warn!("rejected request: {e}");
            AppError::Unauthorized
        })
    }
}
