//! Bearer-token authentication against the auth backend's JWKS.
//!
//! Every verification failure (JWKS fetch, key lookup, signature, audience)
//! collapses into the same generic 401 so callers cannot probe verification
//! internals. The integration-test bypass token exists only in builds with
//! the `test-bypass` feature.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use onco_core::AuthenticatedUser;
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Identity minted for the bypass token. The test-identity branches in the
/// handlers key off this id.
pub const TEST_USER_ID: &str = "mock_test_id_123";

#[cfg(feature = "test-bypass")]
pub(crate) const BYPASS_TOKEN: &str = "mock_jwt_token_for_testing";

const EXPECTED_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[cfg(feature = "test-bypass")]
pub fn test_identity() -> AuthenticatedUser {
    AuthenticatedUser {
        id: TEST_USER_ID.to_string(),
        email: "test@example.com".to_string(),
        role: "patient".to_string(),
    }
}

fn user_from_claims(claims: Claims) -> AuthenticatedUser {
    AuthenticatedUser {
        id: claims.sub,
        email: claims.email.unwrap_or_default(),
        role: claims.role.unwrap_or_default(),
    }
}

/// Verifies a bearer token: fetch the JWKS, locate the key by `kid`, check
/// ES256 signature and audience.
pub async fn verify_token(
    token: &str,
    http: &reqwest::Client,
    jwks_url: &str,
) -> Result<AuthenticatedUser, AppError> {
    #[cfg(feature = "test-bypass")]
    if token == BYPASS_TOKEN {
        return Ok(test_identity());
    }

    verify_signed_token(token, http, jwks_url).await.map_err(|reason| {
        debug!("Token verification failed: {}", reason);
        AppError::Unauthorized
    })
}

async fn verify_signed_token(
    token: &str,
    http: &reqwest::Client,
    jwks_url: &str,
) -> Result<AuthenticatedUser, String> {
    let jwks: JwkSet = http
        .get(jwks_url)
        .send()
        .await
        .map_err(|e| format!("JWKS fetch: {e}"))?
        .json()
        .await
        .map_err(|e| format!("JWKS parse: {e}"))?;

    let header = decode_header(token).map_err(|e| format!("header: {e}"))?;
    let kid = header.kid.ok_or("token has no key id")?;
    let jwk = jwks.find(&kid).ok_or("no matching signing key")?;

    let key = DecodingKey::from_jwk(jwk).map_err(|e| format!("key: {e}"))?;
    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_audience(&[EXPECTED_AUDIENCE]);

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| format!("decode: {e}"))?;
    Ok(user_from_claims(data.claims))
}

/// Extractor wrapper so handlers can take the verified identity directly.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let user = verify_token(token, &state.http, &state.settings.auth.jwks_url()).await?;
        Ok(CurrentUser(user))
    }
}
