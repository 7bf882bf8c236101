use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::EngineError;

/// Claims of the externally issued auth token. The engine only decodes it to
/// recover an identity; credential checks happen upstream.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

fn secret() -> Result<String, EngineError> {
    env::var("JWT_SECRET")
        .map_err(|_| EngineError::Unauthorized("token verification is not configured".into()))
}

pub fn verify_token(token: &str) -> Result<Claims, EngineError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret()?.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| EngineError::Unauthorized("invalid auth token".into()))
}

/// Resolved identity, injected into handlers from the `X-Auth-Token` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub user_name: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EngineError::Unauthorized("missing auth token".into()))?;
        let claims = verify_token(token)?;
        Ok(AuthUser {
            user_name: claims.name.clone().unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_setup::{issue_token, setup_test_env};

    #[test]
    fn token_round_trip() {
        let token = issue_token("u1", "Ann");
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.name.as_deref(), Some("Ann"));
    }

    #[test]
    fn garbage_token_is_rejected() {
        setup_test_env();
        assert!(matches!(
            verify_token("not-a-token"),
            Err(EngineError::Unauthorized(_))
        ));
    }
}
