use chrono::{Duration, Utc};
use dotenvy::dotenv;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Once;

use crate::utils::auth::Claims;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        if std::env::var("JWT_SECRET").is_err() {
            std::env::set_var("JWT_SECRET", "test-jwt-secret");
        }
    });
}

/// Mints a token the way the upstream account service would. The engine only
/// ever verifies tokens; issuing them is test tooling.
pub fn issue_token(user_id: &str, user_name: &str) -> String {
    setup_test_env();
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        name: Some(user_name.to_string()),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(1)).timestamp() as usize,
    };
    let secret = std::env::var("JWT_SECRET").expect("setup_test_env sets JWT_SECRET");
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("test token encodes")
}
