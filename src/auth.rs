//! Bearer credential management for channel authentication.
//!
//! The session asks the provider once, right before connecting: a token
//! about to expire is refreshed, and a failed refresh fails the start
//! outright. There is no retry loop.

use std::sync::RwLock;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use tracing::info;

use crate::error::AuthError;

/// Supplies the bearer credential used to authenticate the channel.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Whether the current credential will still be valid in `margin` from
    /// now. Synchronous and cheap.
    fn valid_for(&self, margin: Duration) -> bool;

    /// Obtain a fresh credential. Fails fast; callers must not retry.
    async fn refresh(&self) -> Result<(), AuthError>;

    /// The current bearer token.
    fn bearer(&self) -> String;
}

/// JWT access/refresh token pair, refreshed over HTTP.
pub struct JwtTokenProvider {
    access_token: RwLock<String>,
    refresh_token: RwLock<String>,
    refresh_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

impl JwtTokenProvider {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        refresh_url: impl Into<String>,
    ) -> Self {
        Self {
            access_token: RwLock::new(access_token.into()),
            refresh_token: RwLock::new(refresh_token.into()),
            refresh_url: refresh_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for JwtTokenProvider {
    fn valid_for(&self, margin: Duration) -> bool {
        let token = self.access_token.read().expect("token lock poisoned").clone();
        match jwt_expiry_epoch_secs(&token) {
            Ok(expiry) => expiry - chrono::Utc::now().timestamp() > margin.as_secs() as i64,
            Err(_) => false,
        }
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        let refresh_token = self
            .refresh_token
            .read()
            .expect("token lock poisoned")
            .clone();

        // An expired refresh token cannot be exchanged; report it rather
        // than bothering the endpoint.
        let expiry = jwt_expiry_epoch_secs(&refresh_token)?;
        if expiry - chrono::Utc::now().timestamp() < 5 {
            return Err(AuthError::RefreshTokenExpired);
        }

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::RefreshFailed(format!(
                "refresh endpoint returned {}",
                response.status()
            )));
        }

        let tokens: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        *self.access_token.write().expect("token lock poisoned") = tokens.access_token;
        *self.refresh_token.write().expect("token lock poisoned") = tokens.refresh_token;
        info!("Access token refreshed");
        Ok(())
    }

    fn bearer(&self) -> String {
        self.access_token.read().expect("token lock poisoned").clone()
    }
}

/// Fixed token that never expires. For tests and short-lived tooling.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    fn valid_for(&self, _margin: Duration) -> bool {
        true
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn bearer(&self) -> String {
        self.token.clone()
    }
}

/// `exp` claim of a JWT, as seconds since the epoch. No signature check:
/// the server validates; we only need the expiry for the refresh decision.
fn jwt_expiry_epoch_secs(token: &str) -> Result<i64, AuthError> {
    let payload = token.split('.').nth(1).ok_or(AuthError::MalformedToken)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)?;
    claims
        .get("exp")
        .and_then(|v| v.as_i64())
        .ok_or(AuthError::MalformedToken)
}
