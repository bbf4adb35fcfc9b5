//! Bearer-token session for one target.
//!
//! The token is read by every dataset attempt and replaced wholesale by a
//! successful credential exchange. Targets are shared across concurrent
//! inbound requests, so the token sits behind a lock and exchanges are
//! serialized: when several requests see a 401 at once, the first one
//! exchanges credentials and the rest reuse the token it stored.

use std::fmt;

use axum::http::StatusCode;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;

use crate::config::TargetConfig;
use crate::error::ForwardError;

/// Successful body of the auth endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(alias = "accessToken")]
    access_token: String,
}

pub struct TokenSession {
    target: String,
    auth_url: String,
    api_key: String,
    client_id: String,
    client_secret: String,
    grant_type: String,
    token: RwLock<String>,
    refresh_lock: Mutex<()>,
}

impl fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSession")
            .field("target", &self.target)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenSession {
    pub fn new(target: &str, auth_url: String, credentials: &TargetConfig, grant_type: &str) -> Self {
        Self {
            target: target.to_string(),
            auth_url,
            api_key: credentials.api_key.clone(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            grant_type: grant_type.to_string(),
            token: RwLock::new(String::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current token; empty until the first successful exchange.
    pub async fn token(&self) -> String {
        self.token.read().await.clone()
    }

    /// Exchange client credentials for a new access token and store it.
    ///
    /// `rejected` is the token the caller was refused with. If another task
    /// already replaced it while this one waited for the refresh lock, the
    /// newer token is returned without a second exchange.
    ///
    /// On a non-200 reply the stored token is left untouched.
    pub async fn refresh(
        &self,
        client: &reqwest::Client,
        rejected: &str,
    ) -> Result<String, ForwardError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let current = self.token.read().await;
            if !current.is_empty() && current.as_str() != rejected {
                tracing::debug!(target = %self.target, "Token already refreshed by a concurrent request");
                return Ok(current.clone());
            }
        }

        let span = router_tracing::token_refresh_span!(&self.target);
        self.exchange(client).instrument(span).await
    }

    async fn exchange(&self, client: &reqwest::Client) -> Result<String, ForwardError> {
        tracing::info!("Requesting a new access token");

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", self.grant_type.as_str()),
        ];
        let response = client
            .post(&self.auth_url)
            .header("X-API-Key", &self.api_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(ForwardError::TokenExchange {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&body).map_err(ForwardError::TokenDecode)?;
        *self.token.write().await = parsed.access_token.clone();

        tracing::info!("Obtained new access token");
        Ok(parsed.access_token)
    }
}
