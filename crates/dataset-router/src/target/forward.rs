//! Bounded retry loop that delivers one request body to one target.

use std::time::Instant;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::Instrument;

use super::Target;
use crate::error::ForwardError;
use crate::response::ForwardResult;

/// Maximum number of dataset calls made to one target per inbound request.
pub const MAX_ATTEMPTS: usize = 5;

impl Target {
    /// Send `body` to this target's dataset endpoint.
    ///
    /// - 200: the captured response is returned.
    /// - 401: the session token is refreshed and the call retried.
    /// - 401 < status < 600: fatal, the body is returned in the error.
    /// - anything else, including 400: retried as-is.
    ///
    /// Every branch that retries consumes one of [`MAX_ATTEMPTS`].
    pub async fn forward(
        &self,
        client: &reqwest::Client,
        body: Bytes,
    ) -> Result<ForwardResult, ForwardError> {
        let span = router_tracing::target_forward_span!(&self.name);
        self.attempt_forward(client, body).instrument(span).await
    }

    async fn attempt_forward(
        &self,
        client: &reqwest::Client,
        body: Bytes,
    ) -> Result<ForwardResult, ForwardError> {
        let start = Instant::now();
        let url = self.dataset_url();
        let span = tracing::Span::current();

        for attempt in 1..=MAX_ATTEMPTS {
            let token = self.session.token().await;

            tracing::debug!(url = %url, attempt, "Sending dataset request");

            let response = client
                .post(&url)
                .header("X-Resource-Token", format!("Bearer {token}"))
                .header("X-API-Key", &self.api_key)
                .header("X-Data-Set-Type", "JSON")
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await?;

            let status = response.status();
            span.record("attempts", attempt);
            span.record("status", status.as_u16());

            match status {
                StatusCode::OK => {
                    let result = ForwardResult::capture(&self.name, response).await?;
                    let latency = start.elapsed().as_millis() as u64;
                    span.record("latency_ms", latency);
                    tracing::debug!(attempt, latency_ms = latency, "Target answered");
                    return Ok(result);
                }
                StatusCode::UNAUTHORIZED => {
                    tracing::warn!(attempt, "Token expired or missing, refreshing");
                    self.session.refresh(client, &token).await?;
                }
                // Exactly 400 falls through to the retry arm below.
                s if s.as_u16() > 400 && s.as_u16() < 600 => {
                    let body = response.text().await?;
                    return Err(ForwardError::Rejected {
                        status: s.as_u16(),
                        body,
                    });
                }
                s => {
                    tracing::warn!(
                        status = s.as_u16(),
                        attempt,
                        "Unexpected status from target, trying again"
                    );
                }
            }
        }

        Err(ForwardError::MaxAttempts {
            attempts: MAX_ATTEMPTS,
        })
    }
}
