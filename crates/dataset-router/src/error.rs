//! Errors raised while forwarding to a single target.

use thiserror::Error;

/// Why a forward (or the credential exchange it triggered) failed.
///
/// These never reach the inbound caller: the dispatcher logs them per
/// target and the request continues with whatever the other targets return.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request to target failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} when requesting a new access token: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("malformed access token response: {0}")]
    TokenDecode(#[source] serde_json::Error),

    #[error("target rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("maximum attempts ({attempts}) reached")]
    MaxAttempts { attempts: usize },
}
