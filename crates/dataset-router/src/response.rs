//! Captured backend responses.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A successful response from one target, with its body read exactly once.
///
/// The body is immutable `Bytes`, so the selector and the response writer
/// share it by cheap clone instead of re-reading a stream.
#[derive(Debug, Clone)]
pub struct ForwardResult {
    /// Name of the target that produced this response.
    pub target: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardResult {
    /// Drain a reqwest response into a captured result.
    pub async fn capture(target: &str, response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            target: target.to_string(),
            status,
            headers,
            body,
        })
    }
}
