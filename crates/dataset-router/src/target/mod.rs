//! Backend targets: identity, credentials, token session and forwarding.

pub mod forward;
pub mod session;

use std::sync::Arc;

use crate::config::{CommonConfig, TargetConfig};
use session::TokenSession;

/// One backend instance the router forwards to.
///
/// Targets are built once at start-up and shared (behind `Arc`) by every
/// inbound request for the lifetime of the process. The only mutable state
/// is the token inside [`TokenSession`].
#[derive(Debug)]
pub struct Target {
    name: String,
    base_url: String,
    api_key: String,
    common: Arc<CommonConfig>,
    session: TokenSession,
}

impl Target {
    pub fn new(config: &TargetConfig, common: Arc<CommonConfig>) -> Self {
        let base_url = config.base_url();
        let session = TokenSession::new(
            &config.name,
            format!("{base_url}{}", common.auth_path),
            config,
            &common.grant_type,
        );
        Self {
            name: config.name.clone(),
            base_url,
            api_key: config.api_key.clone(),
            common,
            session,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub fn session(&self) -> &TokenSession {
        &self.session
    }

    fn dataset_url(&self) -> String {
        format!("{}{}", self.base_url, self.common.dataset_path)
    }
}
