//! Configuration types and loading logic.

use std::collections::HashSet;

use anyhow::{bail, ensure};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use router_tracing::TracingConfig;
use serde::Deserialize;

/// Top-level router configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub router: ListenConfig,
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Inbound listener and scoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path that accepts dataset requests.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_healthcheck_path")]
    pub healthcheck_path: String,

    /// Name of the scoring strategy (`basic` or `percentage`).
    #[serde(default = "default_score_function")]
    pub score_function: String,
}

/// Settings shared by every target.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    #[serde(default = "default_grant_type")]
    pub grant_type: String,

    /// Per-request timeout in seconds, applied to dataset and auth calls.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// One backend instance and its credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub name: String,

    /// Scheme and host, e.g. `https://gator-a.internal`.
    pub host: String,

    /// Appended to `host` when set.
    #[serde(default)]
    pub port: Option<u16>,

    pub client_id: String,
    pub client_secret: String,
    pub api_key: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/dataset".to_string()
}

fn default_healthcheck_path() -> String {
    "/healthz".to_string()
}

fn default_score_function() -> String {
    "basic".to_string()
}

fn default_dataset_path() -> String {
    "/apigator/protect/v1/dataset".to_string()
}

fn default_auth_path() -> String {
    "/apigator/identity/v1/token".to_string()
}

fn default_grant_type() -> String {
    "client_credentials".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            healthcheck_path: default_healthcheck_path(),
            score_function: default_score_function(),
        }
    }
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            auth_path: default_auth_path(),
            grant_type: default_grant_type(),
            timeout: default_timeout(),
        }
    }
}

impl ListenConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TargetConfig {
    /// Base URL that dataset and auth paths are appended to.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (ROUTER_ prefix, __ for nesting)
    /// 2. TOML config file
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(config_path))
                .merge(Env::prefixed("ROUTER_").split("__")),
        )
    }

    /// Extract and validate a configuration from an already assembled figment.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: RouterConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.targets.is_empty(), "at least one [[targets]] entry is required");

        let mut seen = HashSet::new();
        for target in &self.targets {
            ensure!(!target.name.trim().is_empty(), "target name must not be empty");
            if !seen.insert(target.name.as_str()) {
                bail!("duplicate target name: {}", target.name);
            }
            ensure!(
                target.host.starts_with("http://") || target.host.starts_with("https://"),
                "target {} host must start with http:// or https://, got {}",
                target.name,
                target.host
            );
        }

        ensure!(
            self.router.path.starts_with('/'),
            "router path must start with '/', got {}",
            self.router.path
        );
        ensure!(
            self.router.healthcheck_path.starts_with('/'),
            "healthcheck path must start with '/', got {}",
            self.router.healthcheck_path
        );
        ensure!(
            self.router.path != self.router.healthcheck_path,
            "router path and healthcheck path must differ"
        );
        Ok(())
    }
}
