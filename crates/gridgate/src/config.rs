//! Gateway configuration.

use std::path::Path;
use std::time::Duration;

use gridgate_resolver::ResolverConfig;
use gridgate_rpc::RpcTimeouts;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Startup configuration, deserialized from a JSON file with every
/// field optional; `GRIDGATE_BIND`, `GRIDGATE_NS` and
/// `GRIDGATE_CONSCIENCE` override the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// HTTP listen address.
    pub bind: String,
    /// The one namespace this gateway serves.
    pub namespace: String,
    /// Conscience address of the namespace.
    pub conscience: String,

    /// Load-balancer refresh period in seconds; `0` or negative
    /// disables the downstream queue and the `/lb` routes.
    pub lb_refresh_secs: i64,
    /// Namespace-info and service-type reload period in seconds.
    pub nsinfo_refresh_secs: u64,
    /// Registration push period in seconds.
    pub push_period_secs: u64,
    /// Deadline of one bulk conscience push, in milliseconds.
    pub push_timeout_ms: u64,

    /// Directory (high) cache tier.
    pub high_ttl_secs: u64,
    pub high_max: u32,
    /// Services (low) cache tier.
    pub low_ttl_secs: u64,
    pub low_max: u32,

    /// Backend RPC connect deadline in seconds.
    pub connect_timeout_secs: u64,
    /// Backend RPC overall deadline in seconds.
    pub overall_timeout_secs: u64,

    /// Bound on in-flight HTTP requests.
    pub max_concurrency: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:6000".to_string(),
            namespace: "NS".to_string(),
            conscience: "127.0.0.1:6002".to_string(),
            lb_refresh_secs: 10,
            nsinfo_refresh_secs: 5,
            push_period_secs: 1,
            push_timeout_ms: 4000,
            high_ttl_secs: 0,
            high_max: 0,
            low_ttl_secs: 3600,
            low_max: 200_000,
            connect_timeout_secs: 30,
            overall_timeout_secs: 60,
            max_concurrency: 512,
        }
    }
}

impl ProxyConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        if let Ok(v) = std::env::var("GRIDGATE_BIND") {
            config.bind = v;
        }
        if let Ok(v) = std::env::var("GRIDGATE_NS") {
            config.namespace = v;
        }
        if let Ok(v) = std::env::var("GRIDGATE_CONSCIENCE") {
            config.conscience = v;
        }
        Ok(config)
    }

    pub fn lb_enabled(&self) -> bool {
        self.lb_refresh_secs > 0
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            high_ttl: self.high_ttl_secs,
            high_max: self.high_max,
            low_ttl: self.low_ttl_secs,
            low_max: self.low_max,
        }
    }

    pub fn rpc_timeouts(&self) -> RpcTimeouts {
        RpcTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            overall: Duration::from_secs(self.overall_timeout_secs),
        }
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}
