use std::collections::HashSet;

use url::Url;

use crate::constants::{DEFAULT_GA_ENDPOINT, DEFAULT_LISTEN_ADDRESS};
use crate::error::ConfigError;

/// Immutable process configuration.
///
/// Built once at startup from environment variables (or CLI flags layered on
/// top of them) and shared by reference afterwards; nothing mutates it at
/// runtime. Presence is the only validation applied to the analytics
/// credentials - they are opaque strings passed through to the collection
/// endpoint.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the proxy listens on.
    pub listen_address: String,
    /// Origin server as `host:port`.
    pub upstream_address: String,
    /// Connect to the origin over TLS.
    pub upstream_tls: bool,
    /// Hostnames eligible for tracking, lowercased.
    pub tracked_hostnames: HashSet<String>,
    /// GA4 measurement ID.
    pub measurement_id: String,
    /// GA4 API secret.
    pub api_secret: String,
    /// Base URL of the analytics collection endpoint.
    pub ga_endpoint: String,
}

impl Settings {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        listen_address: String,
        upstream_address: String,
        upstream_tls: bool,
        tracked_hostnames: &str,
        measurement_id: String,
        api_secret: String,
        ga_endpoint: String,
    ) -> Result<Self, ConfigError> {
        if upstream_address.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "upstream_address",
                reason: "must not be empty".to_string(),
            });
        }
        if measurement_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "measurement_id",
                reason: "must not be empty".to_string(),
            });
        }
        if api_secret.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "api_secret",
                reason: "must not be empty".to_string(),
            });
        }
        Url::parse(&ga_endpoint).map_err(|e| ConfigError::InvalidValue {
            name: "ga_endpoint",
            reason: e.to_string(),
        })?;

        Ok(Self {
            listen_address,
            upstream_address,
            upstream_tls,
            tracked_hostnames: parse_hostnames(tracked_hostnames),
            measurement_id,
            api_secret,
            ga_endpoint,
        })
    }

    /// Build the configuration from `GLIMPSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_address = std::env::var("GLIMPSE_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDRESS.to_string());
        let upstream_address = std::env::var("GLIMPSE_UPSTREAM")
            .map_err(|_| ConfigError::MissingVariable("GLIMPSE_UPSTREAM"))?;
        let upstream_tls = std::env::var("GLIMPSE_UPSTREAM_TLS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);
        let tracked_hostnames = std::env::var("GLIMPSE_TRACKED_HOSTNAMES")
            .map_err(|_| ConfigError::MissingVariable("GLIMPSE_TRACKED_HOSTNAMES"))?;
        let measurement_id = std::env::var("GLIMPSE_GA_MEASUREMENT_ID")
            .map_err(|_| ConfigError::MissingVariable("GLIMPSE_GA_MEASUREMENT_ID"))?;
        let api_secret = std::env::var("GLIMPSE_GA_API_SECRET")
            .map_err(|_| ConfigError::MissingVariable("GLIMPSE_GA_API_SECRET"))?;
        let ga_endpoint = std::env::var("GLIMPSE_GA_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_GA_ENDPOINT.to_string());

        Self::new(
            listen_address,
            upstream_address,
            upstream_tls,
            &tracked_hostnames,
            measurement_id,
            api_secret,
            ga_endpoint,
        )
    }

    /// Whether the given request hostname is eligible for tracking.
    /// Hostnames are compared case-insensitively.
    pub fn is_tracked_host(&self, host: &str) -> bool {
        self.tracked_hostnames.contains(&host.to_lowercase())
    }
}

fn parse_hostnames(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}
