//! HTTP gateway configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default gateway endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:25333";

/// Default timeout for gateway calls: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HTTP gateway client.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(
    name = "HttpGatewayBuilder",
    derive(Debug),
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config", error = "Error")
)]
pub struct HttpGatewayConfig {
    /// Base URL of the gateway bridge
    #[cfg_attr(
        feature = "config",
        arg(
            long = "gateway-endpoint",
            env = "DSFLOW_GATEWAY_ENDPOINT",
            default_value = DEFAULT_ENDPOINT
        )
    )]
    #[serde(default = "default_endpoint")]
    #[builder(setter(custom), default = "default_endpoint()")]
    pub endpoint: Url,

    /// Gateway call timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-timeout", env = "DSFLOW_GATEWAY_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "DEFAULT_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-user-agent", env = "DSFLOW_GATEWAY_USER_AGENT")
    )]
    #[serde(default)]
    #[builder(default)]
    pub user_agent: Option<String>,
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("Valid default URL")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl HttpGatewayConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HttpGatewayBuilder {
        HttpGatewayBuilder::default()
    }

    /// Returns the timeout as a Duration, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Returns the effective user agent, using the default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("dsflow/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Returns the URL of a remote method.
    pub fn method_url(&self, method: &str) -> Result<Url> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{method}")).map_err(|e| {
            Error::invalid_config(format!("Invalid method URL for '{method}': {e}"))
        })
    }
}

impl HttpGatewayBuilder {
    /// Set the gateway endpoint.
    pub fn with_endpoint(mut self, url: &str) -> Result<Self> {
        let endpoint = url
            .parse()
            .map_err(|e| Error::invalid_config(format!("Invalid endpoint '{url}': {e}")))?;
        self.endpoint = Some(endpoint);
        Ok(self)
    }

    fn validate_config(&self) -> std::result::Result<(), String> {
        if let Some(endpoint) = &self.endpoint {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(format!(
                    "Endpoint scheme must be http or https, got '{}'",
                    endpoint.scheme()
                ));
            }
        }

        if let Some(timeout) = &self.timeout_secs {
            if *timeout == 0 {
                return Err("Timeout must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        Error::invalid_config(error.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::invalid_config(message)
    }
}
