//! Configuration management for the payment verifier

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Address of the local verification service
pub const VERIFICATION_SERVICE_ADDR: &str = "127.0.0.1:8443";

/// Environment variable holding a direct path to the root certificate.
/// Only consulted when the CA tool fails.
pub const CA_ROOT_CERT_ENV: &str = "THREECITIES_GRPC_CA_ROOT_CERT";

/// Default CA discovery tool
pub const DEFAULT_CA_TOOL: &str = "mkcert";

/// Verifier configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// CA tool invoked as `<ca_tool> -CAROOT`
    pub ca_tool: String,

    /// Name of the trust-root override variable
    pub ca_root_env_var: String,

    /// Channel connect timeout
    pub connect_timeout_secs: u64,

    /// Deadline applied to each verification RPC
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ca_tool: DEFAULT_CA_TOOL.to_string(),
            ca_root_env_var: CA_ROOT_CERT_ENV.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Config {
            ca_tool: env::var("THREECITIES_CA_TOOL").unwrap_or(defaults.ca_tool),

            ca_root_env_var: defaults.ca_root_env_var,

            connect_timeout_secs: match env::var("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS") {
                Ok(v) => v
                    .parse()
                    .context("Invalid THREECITIES_GRPC_CONNECT_TIMEOUT_SECS")?,
                Err(_) => defaults.connect_timeout_secs,
            },

            request_timeout_secs: match env::var("THREECITIES_GRPC_REQUEST_TIMEOUT_SECS") {
                Ok(v) => v
                    .parse()
                    .context("Invalid THREECITIES_GRPC_REQUEST_TIMEOUT_SECS")?,
                Err(_) => defaults.request_timeout_secs,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.ca_tool.trim().is_empty() {
            anyhow::bail!("THREECITIES_CA_TOOL must not be empty");
        }

        if self.connect_timeout_secs == 0 {
            anyhow::bail!("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("THREECITIES_GRPC_REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }

    /// Endpoint URI for the verification service
    pub fn endpoint(&self) -> String {
        format!("https://{}", VERIFICATION_SERVICE_ADDR)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.ca_tool, "mkcert");
        assert_eq!(config.ca_root_env_var, "THREECITIES_GRPC_CA_ROOT_CERT");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_is_fixed() {
        let config = Config::default();
        assert_eq!(config.endpoint(), "https://127.0.0.1:8443");
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let config = Config {
            connect_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_tool() {
        let config = Config {
            ca_tool: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
