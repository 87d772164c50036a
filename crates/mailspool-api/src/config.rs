//! Configuration management for the mailspool service.

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use mailspool_core::{CredentialIndex, CredentialsConfig};
use serde::{Deserialize, Serialize};

/// Default configuration file path, overridable via `CONFIG_FILE`.
const CONFIG_FILE: &str = "mailspool.yaml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`mailspool.yaml`, or the path in the
///    `CONFIG_FILE` environment variable)
/// 3. Built-in defaults (lowest priority)
///
/// Credentials can only come from the file: an identity maps to a list
/// of API-key records, each with a raw key, an expiry, and per-stream
/// permission sets.
///
/// ```yaml
/// spool_root: /var/spool/mailspool
/// cookie_domain: mail.example.com
/// credentials:
///   svc1:
///     api_keys:
///       - key: "agoodlongrandomkey"
///         expiry: 0
///         permissions:
///           stream-a: [inbound, list, get, delete]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Spool
    /// Root directory for spooled notifications.
    ///
    /// Environment variable: `SPOOL_ROOT`
    #[serde(default = "default_spool_root", alias = "SPOOL_ROOT")]
    pub spool_root: PathBuf,

    // Session cookie
    /// Domain the API-key cookie is scoped to.
    ///
    /// Environment variable: `COOKIE_DOMAIN`
    #[serde(default = "default_cookie_domain", alias = "COOKIE_DOMAIN")]
    pub cookie_domain: String,
    /// Max-age of the API-key cookie in seconds. The window is fixed:
    /// each successful ingestion re-issues the cookie with this
    /// max-age.
    ///
    /// Environment variable: `COOKIE_MAX_AGE`
    #[serde(default = "default_cookie_max_age", alias = "COOKIE_MAX_AGE")]
    pub cookie_max_age: u64,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,

    /// Identity to API-key records. File-only; no environment alias.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Loads configuration from defaults, the YAML file, and
    /// environment variable overrides.
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| CONFIG_FILE.to_string());

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(config_file))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the immutable credential index from the configured
    /// credentials.
    ///
    /// # Errors
    ///
    /// Fails if the same raw key is declared more than once; the
    /// service must not start with an ambiguous credential table.
    pub fn build_credential_index(&self) -> Result<CredentialIndex> {
        CredentialIndex::build(&self.credentials).context("Invalid credential configuration")
    }

    /// Parses the server socket address from host and port.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validates configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.spool_root.as_os_str().is_empty() {
            anyhow::bail!("spool_root must not be empty");
        }

        if self.cookie_domain.is_empty() {
            anyhow::bail!("cookie_domain must not be empty");
        }

        if self.cookie_max_age == 0 {
            anyhow::bail!("cookie_max_age must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            spool_root: default_spool_root(),
            cookie_domain: default_cookie_domain(),
            cookie_max_age: default_cookie_max_age(),
            rust_log: default_log_level(),
            credentials: CredentialsConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_spool_root() -> PathBuf {
    PathBuf::from("/var/spool/mailspool")
}

fn default_cookie_domain() -> String {
    "localtest.me".to_string()
}

fn default_cookie_max_age() -> u64 {
    1800
}

fn default_log_level() -> String {
    "info".to_string()
}
