//! Process-wide configuration, resolved once at startup.
//!
//! Sources, highest precedence first: command-line flags, an optional
//! TOML config file, built-in defaults. The resolved [`Config`] is
//! immutable and handed to request handlers as shared state, never a
//! global, so the pipeline stays testable without a running process.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid carrier base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("Invalid bind address: {0}")]
    Bind(#[from] std::net::AddrParseError),
}

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_BASE_URL: &str = "https://www.ems.com.cn";
const DEFAULT_USER_AGENT: &str = concat!("emsfeed/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Configuration Structs
// ============================================================================

/// Raw overrides read from the optional config file.
///
/// All keys are optional; a missing file yields the empty override set.
/// The tracking query itself (tracking id, channel) is deliberately not
/// a file key; it arrives on the command line per process run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Address the HTTP server listens on.
    pub bind: Option<String>,

    /// Carrier base URL the query path is appended to.
    pub base_url: Option<String>,

    /// User-Agent header sent with the upstream fetch.
    pub user_agent: Option<String>,

    /// Upstream request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load overrides from a TOML file.
    ///
    /// - Missing file → `Ok(FileConfig::default())`
    /// - Empty file → `Ok(FileConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let file: FileConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration file");
        Ok(file)
    }
}

/// Resolved, immutable process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The parcel identifier to watch.
    pub tracking_id: String,

    /// Carrier channel code, the product segment of the query URL.
    pub channel: String,

    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// Carrier base URL; overridable to point the fetcher at a stub.
    pub base_url: Url,

    /// User-Agent header for the upstream fetch.
    pub user_agent: String,

    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Config {
    /// Merge command-line values, file overrides, and defaults.
    ///
    /// CLI wins over file, file wins over defaults. The tracking id and
    /// channel come from the CLI only.
    pub fn resolve(
        tracking_id: String,
        channel: String,
        bind: Option<SocketAddr>,
        base_url: Option<String>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let bind = match bind {
            Some(addr) => addr,
            None => file.bind.as_deref().unwrap_or(DEFAULT_BIND).parse()?,
        };
        let base_url = Url::parse(
            base_url
                .as_deref()
                .or(file.base_url.as_deref())
                .unwrap_or(DEFAULT_BASE_URL),
        )?;
        let user_agent = file
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            tracking_id,
            channel,
            bind,
            base_url,
            user_agent,
            timeout_secs,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
