// SPDX-License-Identifier: MIT

//! Environment-driven settings
//!
//! Values come from the process environment, after loading a `.env` file if
//! one is present. Command-line flags override them.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::classifier::DEFAULT_TTL;
use crate::error::{RuleError, RuleResult};

pub const ENV_RULES_FILE: &str = "ROLEMATCH_RULES_FILE";
pub const ENV_SERVER_URL: &str = "ROLEMATCH_SERVER_URL";
pub const ENV_CACHE_TTL_SECS: &str = "ROLEMATCH_CACHE_TTL_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ROLEMATCH_HTTP_TIMEOUT_SECS";
pub const ENV_PORT: &str = "ROLEMATCH_PORT";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// YAML rule file backing a local store
    pub rules_file: Option<PathBuf>,
    /// Central rule server to fetch from instead of a local file
    pub server_url: Option<Url>,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_file: None,
            server_url: None,
            cache_ttl: DEFAULT_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment
    pub fn from_env() -> RuleResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> RuleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let server_url = get(ENV_SERVER_URL)
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| {
                    RuleError::config(format!("{} is not a valid URL: {}", ENV_SERVER_URL, e))
                })
            })
            .transpose()?;

        let settings = Self {
            rules_file: get(ENV_RULES_FILE).map(PathBuf::from),
            server_url,
            cache_ttl: parse_secs(ENV_CACHE_TTL_SECS, get(ENV_CACHE_TTL_SECS))?
                .unwrap_or(defaults.cache_ttl),
            http_timeout: parse_secs(ENV_HTTP_TIMEOUT_SECS, get(ENV_HTTP_TIMEOUT_SECS))?
                .unwrap_or(defaults.http_timeout),
            port: get(ENV_PORT)
                .map(|raw| {
                    raw.trim().parse::<u16>().map_err(|_| {
                        RuleError::config(format!("{} must be a port number, got '{}'", ENV_PORT, raw))
                    })
                })
                .transpose()?
                .unwrap_or(defaults.port),
        };

        log::debug!(
            "Settings: rules_file={:?}, server_url={:?}, cache_ttl={}s, port={}",
            settings.rules_file,
            settings.server_url.as_ref().map(Url::as_str),
            settings.cache_ttl.as_secs(),
            settings.port
        );
        Ok(settings)
    }
}

fn parse_secs(key: &str, raw: Option<String>) -> RuleResult<Option<Duration>> {
    raw.map(|raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| RuleError::config(format!("{} must be whole seconds, got '{}'", key, raw)))
    })
    .transpose()
}
