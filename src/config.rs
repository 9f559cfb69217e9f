//! Runtime configuration for the attendance endpoint, the organizational
//! domain and the origin the capture runs under. Values come from the
//! environment (or the matching CLI flags) and fall back to local defaults so a
//! development checkout works without any setup. Configuration values are
//! public; do not store secrets here.

use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

/// Fallback when `ATTENDANCE_API_URL` is unset or blank.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_REQUIRED_DOMAIN: &str = "iiitdm.ac.in";
pub const DEFAULT_ORIGIN: &str = "http://localhost";

pub const ENV_API_URL: &str = "ATTENDANCE_API_URL";
pub const ENV_DOMAIN: &str = "ATTENDANCE_DOMAIN";
pub const ENV_ORIGIN: &str = "ATTENDANCE_ORIGIN";

/// Path of the attendance-marking endpoint relative to the API base URL.
pub const MARK_ATTENDANCE_PATH: &str = "/api/mark-attendance";
/// Route the workflow leaves to on success or go-back.
pub const HOME_ROUTE: &str = "/home";

/// Soft timeout after which a slow camera is reported to the user.
pub const ACQUISITION_ADVISORY_TIMEOUT: Duration = Duration::from_secs(5);
/// How long the success view stays up before navigating away.
pub const SUCCESS_DISPLAY_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub required_domain: String,
    pub origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            required_domain: DEFAULT_REQUIRED_DOMAIN.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads config from the environment, keeping defaults for unset or blank values.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_overrides(
            &mut config,
            Overrides {
                api_base_url: read_env(ENV_API_URL),
                required_domain: read_env(ENV_DOMAIN),
                origin: read_env(ENV_ORIGIN),
            },
        );
        config
    }

    /// Checks that both URLs parse and the domain looks like a host name.
    ///
    /// # Errors
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url("api_base_url", &self.api_base_url)?;
        parse_http_url("origin", &self.origin)?;

        let domain = self.required_domain.trim();
        if domain.is_empty() || domain.starts_with('@') || !domain.contains('.') {
            return Err(ConfigError::InvalidDomain(self.required_domain.clone()));
        }
        Ok(())
    }

    /// Full URL of the attendance endpoint.
    #[must_use]
    pub fn mark_attendance_url(&self) -> String {
        build_url_with_base(&self.api_base_url, MARK_ATTENDANCE_PATH)
    }

    /// Whether capture may run under the configured origin.
    #[must_use]
    pub fn is_secure_context(&self) -> bool {
        Url::parse(self.origin.trim()).is_ok_and(|url| is_secure_origin(&url))
    }
}

/// Optional overrides; `None` keeps the current value.
#[derive(Default, Debug)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub required_domain: Option<String>,
    pub origin: Option<String>,
}

pub fn apply_overrides(config: &mut AppConfig, overrides: Overrides) {
    if let Some(value) = overrides.api_base_url {
        config.api_base_url = value;
    }
    if let Some(value) = overrides.required_domain {
        config.required_domain = value;
    }
    if let Some(value) = overrides.origin {
        config.origin = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .and_then(|value| normalize_value(&value))
}

/// Trims a raw value and rejects it when empty.
#[must_use]
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Joins a base URL and a path with exactly one slash between them.
#[must_use]
pub fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Capture devices are only exposed to `https` origins and to localhost.
#[must_use]
pub fn is_secure_origin(origin: &Url) -> bool {
    if origin.scheme() == "https" {
        return true;
    }
    match origin.host() {
        Some(Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidUrl {
        field,
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}
