//! Environment-driven runtime configuration.

use std::path::PathBuf;

use swiftkyc_remote::api::ApiRoutes;
use swiftkyc_remote::validate_api_base;
use tracing::warn;

use crate::AppError;
use crate::retry::RetryPolicy;

/// API root URL.
pub const ENV_API_BASE: &str = "SWIFTKYC_API_BASE";
/// Prefix for wizard `/session...` routes.
pub const ENV_WIZARD_PREFIX: &str = "SWIFTKYC_WIZARD_PREFIX";
/// Prefix for admin `/sessions...` routes.
pub const ENV_ADMIN_PREFIX: &str = "SWIFTKYC_ADMIN_PREFIX";
/// Session storage file.
pub const ENV_SESSION_FILE: &str = "SWIFTKYC_SESSION_FILE";
/// Request timeout in milliseconds.
pub const ENV_HTTP_TIMEOUT_MS: &str = "SWIFTKYC_HTTP_TIMEOUT_MS";
/// Optional cap on upload redisplays.
pub const ENV_UPLOAD_MAX_ATTEMPTS: &str = "SWIFTKYC_UPLOAD_MAX_ATTEMPTS";
/// Image file served as the camera.
pub const ENV_CAMERA_IMAGE: &str = "SWIFTKYC_CAMERA_IMAGE";
/// Optional log file.
pub const ENV_LOG_FILE: &str = "SWIFTKYC_LOG_FILE";

/// Default API root.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";
/// Default session storage file.
pub const DEFAULT_SESSION_FILE: &str = "swiftkyc-session.json";
/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Validated API root.
    pub api_base: String,
    /// Route prefixes.
    pub routes: ApiRoutes,
    /// Session storage file.
    pub session_file: PathBuf,
    /// Request timeout.
    pub http_timeout_ms: u64,
    /// Upload redisplay policy.
    pub retry: RetryPolicy,
    /// Image served by the still-image camera, if configured.
    pub camera_image: Option<PathBuf>,
    /// Log destination; stderr when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            routes: ApiRoutes::default(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            camera_image: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Reads configuration from process environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the API base is not an http(s) URL.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    ///
    /// Malformed numbers fall back to defaults with a warning.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the API base is not an http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let defaults = Self::default();

        let api_base = value(ENV_API_BASE).unwrap_or(defaults.api_base);
        validate_api_base(&api_base)
            .map_err(|error| AppError::Config(format!("{ENV_API_BASE}: {error}")))?;

        let routes = ApiRoutes {
            wizard_prefix: value(ENV_WIZARD_PREFIX)
                .map(|prefix| normalize_prefix(&prefix))
                .unwrap_or(defaults.routes.wizard_prefix),
            admin_prefix: value(ENV_ADMIN_PREFIX)
                .map(|prefix| normalize_prefix(&prefix))
                .unwrap_or(defaults.routes.admin_prefix),
        };

        let http_timeout_ms = value(ENV_HTTP_TIMEOUT_MS)
            .and_then(|raw| parse_positive(ENV_HTTP_TIMEOUT_MS, &raw))
            .unwrap_or(defaults.http_timeout_ms);

        let max_attempts = value(ENV_UPLOAD_MAX_ATTEMPTS)
            .and_then(|raw| parse_positive(ENV_UPLOAD_MAX_ATTEMPTS, &raw))
            .and_then(|attempts| u32::try_from(attempts).ok());

        Ok(Self {
            api_base,
            routes,
            session_file: value(ENV_SESSION_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            http_timeout_ms,
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
            camera_image: value(ENV_CAMERA_IMAGE).map(PathBuf::from),
            log_file: value(ENV_LOG_FILE).map(PathBuf::from),
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Option<u64> {
    match raw.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Some(parsed),
        _ => {
            warn!(stage = "config", action = "fallback", key, value = raw);
            None
        }
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
