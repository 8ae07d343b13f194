//! Provider configuration: provider block attributes with environment fallbacks

use crate::api::ClientConfig;
use std::time::Duration;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const ENV_HOST: &str = "LIGHTDASH_URL";
pub const ENV_TOKEN: &str = "LIGHTDASH_API_KEY";
pub const ENV_MAX_CONCURRENT_REQUESTS: &str = "LIGHTDASH_MAX_CONCURRENT_REQUESTS";
pub const ENV_REQUEST_TIMEOUT: &str = "LIGHTDASH_REQUEST_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "LIGHTDASH_MAX_RETRIES";
pub const ENV_RETRY_BACKOFF_MS: &str = "LIGHTDASH_RETRY_BACKOFF_MS";

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: i64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: i64 = 500;

/// Inclusive bounds for each numeric setting
pub const MAX_CONCURRENT_REQUESTS_RANGE: (i64, i64) = (1, 100);
pub const REQUEST_TIMEOUT_RANGE: (i64, i64) = (1, 3600);
pub const MAX_RETRIES_RANGE: (i64, i64) = (0, 10);
pub const RETRY_BACKOFF_MS_RANGE: (i64, i64) = (0, 60_000);

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub host: String,
    pub token: String,
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl ProviderConfig {
    /// Reads the provider block, falling back to the process environment
    pub fn resolve(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(config: &DynamicValue, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Vec::new();

        let host = string_setting(config, "host", ENV_HOST, &env, &mut diagnostics);
        let token = string_setting(config, "token", ENV_TOKEN, &env, &mut diagnostics);

        let max_concurrent_requests = number_setting(
            config,
            "max_concurrent_requests",
            ENV_MAX_CONCURRENT_REQUESTS,
            DEFAULT_MAX_CONCURRENT_REQUESTS,
            MAX_CONCURRENT_REQUESTS_RANGE,
            &env,
            &mut diagnostics,
        );
        let request_timeout = number_setting(
            config,
            "request_timeout",
            ENV_REQUEST_TIMEOUT,
            DEFAULT_REQUEST_TIMEOUT_SECS,
            REQUEST_TIMEOUT_RANGE,
            &env,
            &mut diagnostics,
        );
        let max_retries = number_setting(
            config,
            "max_retries",
            ENV_MAX_RETRIES,
            DEFAULT_MAX_RETRIES,
            MAX_RETRIES_RANGE,
            &env,
            &mut diagnostics,
        );
        let retry_backoff_ms = number_setting(
            config,
            "retry_backoff_ms",
            ENV_RETRY_BACKOFF_MS,
            DEFAULT_RETRY_BACKOFF_MS,
            RETRY_BACKOFF_MS_RANGE,
            &env,
            &mut diagnostics,
        );

        if host.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Lightdash host",
                    format!(
                        "Set the provider 'host' attribute or the {} environment variable",
                        ENV_HOST
                    ),
                )
                .with_attribute(AttributePath::new("host")),
            );
        }
        if token.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Lightdash API token",
                    format!(
                        "Set the provider 'token' attribute or the {} environment variable",
                        ENV_TOKEN
                    ),
                )
                .with_attribute(AttributePath::new("token")),
            );
        }

        match (
            host,
            token,
            max_concurrent_requests,
            request_timeout,
            max_retries,
            retry_backoff_ms,
        ) {
            (
                Some(host),
                Some(token),
                Some(max_concurrent_requests),
                Some(request_timeout),
                Some(max_retries),
                Some(retry_backoff_ms),
            ) if diagnostics.is_empty() => Ok(Self {
                host,
                token,
                max_concurrent_requests: max_concurrent_requests as usize,
                request_timeout: Duration::from_secs(u64::from(request_timeout)),
                max_retries,
                retry_backoff: Duration::from_millis(u64::from(retry_backoff_ms)),
            }),
            _ => Err(diagnostics),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
        }
    }
}

fn string_setting<F>(
    config: &DynamicValue,
    attribute: &str,
    env_key: &str,
    env: &F,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match config.get(&AttributePath::new(attribute)) {
        Some(Dynamic::String(value)) if !value.trim().is_empty() => Some(value.clone()),
        Some(Dynamic::Unknown) => {
            diagnostics.push(unknown_value(attribute));
            None
        }
        _ => env(env_key).filter(|value| !value.trim().is_empty()),
    }
}

/// Resolves a whole number within the inclusive `range`. Every range fits in `u32`.
fn number_setting<F>(
    config: &DynamicValue,
    attribute: &str,
    env_key: &str,
    default: i64,
    range: (i64, i64),
    env: &F,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let (minimum, maximum) = range;
    let path = AttributePath::new(attribute);
    let out_of_range = |shown: String| {
        Diagnostic::error(
            format!("Invalid {}", attribute),
            format!(
                "{} must be between {} and {}, got {}",
                attribute, minimum, maximum, shown
            ),
        )
        .with_attribute(path.clone())
    };

    let value = match config.get(&path) {
        Some(Dynamic::Number(n)) => {
            if n.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid {}", attribute),
                        format!("{} must be a whole number, got {}", attribute, n),
                    )
                    .with_attribute(path.clone()),
                );
                return None;
            }
            if *n < minimum as f64 || *n > maximum as f64 {
                diagnostics.push(out_of_range(n.to_string()));
                return None;
            }
            *n as i64
        }
        Some(Dynamic::Unknown) => {
            diagnostics.push(unknown_value(attribute));
            return None;
        }
        _ => match env(env_key) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(v) => v,
                Err(_) => {
                    diagnostics.push(Diagnostic::error(
                        format!("Invalid {}", env_key),
                        format!("{} must be an integer, got '{}'", env_key, raw),
                    ));
                    return None;
                }
            },
            None => default,
        },
    };

    if !(minimum..=maximum).contains(&value) {
        diagnostics.push(out_of_range(value.to_string()));
        return None;
    }
    u32::try_from(value).ok()
}

fn unknown_value(attribute: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Unknown {}", attribute),
        format!(
            "The provider cannot be configured while '{}' is unknown; apply its dependencies first",
            attribute
        ),
    )
    .with_attribute(AttributePath::new(attribute))
}
