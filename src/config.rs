//! Timing configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ProvisionError;
use crate::power::{
    DEFAULT_BOOT_RETRY_SPAN, DEFAULT_INITIAL_REQUEST_TIMEOUT, DEFAULT_INITIAL_RETRY_SPAN,
    DEFAULT_SHUTDOWN_RETRY_SPAN, RetryPolicy,
};
use crate::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, WaitOptions};

/// Timing knobs for waiters and the power controller, derived from
/// environment variables, configuration files and CLI flags.
///
/// Values are milliseconds so they can be expressed in every source.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "KUMO")]
pub struct TimingConfig {
    /// Interval between two polls of a waited-on resource.
    #[ortho_config(default = 5_000)]
    pub poll_interval_ms: u64,
    /// Overall budget of a single wait loop.
    #[ortho_config(default = 1_200_000)]
    pub wait_timeout_ms: u64,
    /// Pause between attempts while a power request is rejected as
    /// "still creating".
    #[ortho_config(default = 20_000)]
    pub initial_retry_span_ms: u64,
    /// Interval after which an unanswered boot request is re-issued.
    #[ortho_config(default = 20_000)]
    pub boot_retry_span_ms: u64,
    /// Interval after which an unanswered shutdown request is re-issued.
    #[ortho_config(default = 20_000)]
    pub shutdown_retry_span_ms: u64,
    /// Budget for getting the first power request accepted.
    #[ortho_config(default = 30_000)]
    pub initial_request_timeout_ms: u64,
}

/// Resolved timing handed to builders, waiters and the power controller.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Timing {
    /// Options for every wait loop a builder runs.
    pub wait: WaitOptions,
    /// Retry policy for power requests.
    pub power: RetryPolicy,
}

impl Timing {
    /// Uniform timing for tests: every interval and span is `tick`, every
    /// budget is `budget`.
    #[must_use]
    pub const fn uniform(tick: Duration, budget: Duration) -> Self {
        Self {
            wait: WaitOptions::new(tick, budget),
            power: RetryPolicy {
                initial_retry_span: tick,
                boot_retry_span: tick,
                shutdown_retry_span: tick,
                initial_request_timeout: budget,
            },
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: millis(DEFAULT_POLL_INTERVAL),
            wait_timeout_ms: millis(DEFAULT_WAIT_TIMEOUT),
            initial_retry_span_ms: millis(DEFAULT_INITIAL_RETRY_SPAN),
            boot_retry_span_ms: millis(DEFAULT_BOOT_RETRY_SPAN),
            shutdown_retry_span_ms: millis(DEFAULT_SHUTDOWN_RETRY_SPAN),
            initial_request_timeout_ms: millis(DEFAULT_INITIAL_REQUEST_TIMEOUT),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl TimingConfig {
    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: set {} or the top-level {} key in kumo.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("kumo")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Rejects zero intervals and budgets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            (
                self.poll_interval_ms,
                FieldMetadata::new(
                    "poll interval",
                    "KUMO_POLL_INTERVAL_MS",
                    "poll_interval_ms",
                ),
            ),
            (
                self.wait_timeout_ms,
                FieldMetadata::new("wait timeout", "KUMO_WAIT_TIMEOUT_MS", "wait_timeout_ms"),
            ),
            (
                self.initial_retry_span_ms,
                FieldMetadata::new(
                    "initial retry span",
                    "KUMO_INITIAL_RETRY_SPAN_MS",
                    "initial_retry_span_ms",
                ),
            ),
            (
                self.boot_retry_span_ms,
                FieldMetadata::new(
                    "boot retry span",
                    "KUMO_BOOT_RETRY_SPAN_MS",
                    "boot_retry_span_ms",
                ),
            ),
            (
                self.shutdown_retry_span_ms,
                FieldMetadata::new(
                    "shutdown retry span",
                    "KUMO_SHUTDOWN_RETRY_SPAN_MS",
                    "shutdown_retry_span_ms",
                ),
            ),
            (
                self.initial_request_timeout_ms,
                FieldMetadata::new(
                    "initial request timeout",
                    "KUMO_INITIAL_REQUEST_TIMEOUT_MS",
                    "initial_request_timeout_ms",
                ),
            ),
        ];
        for (value, metadata) in &fields {
            Self::require_positive(*value, metadata)?;
        }
        Ok(())
    }

    /// Validates the configuration and converts it into [`Timing`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any value is zero.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        self.validate()?;
        Ok(Timing {
            wait: WaitOptions::new(
                Duration::from_millis(self.poll_interval_ms),
                Duration::from_millis(self.wait_timeout_ms),
            ),
            power: RetryPolicy {
                initial_retry_span: Duration::from_millis(self.initial_retry_span_ms),
                boot_retry_span: Duration::from_millis(self.boot_retry_span_ms),
                shutdown_retry_span: Duration::from_millis(self.shutdown_retry_span_ms),
                initial_request_timeout: Duration::from_millis(self.initial_request_timeout_ms),
            },
        })
    }
}

/// Loads timing from configuration files and the environment and resolves
/// it for builders.
///
/// # Errors
///
/// Returns [`ProvisionError::Config`] when the sources cannot be merged or a
/// value is out of range.
pub fn load_timing() -> Result<Timing, ProvisionError> {
    let config = TimingConfig::load_without_cli_args()?;
    Ok(config.timing()?)
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configuration value is out of range.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
