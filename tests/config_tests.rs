//! Loading and validation of timing configuration.

use std::time::Duration;

use kumo::ProvisionError;
use kumo::config::{ConfigError, TimingConfig, load_timing};
use kumo::test_support::EnvGuard;
use rstest::rstest;

#[tokio::test]
async fn environment_overrides_defaults() {
    let _guard = EnvGuard::set_vars(&[
        ("KUMO_POLL_INTERVAL_MS", "250"),
        ("KUMO_BOOT_RETRY_SPAN_MS", "1500"),
    ])
    .await;

    let config = TimingConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("timing config should load from env: {err}"));
    let timing = config
        .timing()
        .unwrap_or_else(|err| panic!("loaded config should validate: {err}"));

    assert_eq!(timing.wait.poll_interval, Duration::from_millis(250));
    assert_eq!(timing.power.boot_retry_span, Duration::from_millis(1500));
    assert_eq!(
        timing.wait.timeout,
        Duration::from_millis(TimingConfig::default().wait_timeout_ms)
    );
}

/// Every rejected field names its environment variable and its key in the
/// configuration file.
#[rstest]
#[case::poll_interval(
    TimingConfig { poll_interval_ms: 0, ..TimingConfig::default() },
    "KUMO_POLL_INTERVAL_MS",
    "poll_interval_ms"
)]
#[case::wait_timeout(
    TimingConfig { wait_timeout_ms: 0, ..TimingConfig::default() },
    "KUMO_WAIT_TIMEOUT_MS",
    "wait_timeout_ms"
)]
#[case::initial_retry_span(
    TimingConfig { initial_retry_span_ms: 0, ..TimingConfig::default() },
    "KUMO_INITIAL_RETRY_SPAN_MS",
    "initial_retry_span_ms"
)]
#[case::shutdown_retry_span(
    TimingConfig { shutdown_retry_span_ms: 0, ..TimingConfig::default() },
    "KUMO_SHUTDOWN_RETRY_SPAN_MS",
    "shutdown_retry_span_ms"
)]
fn validation_errors_are_actionable(
    #[case] config: TimingConfig,
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let error = config.timing().expect_err("zero value should be rejected");
    let ConfigError::Invalid(ref message) = error else {
        panic!("expected Invalid error, got {error:?}");
    };
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
    assert!(
        message.contains("kumo.toml") && !message.contains("[timing]"),
        "error should point at the top-level key in the config file: {message}"
    );
}

#[tokio::test]
async fn load_timing_reports_invalid_sources_as_config_errors() {
    let _guard = EnvGuard::set_vars(&[("KUMO_WAIT_TIMEOUT_MS", "0")]).await;

    let error = load_timing().expect_err("zero wait timeout should be rejected");

    let ProvisionError::Config(ConfigError::Invalid(ref message)) = error else {
        panic!("expected a configuration error, got {error:?}");
    };
    assert!(
        message.contains("KUMO_WAIT_TIMEOUT_MS"),
        "error should mention env var: {message}"
    );
}
