//! BDD step definitions for server provisioning.

use kumo::Context;
use kumo::error::RemoteError;
use kumo::test_support::still_creating;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{BuildOutcome, FailureKind, ProvisioningContext, seed_zone, ubuntu_server};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a zone offering an Ubuntu archive")]
fn zone_with_ubuntu(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    seed_zone(&provisioning_context.cloud);
    provisioning_context
}

#[given("a server with an Ubuntu boot disk that boots after creation")]
fn booting_server(mut provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context.builder = Some(ubuntu_server(20, true));
    provisioning_context
}

#[given("a server with an Ubuntu boot disk of {size:u32} GB")]
fn server_with_disk_size(
    mut provisioning_context: ProvisioningContext,
    size: u32,
) -> ProvisioningContext {
    provisioning_context.builder = Some(ubuntu_server(size, false));
    provisioning_context
}

#[given("the remote reports the server as still creating {count:u32} times")]
fn still_creating_on_boot(
    provisioning_context: ProvisioningContext,
    count: u32,
) -> ProvisioningContext {
    provisioning_context
        .cloud
        .fail_times("boot_server", count, &still_creating());
    provisioning_context
}

#[given("disk creation fails")]
fn disk_creation_fails(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context.cloud.fail_next(
        "create_disk_with_config",
        RemoteError::api(500, "internal_error", "storage unavailable"),
    );
    provisioning_context
}

#[when("I build the server")]
fn build_server(
    mut provisioning_context: ProvisioningContext,
) -> Result<ProvisioningContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let builder = provisioning_context
        .builder
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("missing server description")))?;
    let cloud = provisioning_context.cloud.clone();
    let zone = provisioning_context.zone.clone();
    let result = runtime.block_on(async move {
        builder.build(&Context::new(), cloud.as_ref(), &zone).await
    });
    provisioning_context.outcome = Some(BuildOutcome::from_result(result));
    Ok(provisioning_context)
}

#[then("the build succeeds")]
fn build_succeeds(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    match &provisioning_context.outcome {
        Some(BuildOutcome::Success(_)) => Ok(()),
        Some(BuildOutcome::Failure { message, .. }) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the server is up")]
fn server_is_up(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let Some(BuildOutcome::Success(built)) = &provisioning_context.outcome else {
        return Err(StepError::Assertion(String::from("expected success outcome")));
    };
    let server = provisioning_context
        .cloud
        .server(built.id)
        .ok_or_else(|| StepError::Assertion(format!("server {} is missing", built.id)))?;
    if server.instance_status.is_up() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a running server, got {:?}",
            server.instance_status
        )))
    }
}

#[then("a generated private key is returned")]
fn private_key_returned(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let Some(BuildOutcome::Success(built)) = &provisioning_context.outcome else {
        return Err(StepError::Assertion(String::from("expected success outcome")));
    };
    match &built.generated_ssh_private_key {
        Some(key) if key.contains("PRIVATE KEY") => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a private key, got {other:?}"
        ))),
    }
}

#[then("the boot was requested {count:u32} times")]
fn boot_requested(
    provisioning_context: &ProvisioningContext,
    count: u32,
) -> Result<(), StepError> {
    let calls = provisioning_context.cloud.call_count("boot_server");
    if calls == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} boot requests, got {calls}"
        )))
    }
}

#[then("the build fails with a validation error")]
fn fails_with_validation(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    expect_failure(provisioning_context, FailureKind::Validation)
}

#[then("the build fails with a remote error")]
fn fails_with_remote(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    expect_failure(provisioning_context, FailureKind::Remote)
}

#[then("no mutating call was made")]
fn nothing_mutated(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let calls = provisioning_context.cloud.mutating_calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no mutating calls, got {calls:?}"
        )))
    }
}

#[then("the server remains down")]
fn server_remains_down(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let cloud = &provisioning_context.cloud;
    let created = cloud.call_count("create_server");
    let booted = cloud.call_count("boot_server");
    let deleted = cloud.call_count("delete_server");
    if created == 1 && booted == 0 && deleted == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected one created server left in place, got {created} created, \
             {booted} booted, {deleted} deleted"
        )))
    }
}

fn expect_failure(
    provisioning_context: &ProvisioningContext,
    expected: FailureKind,
) -> Result<(), StepError> {
    let Some(BuildOutcome::Failure { kind, message }) = &provisioning_context.outcome else {
        return Err(StepError::Assertion(String::from("expected failure outcome")));
    };
    if *kind == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected:?} failure, got {kind:?}: {message}"
        )))
    }
}
