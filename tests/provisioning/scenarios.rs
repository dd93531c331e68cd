//! BDD scenarios for server provisioning.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisioningContext, provisioning_context};

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Build a server from an Ubuntu archive and boot it"
)]
fn scenario_build_and_boot(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Retry the boot while the server is still being created"
)]
fn scenario_boot_retry(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Reject a disk size the plan does not offer"
)]
fn scenario_invalid_disk(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Abort without rollback when a disk cannot be created"
)]
fn scenario_disk_failure(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}
