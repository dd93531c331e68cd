//! Shared fixtures for server provisioning BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use kumo::builder::disk::{OsType, SshKeyGeneration, UnixDisk, UnixEditParams};
use kumo::builder::{BuildResult, DiskBuilder, DiskSpec, NicSpec, ServerBuilder};
use kumo::model::{
    Archive, Availability, Commitment, PlanGeneration, ServerPlan, ServerPlanQuery,
    SwitchConnection,
};
use kumo::test_support::FakeCloud;
use kumo::{ProvisionError, ResourceId, Tag, Timing, Zone};
use rstest::fixture;

pub const DISK_PLAN: ResourceId = ResourceId::new(4);
pub const UBUNTU: ResourceId = ResourceId::new(110);
pub const SERVER_PLAN: ResourceId = ResourceId::new(10);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    Validation,
    NotFound,
    Remote,
    Other,
}

#[derive(Clone, Debug)]
pub enum BuildOutcome {
    Success(BuildResult),
    Failure { kind: FailureKind, message: String },
}

impl BuildOutcome {
    pub fn from_result(result: Result<BuildResult, ProvisionError>) -> Self {
        match result {
            Ok(built) => Self::Success(built),
            Err(err) => Self::Failure {
                kind: match err {
                    ProvisionError::Validation { .. } => FailureKind::Validation,
                    ProvisionError::NotFound { .. } => FailureKind::NotFound,
                    ProvisionError::Remote { .. } => FailureKind::Remote,
                    _ => FailureKind::Other,
                },
                message: err.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProvisioningContext {
    pub cloud: Arc<FakeCloud>,
    pub zone: Zone,
    pub builder: Option<ServerBuilder>,
    pub outcome: Option<BuildOutcome>,
}

#[fixture]
pub fn provisioning_context() -> ProvisioningContext {
    ProvisioningContext {
        cloud: Arc::new(FakeCloud::new()),
        zone: Zone::from("is1b"),
        builder: None,
        outcome: None,
    }
}

pub fn seed_zone(cloud: &FakeCloud) {
    cloud.insert_server_plan(ServerPlan {
        id: SERVER_PLAN,
        cpu: 2,
        memory_gb: 4,
        gpu: 0,
        commitment: Commitment::Standard,
        generation: PlanGeneration::G200,
        availability: Availability::Available,
    });
    cloud.insert_disk_plan(DISK_PLAN, "SSD", &[20, 40]);
    cloud.insert_archive(Archive {
        id: UBUNTU,
        name: String::from("Ubuntu Server"),
        tags: ["current-stable", "distro-ubuntu", "os-linux"]
            .into_iter()
            .map(Tag::from)
            .collect(),
        ..Archive::default()
    });
}

pub fn ubuntu_server(size_gb: u32, boot_after_create: bool) -> ServerBuilder {
    ServerBuilder {
        name: String::from("web-1"),
        plan: ServerPlanQuery {
            cpu: 2,
            memory_gb: 4,
            generation: PlanGeneration::G200,
            ..ServerPlanQuery::default()
        },
        nic: Some(NicSpec {
            upstream: SwitchConnection::Shared,
            packet_filter_id: ResourceId::EMPTY,
            display_ip_address: None,
        }),
        disks: vec![DiskBuilder::FromUnix(UnixDisk {
            spec: DiskSpec {
                name: String::from("boot"),
                plan_id: DISK_PLAN,
                size_gb,
                ..DiskSpec::default()
            },
            os_type: OsType::Ubuntu,
            edit: UnixEditParams {
                host_name: Some(String::from("web-1")),
                generate_ssh_key: Some(SshKeyGeneration::default()),
                is_ssh_keys_ephemeral: true,
                ..UnixEditParams::default()
            },
        })],
        boot_after_create,
        timing: Timing::uniform(Duration::from_millis(1), Duration::from_secs(2)),
        ..ServerBuilder::default()
    }
}
