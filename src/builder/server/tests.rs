//! Unit tests for the server builder.

use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::builder::disk::{BlankDisk, DiskSpec, OsType, SshKeyGeneration, UnixDisk, UnixEditParams};
use crate::error::RemoteError;
use crate::model::{Archive, Availability, Commitment, PlanGeneration, RunStatus, ServerPlan};
use crate::test_support::{FakeCloud, still_creating};

const DISK_PLAN: ResourceId = ResourceId::new(4);
const UBUNTU: ResourceId = ResourceId::new(110);
const SWITCH: ResourceId = ResourceId::new(500);
const FILTER: ResourceId = ResourceId::new(600);
const ISO: ResourceId = ResourceId::new(700);
const ISO_2: ResourceId = ResourceId::new(701);

fn plan(id: u64, cpu: u32, memory_gb: u32, generation: PlanGeneration) -> ServerPlan {
    ServerPlan {
        id: ResourceId::new(id),
        cpu,
        memory_gb,
        gpu: 0,
        commitment: Commitment::Standard,
        generation,
        availability: Availability::Available,
    }
}

fn query(cpu: u32, memory_gb: u32, generation: PlanGeneration) -> ServerPlanQuery {
    ServerPlanQuery {
        cpu,
        memory_gb,
        generation,
        ..ServerPlanQuery::default()
    }
}

fn zone() -> Zone {
    Zone::from("tk1a")
}

#[fixture]
fn cloud() -> FakeCloud {
    let cloud = FakeCloud::new();
    cloud.insert_server_plan(plan(10, 2, 4, PlanGeneration::G200));
    cloud.insert_server_plan(plan(11, 2, 4, PlanGeneration::G100));
    cloud.insert_server_plan(plan(12, 4, 8, PlanGeneration::G200));
    cloud.insert_server_plan(ServerPlan {
        availability: Availability::Discontinued,
        ..plan(13, 1, 1, PlanGeneration::G100)
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
    cloud.insert_switch(SWITCH);
    cloud.insert_packet_filter(FILTER);
    cloud.insert_cdrom(ISO);
    cloud.insert_cdrom(ISO_2);
    cloud
}

fn disk_spec(name: &str) -> DiskSpec {
    DiskSpec {
        name: name.to_owned(),
        plan_id: DISK_PLAN,
        size_gb: 20,
        ..DiskSpec::default()
    }
}

fn boot_disk() -> DiskBuilder {
    DiskBuilder::FromUnix(UnixDisk {
        spec: disk_spec("boot"),
        os_type: OsType::Ubuntu,
        edit: UnixEditParams {
            host_name: Some(String::from("web-1")),
            generate_ssh_key: Some(SshKeyGeneration::default()),
            is_ssh_keys_ephemeral: true,
            ..UnixEditParams::default()
        },
    })
}

fn server() -> ServerBuilder {
    ServerBuilder {
        name: String::from("web-1"),
        plan: query(2, 4, PlanGeneration::G200),
        nic: Some(NicSpec {
            upstream: SwitchConnection::Shared,
            packet_filter_id: FILTER,
            display_ip_address: None,
        }),
        additional_nics: vec![NicSpec {
            upstream: SwitchConnection::Switch(SWITCH),
            packet_filter_id: ResourceId::EMPTY,
            display_ip_address: Some(Ipv4Addr::new(192, 168, 0, 11)),
        }],
        disks: vec![
            boot_disk(),
            DiskBuilder::Blank(BlankDisk {
                spec: disk_spec("data"),
            }),
        ],
        cdrom_id: ISO,
        boot_after_create: true,
        timing: Timing::uniform(Duration::from_millis(10), Duration::from_secs(5)),
        ..ServerBuilder::default()
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn build_runs_the_plan_in_order(cloud: FakeCloud) {
    let result = server()
        .build(&Context::new(), &cloud, &zone())
        .await
        .expect("build server");

    assert_eq!(
        cloud.mutating_calls(),
        vec![
            "create_server",
            "generate_ssh_key",
            "create_disk_with_config",
            "delete_ssh_key",
            "create_disk",
            "connect_to_packet_filter",
            "update_interface",
            "insert_cdrom",
            "boot_server",
        ]
    );
    assert!(result.generated_ssh_private_key.is_some());

    let built = cloud.server(result.id).expect("server exists");
    assert_eq!(built.plan_id, ResourceId::new(10));
    assert_eq!(built.instance_status, RunStatus::Up);
    assert_eq!(built.disk_ids.len(), 2);
    assert_eq!(built.cdrom_id, ISO);
    let first = built.interfaces.first().expect("primary NIC");
    assert_eq!(first.upstream, SwitchConnection::Shared);
    assert_eq!(first.packet_filter_id, FILTER);
    let second = built.interfaces.get(1).expect("additional NIC");
    assert_eq!(second.upstream, SwitchConnection::Switch(SWITCH));
    assert_eq!(second.user_ip_address, Some(Ipv4Addr::new(192, 168, 0, 11)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn boot_is_skipped_unless_requested(cloud: FakeCloud) {
    let builder = ServerBuilder {
        boot_after_create: false,
        disks: Vec::new(),
        ..server()
    };
    let result = builder
        .build(&Context::new(), &cloud, &zone())
        .await
        .expect("build server");
    assert_eq!(
        cloud.server(result.id).map(|built| built.instance_status),
        Some(RunStatus::Down)
    );
    assert_eq!(cloud.call_count("boot_server"), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn boot_retries_while_the_server_is_still_creating(cloud: FakeCloud) {
    cloud.fail_times("boot_server", 2, &still_creating());
    let builder = ServerBuilder {
        disks: Vec::new(),
        ..server()
    };
    let result = builder
        .build(&Context::new(), &cloud, &zone())
        .await
        .expect("build server");
    assert_eq!(cloud.call_count("boot_server"), 3);
    assert_eq!(
        cloud.server(result.id).map(|built| built.instance_status),
        Some(RunStatus::Up)
    );
}

#[rstest]
#[case::exact_generation(query(2, 4, PlanGeneration::G100), Some(11))]
#[case::unique_shape(query(4, 8, PlanGeneration::Default), Some(12))]
#[case::ambiguous_shape(query(2, 4, PlanGeneration::Default), None)]
#[case::unknown_shape(query(3, 4, PlanGeneration::Default), None)]
#[case::discontinued(query(1, 1, PlanGeneration::G100), None)]
#[tokio::test]
async fn plan_lookup_needs_exactly_one_match(
    cloud: FakeCloud,
    #[case] shape: ServerPlanQuery,
    #[case] expected: Option<u64>,
) {
    let builder = ServerBuilder {
        plan: shape,
        ..server()
    };
    let outcome = builder.resolve_plan(&Context::new(), &cloud, &zone()).await;
    match expected {
        Some(id) => assert_eq!(outcome.expect("plan resolves"), ResourceId::new(id)),
        None => assert!(matches!(outcome, Err(ProvisionError::Validation { .. }))),
    }
}

#[rstest]
#[case::orphan_additional_nics(ServerBuilder { nic: None, ..server() })]
#[case::too_many_nics(ServerBuilder {
    additional_nics: vec![NicSpec::default(); MAX_ADDITIONAL_NICS + 1],
    ..server()
})]
#[case::display_address_on_shared(ServerBuilder {
    nic: Some(NicSpec {
        upstream: SwitchConnection::Shared,
        packet_filter_id: ResourceId::EMPTY,
        display_ip_address: Some(Ipv4Addr::new(10, 0, 0, 1)),
    }),
    ..server()
})]
#[case::blank_name(ServerBuilder { name: String::new(), ..server() })]
#[tokio::test]
async fn invalid_servers_are_rejected_before_creation(
    cloud: FakeCloud,
    #[case] builder: ServerBuilder,
) {
    let err = builder
        .build(&Context::new(), &cloud, &zone())
        .await
        .expect_err("invalid server");
    assert!(matches!(err, ProvisionError::Validation { .. }));
    assert!(cloud.mutating_calls().is_empty());
}

#[rstest]
#[case::switch(ServerBuilder {
    additional_nics: vec![NicSpec {
        upstream: SwitchConnection::Switch(ResourceId::new(501)),
        ..NicSpec::default()
    }],
    ..server()
})]
#[case::packet_filter(ServerBuilder {
    nic: Some(NicSpec {
        packet_filter_id: ResourceId::new(601),
        ..NicSpec::default()
    }),
    ..server()
})]
#[case::cdrom(ServerBuilder { cdrom_id: ResourceId::new(702), ..server() })]
#[tokio::test]
async fn missing_references_are_not_found(cloud: FakeCloud, #[case] builder: ServerBuilder) {
    let err = builder
        .validate(&Context::new(), &cloud, &zone())
        .await
        .expect_err("missing reference");
    assert!(err.is_not_found());
}

#[rstest]
#[tokio::test]
async fn repeated_validation_issues_no_mutating_calls(cloud: FakeCloud) {
    let ctx = Context::new();
    let builder = server();
    for _ in 0..2 {
        builder
            .validate(&ctx, &cloud, &zone())
            .await
            .expect("validate server");
    }
    assert!(cloud.mutating_calls().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_disk_aborts_without_rollback(cloud: FakeCloud) {
    cloud.fail_next("create_disk", RemoteError::Transport(String::from("reset")));
    let builder = ServerBuilder {
        disks: vec![DiskBuilder::Blank(BlankDisk {
            spec: disk_spec("data"),
        })],
        ..server()
    };
    let err = builder
        .build(&Context::new(), &cloud, &zone())
        .await
        .expect_err("disk creation fails");

    assert!(matches!(
        err,
        ProvisionError::Remote { ref operation, .. } if operation == "create disk"
    ));
    assert_eq!(cloud.call_count("delete_server"), 0);
    assert_eq!(cloud.call_count("insert_cdrom"), 0);
    assert_eq!(cloud.call_count("boot_server"), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn plan_change_stops_the_server_and_boots_it_again(cloud: FakeCloud) {
    let ctx = Context::new();
    let builder = ServerBuilder {
        disks: Vec::new(),
        ..server()
    };
    let created = builder
        .build(&ctx, &cloud, &zone())
        .await
        .expect("build server");

    let resized = ServerBuilder {
        id: created.id,
        name: String::from("web-1-large"),
        plan: query(4, 8, PlanGeneration::G200),
        force_shutdown: true,
        boot_after_create: false,
        ..builder
    };
    let updated = resized
        .update(&ctx, &cloud, &zone())
        .await
        .expect("update server");

    assert_ne!(updated.id, created.id);
    assert_eq!(cloud.server(created.id), None);
    assert_eq!(cloud.shutdown_forces(), vec![true]);
    let server = cloud.server(updated.id).expect("server exists");
    assert_eq!(server.plan_id, ResourceId::new(12));
    assert_eq!(server.name, "web-1-large");
    assert_eq!(server.instance_status, RunStatus::Up);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn metadata_update_keeps_a_running_server_running(cloud: FakeCloud) {
    let ctx = Context::new();
    let builder = ServerBuilder {
        disks: Vec::new(),
        ..server()
    };
    let created = builder
        .build(&ctx, &cloud, &zone())
        .await
        .expect("build server");
    cloud.clear_calls();

    let renamed = ServerBuilder {
        id: created.id,
        description: String::from("front end"),
        cdrom_id: ISO_2,
        ..builder
    };
    let updated = renamed
        .update(&ctx, &cloud, &zone())
        .await
        .expect("update server");

    assert_eq!(updated.id, created.id);
    assert_eq!(
        cloud.mutating_calls(),
        vec!["update_server", "eject_cdrom", "insert_cdrom"]
    );
    assert_eq!(
        cloud.server(created.id).map(|server| server.cdrom_id),
        Some(ISO_2)
    );
}

#[rstest]
#[tokio::test]
async fn update_requires_an_existing_server(cloud: FakeCloud) {
    let err = server()
        .update(&Context::new(), &cloud, &zone())
        .await
        .expect_err("no id");
    assert!(matches!(err, ProvisionError::Validation { .. }));
}
