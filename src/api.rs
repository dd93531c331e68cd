//! Remote operation ports consumed by the provisioning core.
//!
//! Each trait covers one resource kind. Transports implement them against
//! the real API; [`crate::test_support::FakeCloud`] implements all of them in
//! memory. Method names carry the resource kind so one client type can
//! implement every port without call-site ambiguity.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::Ipv4Addr;
use std::pin::Pin;

use crate::context::Context;
use crate::error::RemoteError;
use crate::model::{
    Archive, Cdrom, ContainerRegistry, ContainerRegistryCreateRequest,
    ContainerRegistryUpdateRequest, Database, DatabaseCreateRequest, DatabaseStatus,
    DatabaseUpdateRequest, Disk, DiskCreateRequest, DiskEditRequest, DiskPlan, DiskUpdateRequest,
    FindCondition, GeneratedSshKey, InterfaceUpdateRequest, LocalRouter, LocalRouterCreateRequest,
    LocalRouterSettings, MobileGateway, MobileGatewayCreateRequest, MobileGatewayDns,
    MobileGatewayUpdateRequest, Note, NoteCreateRequest, PacketFilter, RegistryUser, Server,
    ServerCreateRequest, ServerPlan, ServerUpdateRequest, Sim, SshKey, SshKeyGenerateRequest,
    Switch, TrafficConfig, VpcRouter, VpcRouterCreateRequest, VpcRouterUpdateRequest,
};
use crate::types::{ResourceId, Zone};

/// Future returned by port operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Disk operations.
pub trait DiskApi: Send + Sync {
    /// Creates a plain disk, optionally placed away from `distant_from`.
    fn create_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a DiskCreateRequest,
        distant_from: &'a [ResourceId],
    ) -> RemoteFuture<'a, Disk>;

    /// Creates a disk and applies `edit` to it once copied.
    fn create_disk_with_config<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a DiskCreateRequest,
        edit: &'a DiskEditRequest,
        boot_at_available: bool,
        distant_from: &'a [ResourceId],
    ) -> RemoteFuture<'a, Disk>;

    /// Reads a disk.
    fn read_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Disk>;

    /// Updates disk metadata.
    fn update_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        request: &'a DiskUpdateRequest,
    ) -> RemoteFuture<'a, Disk>;

    /// Deletes a disk.
    fn delete_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Connects an existing disk to a server.
    fn connect_disk_to_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        server_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Re-applies an edit to an existing disk.
    fn config_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        edit: &'a DiskEditRequest,
    ) -> RemoteFuture<'a, ()>;
}

/// Archive operations.
pub trait ArchiveApi: Send + Sync {
    /// Reads an archive.
    fn read_archive<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Archive>;

    /// Lists archives matching `condition`.
    fn find_archives<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        condition: &'a FindCondition,
    ) -> RemoteFuture<'a, Vec<Archive>>;
}

/// Disk plan catalogue.
pub trait DiskPlanApi: Send + Sync {
    /// Reads a disk plan and its orderable sizes.
    fn read_disk_plan<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, DiskPlan>;
}

/// SSH key operations (global).
pub trait SshKeyApi: Send + Sync {
    /// Generates a key pair on the remote and stores its public half.
    fn generate_ssh_key<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a SshKeyGenerateRequest,
    ) -> RemoteFuture<'a, GeneratedSshKey>;

    /// Reads a stored key.
    fn read_ssh_key<'a>(&'a self, ctx: &'a Context, id: ResourceId) -> RemoteFuture<'a, SshKey>;

    /// Deletes a stored key.
    fn delete_ssh_key<'a>(&'a self, ctx: &'a Context, id: ResourceId) -> RemoteFuture<'a, ()>;
}

/// Note (startup script) operations (global).
pub trait NoteApi: Send + Sync {
    /// Creates a note.
    fn create_note<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a NoteCreateRequest,
    ) -> RemoteFuture<'a, Note>;

    /// Reads a note.
    fn read_note<'a>(&'a self, ctx: &'a Context, id: ResourceId) -> RemoteFuture<'a, Note>;

    /// Deletes a note.
    fn delete_note<'a>(&'a self, ctx: &'a Context, id: ResourceId) -> RemoteFuture<'a, ()>;
}

/// Server operations.
pub trait ServerApi: Send + Sync {
    /// Creates a stopped server shell with its NICs declared.
    fn create_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a ServerCreateRequest,
    ) -> RemoteFuture<'a, Server>;

    /// Reads a server.
    fn read_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Server>;

    /// Updates server metadata.
    fn update_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        request: &'a ServerUpdateRequest,
    ) -> RemoteFuture<'a, Server>;

    /// Deletes a server.
    fn delete_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a boot.
    fn boot_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a shutdown; `force` pulls the virtual power cord.
    fn shutdown_server<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        force: bool,
    ) -> RemoteFuture<'a, ()>;

    /// Moves a stopped server to another plan. The remote assigns a new id.
    fn change_server_plan<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        plan_id: ResourceId,
    ) -> RemoteFuture<'a, Server>;

    /// Inserts an ISO image.
    fn insert_cdrom<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        cdrom_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Ejects an ISO image.
    fn eject_cdrom<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        cdrom_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;
}

/// Server plan catalogue.
pub trait ServerPlanApi: Send + Sync {
    /// Lists the server plans offered in `zone`.
    fn find_server_plans<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
    ) -> RemoteFuture<'a, Vec<ServerPlan>>;
}

/// Switch lookups.
pub trait SwitchApi: Send + Sync {
    /// Reads a switch.
    fn read_switch<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Switch>;
}

/// Packet filter lookups.
pub trait PacketFilterApi: Send + Sync {
    /// Reads a packet filter.
    fn read_packet_filter<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, PacketFilter>;
}

/// NIC operations.
pub trait InterfaceApi: Send + Sync {
    /// Binds a packet filter to a NIC.
    fn connect_to_packet_filter<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        interface_id: ResourceId,
        packet_filter_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Updates NIC metadata.
    fn update_interface<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        interface_id: ResourceId,
        request: &'a InterfaceUpdateRequest,
    ) -> RemoteFuture<'a, ()>;
}

/// ISO image lookups.
pub trait CdromApi: Send + Sync {
    /// Reads an ISO image.
    fn read_cdrom<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Cdrom>;
}

/// Database appliance operations.
pub trait DatabaseApi: Send + Sync {
    /// Creates a database appliance; it boots on its own.
    fn create_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a DatabaseCreateRequest,
    ) -> RemoteFuture<'a, Database>;

    /// Reads a database appliance.
    fn read_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Database>;

    /// Updates metadata and settings, guarded by the settings hash.
    fn update_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        request: &'a DatabaseUpdateRequest,
    ) -> RemoteFuture<'a, Database>;

    /// Deletes a database appliance.
    fn delete_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a boot.
    fn boot_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a shutdown.
    fn shutdown_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        force: bool,
    ) -> RemoteFuture<'a, ()>;

    /// Applies saved settings to the running appliance.
    fn config_database<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Sets engine parameters.
    fn set_database_parameters<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        parameters: &'a BTreeMap<String, serde_json::Value>,
    ) -> RemoteFuture<'a, ()>;

    /// Reads the health of the engine inside the appliance.
    fn database_status<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, DatabaseStatus>;
}

/// VPC router operations.
pub trait VpcRouterApi: Send + Sync {
    /// Creates a VPC router.
    fn create_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a VpcRouterCreateRequest,
    ) -> RemoteFuture<'a, VpcRouter>;

    /// Reads a VPC router.
    fn read_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, VpcRouter>;

    /// Updates metadata and settings, guarded by the settings hash.
    fn update_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        request: &'a VpcRouterUpdateRequest,
    ) -> RemoteFuture<'a, VpcRouter>;

    /// Deletes a VPC router.
    fn delete_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a boot.
    fn boot_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a shutdown.
    fn shutdown_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        force: bool,
    ) -> RemoteFuture<'a, ()>;

    /// Plugs private NIC `index` into a switch.
    fn connect_vpc_router_to_switch<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        index: u8,
        switch_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Applies saved settings to the running router.
    fn config_vpc_router<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;
}

/// Mobile gateway operations.
pub trait MobileGatewayApi: Send + Sync {
    /// Creates a mobile gateway.
    fn create_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        request: &'a MobileGatewayCreateRequest,
    ) -> RemoteFuture<'a, MobileGateway>;

    /// Reads a mobile gateway.
    fn read_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, MobileGateway>;

    /// Updates metadata and settings, guarded by the settings hash.
    fn update_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        request: &'a MobileGatewayUpdateRequest,
    ) -> RemoteFuture<'a, MobileGateway>;

    /// Deletes a mobile gateway.
    fn delete_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a boot.
    fn boot_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Requests a shutdown.
    fn shutdown_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        force: bool,
    ) -> RemoteFuture<'a, ()>;

    /// Plugs the private NIC into a switch.
    fn connect_mobile_gateway_to_switch<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        switch_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Applies saved settings to the running gateway.
    fn config_mobile_gateway<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Sets the resolvers handed to SIMs.
    fn set_mobile_gateway_dns<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        dns: &'a MobileGatewayDns,
    ) -> RemoteFuture<'a, ()>;

    /// Registers a SIM with the gateway.
    fn add_sim<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        sim_id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Sets the traffic quota and shaping.
    fn set_traffic_config<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
        config: &'a TrafficConfig,
    ) -> RemoteFuture<'a, ()>;
}

/// SIM operations (global).
pub trait SimApi: Send + Sync {
    /// Reads a SIM.
    fn read_sim<'a>(&'a self, ctx: &'a Context, id: ResourceId) -> RemoteFuture<'a, Sim>;

    /// Assigns the SIM's address inside its gateway's network.
    fn assign_sim_ip<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
        ip_address: Ipv4Addr,
    ) -> RemoteFuture<'a, ()>;
}

/// Container registry operations (global).
pub trait ContainerRegistryApi: Send + Sync {
    /// Creates a registry.
    fn create_container_registry<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a ContainerRegistryCreateRequest,
    ) -> RemoteFuture<'a, ContainerRegistry>;

    /// Reads a registry.
    fn read_container_registry<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
    ) -> RemoteFuture<'a, ContainerRegistry>;

    /// Updates registry metadata.
    fn update_container_registry<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
        request: &'a ContainerRegistryUpdateRequest,
    ) -> RemoteFuture<'a, ContainerRegistry>;

    /// Deletes a registry.
    fn delete_container_registry<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;

    /// Adds a user.
    fn add_registry_user<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
        user: &'a RegistryUser,
    ) -> RemoteFuture<'a, ()>;

    /// Removes a user.
    fn delete_registry_user<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
        user_name: &'a str,
    ) -> RemoteFuture<'a, ()>;
}

/// Local router operations (global).
pub trait LocalRouterApi: Send + Sync {
    /// Creates a local router.
    fn create_local_router<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a LocalRouterCreateRequest,
    ) -> RemoteFuture<'a, LocalRouter>;

    /// Reads a local router.
    fn read_local_router<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
    ) -> RemoteFuture<'a, LocalRouter>;

    /// Replaces the router settings, guarded by the settings hash.
    fn update_local_router_settings<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
        settings: &'a LocalRouterSettings,
        settings_hash: &'a str,
    ) -> RemoteFuture<'a, LocalRouter>;

    /// Deletes a local router.
    fn delete_local_router<'a>(
        &'a self,
        ctx: &'a Context,
        id: ResourceId,
    ) -> RemoteFuture<'a, ()>;
}
