//! Appliance records: databases, VPC routers and mobile gateways.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::{Availability, RunStatus, SwitchConnection};
use crate::types::{ResourceId, Tag};

/// Database engine.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// MariaDB.
    #[default]
    MariaDb,
    /// PostgreSQL.
    PostgreSql,
}

/// Database appliance plan, named after its storage size.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DatabasePlan {
    /// 10 GiB.
    #[default]
    Db10g,
    /// 30 GiB.
    Db30g,
    /// 90 GiB.
    Db90g,
    /// 240 GiB.
    Db240g,
    /// 500 GiB.
    Db500g,
    /// 1 TiB.
    Db1t,
}

/// Service settings of a database appliance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseSettings {
    /// Default user.
    pub user_name: String,
    /// Password of the default user.
    pub password: String,
    /// Listen port; the engine default when unset.
    pub port: Option<u16>,
    /// Networks allowed to connect, in CIDR notation.
    pub source_networks: Vec<String>,
    /// Whether daily backups are taken.
    pub backup_enabled: bool,
}

/// A database appliance as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Database {
    /// Appliance identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the appliance.
    pub availability: Availability,
    /// Run status.
    pub instance_status: RunStatus,
    /// Plan.
    pub plan: DatabasePlan,
    /// Engine.
    pub database_type: DatabaseType,
    /// Switch the appliance is connected to.
    pub switch_id: ResourceId,
    /// Appliance address.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Service settings.
    pub settings: DatabaseSettings,
    /// Token guarding concurrent settings updates.
    pub settings_hash: String,
}

/// Parameters of a database creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Plan.
    pub plan: DatabasePlan,
    /// Engine.
    pub database_type: DatabaseType,
    /// Switch to connect to.
    pub switch_id: ResourceId,
    /// Appliance address.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Prefix length of the switch subnet.
    pub network_mask_len: u8,
    /// Default gateway.
    pub default_route: Option<Ipv4Addr>,
    /// Service settings.
    pub settings: DatabaseSettings,
}

/// Parameters of an in-place database update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Service settings.
    pub settings: DatabaseSettings,
    /// Token read together with the current settings.
    pub settings_hash: String,
}

/// Health of the database service inside the appliance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseStatus {
    /// Whether the engine accepts connections.
    pub is_up: bool,
    /// Engine version string.
    pub version: String,
}

/// VPC router plan.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum VpcRouterPlan {
    /// Single instance on the shared segment.
    #[default]
    Standard,
    /// Redundant pair behind a user switch.
    Premium,
    /// Redundant pair with higher throughput.
    HighSpec,
}

impl VpcRouterPlan {
    /// Returns `true` for the redundant plans that need explicit addressing.
    #[must_use]
    pub const fn is_redundant(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

/// A private NIC of a VPC router.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcRouterInterface {
    /// NIC index, 1 to 7.
    pub index: u8,
    /// Switch the NIC is plugged into.
    pub switch_id: ResourceId,
    /// Shared address of the redundant pair.
    pub virtual_ip: Option<Ipv4Addr>,
    /// Real addresses (one per instance of the pair).
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Prefix length of the switch subnet.
    pub network_mask_len: u8,
}

/// Router settings of a VPC router.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcRouterSettings {
    /// Virtual router id of the redundant pair.
    pub vrid: Option<u8>,
    /// Whether the router routes to the internet.
    pub internet_connection_enabled: bool,
    /// Private NICs.
    pub interfaces: Vec<VpcRouterInterface>,
    /// Remote syslog target.
    pub syslog_host: Option<String>,
}

/// A VPC router as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcRouter {
    /// Appliance identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the appliance.
    pub availability: Availability,
    /// Run status.
    pub instance_status: RunStatus,
    /// Plan.
    pub plan: VpcRouterPlan,
    /// Router settings.
    pub settings: VpcRouterSettings,
    /// Token guarding concurrent settings updates.
    pub settings_hash: String,
}

/// Parameters of a VPC router creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcRouterCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Plan.
    pub plan: VpcRouterPlan,
    /// Upstream of the public NIC.
    pub public_upstream: SwitchConnection,
    /// Shared public address of the redundant pair.
    pub virtual_ip: Option<Ipv4Addr>,
    /// Real public addresses of the redundant pair.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Router settings applied at creation.
    pub settings: VpcRouterSettings,
}

/// Parameters of an in-place VPC router update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcRouterUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Router settings.
    pub settings: VpcRouterSettings,
    /// Token read together with the current settings.
    pub settings_hash: String,
}

/// Private NIC of a mobile gateway.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGatewayInterface {
    /// Switch the NIC is plugged into.
    pub switch_id: ResourceId,
    /// Address of the NIC.
    pub ip_address: Ipv4Addr,
    /// Prefix length of the switch subnet.
    pub network_mask_len: u8,
}

/// Gateway settings of a mobile gateway.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGatewaySettings {
    /// Whether SIMs reach the internet.
    pub internet_connection_enabled: bool,
    /// Whether SIMs can reach each other.
    pub inter_device_communication_enabled: bool,
    /// Private NIC.
    pub interface: Option<MobileGatewayInterface>,
}

/// Resolvers handed to SIMs.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGatewayDns {
    /// Primary resolver.
    pub dns1: Ipv4Addr,
    /// Secondary resolver.
    pub dns2: Ipv4Addr,
}

/// Monthly traffic quota and shaping of a mobile gateway.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TrafficConfig {
    /// Quota in MiB.
    pub traffic_quota_in_mb: u32,
    /// Bandwidth once the quota is used up.
    pub bandwidth_limit_in_kbps: u32,
    /// Whether to mail the owner when the quota is hit.
    pub email_notify_enabled: bool,
    /// Whether shaping starts automatically.
    pub auto_traffic_shaping: bool,
}

/// A mobile gateway as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGateway {
    /// Appliance identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the appliance.
    pub availability: Availability,
    /// Run status.
    pub instance_status: RunStatus,
    /// Gateway settings.
    pub settings: MobileGatewaySettings,
    /// Token guarding concurrent settings updates.
    pub settings_hash: String,
    /// SIMs registered with the gateway.
    pub sim_ids: Vec<ResourceId>,
}

/// Parameters of a mobile gateway creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGatewayCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Gateway settings applied at creation.
    pub settings: MobileGatewaySettings,
}

/// Parameters of an in-place mobile gateway update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobileGatewayUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Gateway settings.
    pub settings: MobileGatewaySettings,
    /// Token read together with the current settings.
    pub settings_hash: String,
}
