//! Server, server plan and network attachment records.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::{Availability, RunStatus};
use crate::types::{ResourceId, Tag};

/// NIC driver exposed to the guest.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceDriver {
    /// Paravirtualised driver.
    #[default]
    Virtio,
    /// Emulated Intel e1000.
    E1000,
}

/// CPU commitment of a server plan.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Shared CPU.
    #[default]
    Standard,
    /// Dedicated CPU cores.
    DedicatedCpu,
}

/// Hardware generation of a server plan.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlanGeneration {
    /// Let the remote pick the newest generation offering the shape.
    #[default]
    Default,
    /// Second generation.
    G100,
    /// Third generation.
    G200,
}

/// Upstream of a NIC declared at server creation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum SwitchConnection {
    /// Shared internet segment.
    Shared,
    /// A user switch.
    Switch(ResourceId),
    /// NIC present but unplugged.
    #[default]
    Disconnected,
}

/// A server NIC as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Interface {
    /// NIC identifier.
    pub id: ResourceId,
    /// Upstream of the NIC.
    pub upstream: SwitchConnection,
    /// Packet filter bound to the NIC.
    pub packet_filter_id: ResourceId,
    /// Address shown in the control panel for switch-connected NICs.
    pub user_ip_address: Option<Ipv4Addr>,
}

/// A server as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Server {
    /// Server identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the server record.
    pub availability: Availability,
    /// Run status.
    pub instance_status: RunStatus,
    /// Plan identifier.
    pub plan_id: ResourceId,
    /// Virtual CPU count.
    pub cpu: u32,
    /// Memory in GiB.
    pub memory_gb: u32,
    /// NICs in index order.
    pub interfaces: Vec<Interface>,
    /// Connected disks in connection order.
    pub disk_ids: Vec<ResourceId>,
    /// Inserted ISO image.
    pub cdrom_id: ResourceId,
}

/// Parameters of a server creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Plan identifier.
    pub plan_id: ResourceId,
    /// Upstream of each NIC, primary first.
    pub connected_switches: Vec<SwitchConnection>,
    /// NIC driver.
    pub interface_driver: InterfaceDriver,
    /// Dedicated host to place the server on.
    pub private_host_id: ResourceId,
}

/// Parameters of an in-place server update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
}

/// Parameters of a NIC update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct InterfaceUpdateRequest {
    /// Address shown in the control panel.
    pub user_ip_address: Option<Ipv4Addr>,
}

/// A server plan.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerPlan {
    /// Plan identifier.
    pub id: ResourceId,
    /// Virtual CPU count.
    pub cpu: u32,
    /// Memory in GiB.
    pub memory_gb: u32,
    /// GPU count.
    pub gpu: u32,
    /// CPU commitment.
    pub commitment: Commitment,
    /// Hardware generation.
    pub generation: PlanGeneration,
    /// Whether the plan can currently be ordered.
    pub availability: Availability,
}

/// Shape a server plan lookup must match.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerPlanQuery {
    /// Virtual CPU count.
    pub cpu: u32,
    /// Memory in GiB.
    pub memory_gb: u32,
    /// GPU count.
    pub gpu: u32,
    /// CPU commitment.
    pub commitment: Commitment,
    /// Hardware generation.
    pub generation: PlanGeneration,
}

impl ServerPlanQuery {
    /// Returns `true` when `plan` has exactly this shape and is orderable.
    #[must_use]
    pub fn matches(&self, plan: &ServerPlan) -> bool {
        plan.cpu == self.cpu
            && plan.memory_gb == self.memory_gb
            && plan.gpu == self.gpu
            && plan.commitment == self.commitment
            && (self.generation == PlanGeneration::Default || plan.generation == self.generation)
            && plan.availability == Availability::Available
    }
}

/// A user switch.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Switch {
    /// Switch identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
}

/// A packet filter.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PacketFilter {
    /// Packet filter identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
}

/// An ISO image that can be inserted into a server.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cdrom {
    /// ISO image identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
}
