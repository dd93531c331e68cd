//! Records of resources that are not scoped to a zone.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::Availability;
use crate::types::{ResourceId, Tag};

/// A stored SSH public key.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshKey {
    /// Key identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// OpenSSH public key.
    pub public_key: String,
}

/// Parameters of a server-side key pair generation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshKeyGenerateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Passphrase protecting the private key.
    pub pass_phrase: Option<String>,
}

/// A key pair generated by the remote. The private key is only ever returned
/// once, by the generation call.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GeneratedSshKey {
    /// Key identifier.
    pub id: ResourceId,
    /// OpenSSH public key.
    pub public_key: String,
    /// PEM private key.
    pub private_key: String,
}

/// A startup script.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Note {
    /// Note identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Script body.
    pub content: String,
}

/// Parameters of a note creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NoteCreateRequest {
    /// Display name.
    pub name: String,
    /// Script body.
    pub content: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

/// A SIM card.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Sim {
    /// SIM identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Address assigned inside the mobile gateway's network.
    pub ip_address: Option<Ipv4Addr>,
}

/// Visibility of a container registry.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Anyone may pull, users may push.
    ReadWrite,
    /// Anyone may pull, nobody may push.
    ReadOnly,
    /// Only users may pull or push.
    #[default]
    None,
}

/// Permission of a registry user.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Pull, push and delete.
    All,
    /// Pull and push.
    #[default]
    ReadWrite,
    /// Pull only.
    ReadOnly,
}

/// A container registry user.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RegistryUser {
    /// Login name.
    pub user_name: String,
    /// Password; never returned by reads.
    pub password: String,
    /// Permission.
    pub permission: Permission,
}

/// A container registry as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ContainerRegistry {
    /// Registry identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the registry.
    pub availability: Availability,
    /// Visibility.
    pub access_level: AccessLevel,
    /// Subdomain the registry is served under.
    pub subdomain_label: String,
    /// Custom domain.
    pub virtual_domain: Option<String>,
    /// Registered user names.
    pub user_names: Vec<String>,
}

/// Parameters of a container registry creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ContainerRegistryCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Visibility.
    pub access_level: AccessLevel,
    /// Subdomain the registry is served under.
    pub subdomain_label: String,
    /// Custom domain.
    pub virtual_domain: Option<String>,
}

/// Parameters of an in-place container registry update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ContainerRegistryUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Visibility.
    pub access_level: AccessLevel,
    /// Custom domain.
    pub virtual_domain: Option<String>,
}

/// Switch a local router is attached to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterSwitch {
    /// Switch code.
    pub code: String,
    /// Category of the switch (`cloud` for user switches).
    pub category: String,
    /// Zone of the switch.
    pub zone_id: String,
}

/// Addressing of a local router on its switch.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterInterface {
    /// Shared address of the redundant pair.
    pub virtual_ip_address: Ipv4Addr,
    /// Real addresses of the pair.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Prefix length.
    pub network_mask_len: u8,
    /// Virtual router id.
    pub vrid: u8,
}

/// Another local router this one peers with.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterPeer {
    /// Peer identifier.
    pub peer_id: ResourceId,
    /// Secret key of the peer.
    pub secret_key: String,
    /// Whether the peering is active.
    pub enabled: bool,
}

/// A static route of a local router.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterStaticRoute {
    /// Destination in CIDR notation.
    pub prefix: String,
    /// Next hop.
    pub next_hop: String,
}

/// Settings of a local router.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterSettings {
    /// Attached switch.
    pub switch: LocalRouterSwitch,
    /// Addressing on the switch.
    pub interface: Option<LocalRouterInterface>,
    /// Peers.
    pub peers: Vec<LocalRouterPeer>,
    /// Static routes.
    pub static_routes: Vec<LocalRouterStaticRoute>,
}

/// A local router as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouter {
    /// Router identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Availability of the router.
    pub availability: Availability,
    /// Settings.
    pub settings: LocalRouterSettings,
    /// Token guarding concurrent settings updates.
    pub settings_hash: String,
    /// Secret keys other routers use to peer with this one.
    pub secret_keys: Vec<String>,
}

/// Parameters of a local router creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LocalRouterCreateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
}
