//! Resource builders: each turns one declarative request into the ordered
//! remote calls that create, connect, configure and boot the resource.
//!
//! Every builder follows the same shape. `validate` only reads and can be
//! repeated safely; `build` validates again and then runs the plan, aborting
//! on the first failed mutating call without rolling back; `update` applies
//! in-place changes where the remote supports them.

pub mod container_registry;
pub mod database;
pub mod disk;
pub mod local_router;
pub mod mobile_gateway;
pub mod server;
pub mod vpc_router;

use crate::api::{
    ArchiveApi, CdromApi, ContainerRegistryApi, DatabaseApi, DiskApi, DiskPlanApi, InterfaceApi,
    LocalRouterApi, MobileGatewayApi, NoteApi, PacketFilterApi, ServerApi, ServerPlanApi, SimApi,
    SshKeyApi, SwitchApi, VpcRouterApi,
};
use crate::error::ProvisionError;
use crate::types::ResourceId;

pub use container_registry::{ContainerRegistryBuilder, RegistryUserSpec};
pub use database::DatabaseBuilder;
pub use disk::{
    DiskBuilder, DiskKind, DiskRequest, DiskSpec, Director, OsType, UnixEditParams,
    WindowsEditParams,
};
pub use local_router::LocalRouterBuilder;
pub use mobile_gateway::{MobileGatewayBuilder, SimSpec};
pub use server::{NicSpec, ServerBuilder};
pub use vpc_router::{VpcRouterBuilder, VpcRouterNic};

/// Outcome of a successful build or update.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuildResult {
    /// Identifier of the built resource. Plan changes give servers a new one.
    pub id: ResourceId,
    /// Private half of a key pair generated while editing a disk. The remote
    /// returns it exactly once.
    pub generated_ssh_private_key: Option<String>,
}

impl BuildResult {
    /// Result carrying only an identifier.
    #[must_use]
    pub const fn with_id(id: ResourceId) -> Self {
        Self {
            id,
            generated_ssh_private_key: None,
        }
    }
}

/// Ports needed to build disks.
pub trait DiskPorts: DiskApi + ArchiveApi + DiskPlanApi + SshKeyApi + NoteApi {}

impl<T> DiskPorts for T where
    T: DiskApi + ArchiveApi + DiskPlanApi + SshKeyApi + NoteApi + ?Sized
{
}

/// Ports needed to build servers and their disks.
pub trait ServerPorts:
    DiskPorts + ServerApi + ServerPlanApi + SwitchApi + PacketFilterApi + InterfaceApi + CdromApi
{
}

impl<T> ServerPorts for T where
    T: DiskPorts
        + ServerApi
        + ServerPlanApi
        + SwitchApi
        + PacketFilterApi
        + InterfaceApi
        + CdromApi
        + ?Sized
{
}

/// Ports needed to build database appliances.
pub trait DatabasePorts: DatabaseApi + SwitchApi {}

impl<T> DatabasePorts for T where T: DatabaseApi + SwitchApi + ?Sized {}

/// Ports needed to build VPC routers.
pub trait VpcRouterPorts: VpcRouterApi + SwitchApi {}

impl<T> VpcRouterPorts for T where T: VpcRouterApi + SwitchApi + ?Sized {}

/// Ports needed to build mobile gateways.
pub trait MobileGatewayPorts: MobileGatewayApi + SwitchApi + SimApi {}

impl<T> MobileGatewayPorts for T where T: MobileGatewayApi + SwitchApi + SimApi + ?Sized {}

/// Ports needed to build container registries.
pub trait ContainerRegistryPorts: ContainerRegistryApi {}

impl<T> ContainerRegistryPorts for T where T: ContainerRegistryApi + ?Sized {}

/// Ports needed to build local routers.
pub trait LocalRouterPorts: LocalRouterApi {}

impl<T> LocalRouterPorts for T where T: LocalRouterApi + ?Sized {}

fn require_non_blank(resource: &str, field: &str, value: &str) -> Result<(), ProvisionError> {
    if value.trim().is_empty() {
        return Err(ProvisionError::validation(
            resource,
            format!("{field} must not be empty"),
        ));
    }
    Ok(())
}

fn require_id(resource: &str, field: &str, id: ResourceId) -> Result<(), ProvisionError> {
    if id.is_empty() {
        return Err(ProvisionError::validation(
            resource,
            format!("{field} must be set"),
        ));
    }
    Ok(())
}

/// Returns the first duplicate in `items`, if any.
fn first_duplicate<T: Ord + Clone>(items: impl IntoIterator<Item = T>) -> Option<T> {
    let mut seen = std::collections::BTreeSet::new();
    items.into_iter().find(|item| !seen.insert(item.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", true)]
    #[case("   ", true)]
    #[case("web-1", false)]
    fn blank_values_are_rejected(#[case] value: &str, #[case] rejected: bool) {
        assert_eq!(require_non_blank("server", "name", value).is_err(), rejected);
    }

    #[test]
    fn finds_first_duplicate() {
        assert_eq!(first_duplicate([1, 2, 3, 2, 1]), Some(2));
        assert_eq!(first_duplicate(["a", "b"]), None);
    }
}
