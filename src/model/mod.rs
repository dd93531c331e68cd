//! Minimal resource records and requests exchanged with the remote ports.
//!
//! Only the fields the builders, waiters and resolver act upon are modelled;
//! the full vendor schemas live with the transport.

mod appliance;
mod disk;
mod global;
mod server;

use serde::{Deserialize, Serialize};

pub use appliance::{
    Database, DatabaseCreateRequest, DatabasePlan, DatabaseSettings, DatabaseStatus, DatabaseType,
    DatabaseUpdateRequest, MobileGateway, MobileGatewayCreateRequest, MobileGatewayDns,
    MobileGatewayInterface, MobileGatewaySettings, MobileGatewayUpdateRequest, TrafficConfig,
    VpcRouter, VpcRouterCreateRequest, VpcRouterInterface, VpcRouterPlan, VpcRouterSettings,
    VpcRouterUpdateRequest,
};
pub use disk::{
    Archive, BundleInfo, Disk, DiskConnection, DiskCreateRequest, DiskEditNote, DiskEditRequest,
    DiskPlan, DiskPlanSize, DiskUpdateRequest, EditUserSubnet,
};
pub use global::{
    AccessLevel, ContainerRegistry, ContainerRegistryCreateRequest, ContainerRegistryUpdateRequest,
    GeneratedSshKey, LocalRouter, LocalRouterCreateRequest, LocalRouterInterface,
    LocalRouterPeer, LocalRouterSettings, LocalRouterStaticRoute, LocalRouterSwitch, Note,
    NoteCreateRequest, Permission, RegistryUser, Sim, SshKey, SshKeyGenerateRequest,
};
pub use server::{
    Cdrom, Commitment, Interface, InterfaceDriver, InterfaceUpdateRequest, PacketFilter,
    PlanGeneration, Server, ServerCreateRequest, ServerPlan, ServerPlanQuery, ServerUpdateRequest,
    Switch, SwitchConnection,
};

/// Availability of a remote resource's backing storage or configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Ready for use.
    #[default]
    Available,
    /// Data is being uploaded.
    Uploading,
    /// Data is being copied from its source.
    Migrating,
    /// Data is being transferred between zones.
    Transferring,
    /// Creation failed.
    Failed,
    /// Withdrawn from service; must not be followed as a source.
    Discontinued,
}

impl Availability {
    /// Returns `true` while the remote is still converging.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Uploading | Self::Migrating | Self::Transferring)
    }
}

/// Run status of an instance-like resource.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Running.
    Up,
    /// Stopped.
    #[default]
    Down,
    /// Shutting down and releasing resources.
    Cleaning,
}

impl RunStatus {
    /// Returns `true` for the running state.
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }

    /// Returns `true` for the stopped state.
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Down)
    }
}

/// Records that expose the states a waiter observes.
pub trait Lifecycle {
    /// Current availability.
    fn availability(&self) -> Availability;

    /// Current run status, for resources that can be booted.
    fn run_status(&self) -> Option<RunStatus> {
        None
    }
}

/// Search condition for `find` operations.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FindCondition {
    /// Every tag a match must carry.
    pub tags: Vec<String>,
    /// Name fragments a match must contain.
    pub names: Vec<String>,
}

impl FindCondition {
    /// Condition matching resources that carry every tag in `tags`.
    #[must_use]
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            names: Vec::new(),
        }
    }
}

macro_rules! lifecycle {
    ($name:ty) => {
        impl Lifecycle for $name {
            fn availability(&self) -> Availability {
                self.availability
            }
        }
    };
    ($name:ty, run_status) => {
        impl Lifecycle for $name {
            fn availability(&self) -> Availability {
                self.availability
            }

            fn run_status(&self) -> Option<RunStatus> {
                Some(self.instance_status)
            }
        }
    };
}

lifecycle!(Disk);
lifecycle!(Archive);
lifecycle!(ContainerRegistry);
lifecycle!(LocalRouter);
lifecycle!(Server, run_status);
lifecycle!(Database, run_status);
lifecycle!(VpcRouter, run_status);
lifecycle!(MobileGateway, run_status);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Availability::Available, false)]
    #[case(Availability::Migrating, true)]
    #[case(Availability::Uploading, true)]
    #[case(Availability::Transferring, true)]
    #[case(Availability::Failed, false)]
    #[case(Availability::Discontinued, false)]
    fn transitional_availabilities(#[case] availability: Availability, #[case] expected: bool) {
        assert_eq!(availability.is_transitional(), expected);
    }

    #[test]
    fn availability_serialises_lowercase() {
        let json = serde_json::to_string(&Availability::Discontinued).expect("serialise");
        assert_eq!(json, "\"discontinued\"");
    }
}
