//! Disks copied from a public archive that cannot be fully edited: Windows
//! images, which only accept network settings, and appliance images.

use std::net::Ipv4Addr;

use super::os::find_os_archive;
use super::{Artifacts, DiskPlanOutcome, DiskSpec, OsType};
use crate::builder::DiskPorts;
use crate::context::Context;
use crate::error::ProvisionError;
use crate::model::{DiskEditRequest, EditUserSubnet};
use crate::types::{ResourceId, Zone};

/// Network settings written into a Windows disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WindowsEditParams {
    /// Static address of the primary NIC.
    pub ip_address: Ipv4Addr,
    /// Prefix length of the subnet.
    pub network_mask_len: u8,
    /// Default gateway.
    pub default_route: Ipv4Addr,
}

impl WindowsEditParams {
    fn edit_request(&self) -> DiskEditRequest {
        DiskEditRequest {
            user_ip_address: Some(self.ip_address),
            user_subnet: Some(EditUserSubnet {
                default_route: self.default_route,
                network_mask_len: self.network_mask_len,
            }),
            ..DiskEditRequest::default()
        }
    }
}

/// Disk copied from a public Windows archive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WindowsDisk {
    /// Shared parameters.
    pub spec: DiskSpec,
    /// Operating system; must be a Windows edition.
    pub os_type: OsType,
    /// Network settings, when the NIC should not use DHCP.
    pub edit: Option<WindowsEditParams>,
}

impl WindowsDisk {
    pub(super) async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        self.spec.validate(ctx, api, zone).await?;
        if !self.os_type.is_windows() {
            return Err(ProvisionError::validation(
                "disk",
                format!("os type {} is not a Windows edition", self.os_type),
            ));
        }
        find_os_archive(ctx, api, zone, self.os_type).await?;
        Ok(())
    }

    pub(super) async fn plan<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        server_id: ResourceId,
    ) -> Result<DiskPlanOutcome, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        let archive = find_os_archive(ctx, api, zone, self.os_type).await?;
        Ok(DiskPlanOutcome {
            create: self
                .spec
                .create_request(server_id, ResourceId::EMPTY, archive.id),
            edit: self.edit.as_ref().map(WindowsEditParams::edit_request),
            artifacts: Artifacts::default(),
        })
    }
}

/// Disk copied as is from a public appliance archive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FixedArchiveDisk {
    /// Shared parameters.
    pub spec: DiskSpec,
    /// Operating system of the archive.
    pub os_type: OsType,
}

impl FixedArchiveDisk {
    pub(super) async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        self.spec.validate(ctx, api, zone).await?;
        find_os_archive(ctx, api, zone, self.os_type).await?;
        Ok(())
    }

    pub(super) async fn plan<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        server_id: ResourceId,
    ) -> Result<DiskPlanOutcome, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        let archive = find_os_archive(ctx, api, zone, self.os_type).await?;
        Ok(DiskPlanOutcome {
            create: self
                .spec
                .create_request(server_id, ResourceId::EMPTY, archive.id),
            edit: None,
            artifacts: Artifacts::default(),
        })
    }
}
