//! Blank disks and existing disks.

use tracing::info;

use super::{Artifacts, DiskPlanOutcome, DiskSpec};
use crate::builder::{BuildResult, DiskPorts, require_id};
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::types::{ResourceId, Zone};

/// Empty disk.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlankDisk {
    /// Shared parameters.
    pub spec: DiskSpec,
}

impl BlankDisk {
    pub(super) fn plan(&self, server_id: ResourceId) -> DiskPlanOutcome {
        DiskPlanOutcome {
            create: self
                .spec
                .create_request(server_id, ResourceId::EMPTY, ResourceId::EMPTY),
            edit: None,
            artifacts: Artifacts::default(),
        }
    }
}

/// Existing disk connected to the server as is.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectedDisk {
    /// Metadata applied by [`super::DiskBuilder::update`].
    pub spec: DiskSpec,
    /// Disk to connect.
    pub disk_id: ResourceId,
}

impl ConnectedDisk {
    pub(super) async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        require_id("disk", "disk id", self.disk_id)?;
        api.read_disk(ctx, zone, self.disk_id)
            .await
            .during("read disk")?;
        Ok(())
    }

    pub(super) async fn connect<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        server_id: ResourceId,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        if !server_id.is_empty() {
            api.connect_disk_to_server(ctx, zone, self.disk_id, server_id)
                .await
                .during("connect disk to server")?;
            info!(disk_id = %self.disk_id, %server_id, "connected existing disk");
        }
        Ok(BuildResult::with_id(self.disk_id))
    }
}
