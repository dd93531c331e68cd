//! Disks copied from an existing disk or archive.

use super::{Artifacts, DiskPlanOutcome, DiskSpec, UnixEditParams};
use crate::builder::DiskPorts;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::provenance::can_edit_disk;
use crate::types::{ResourceId, Zone};

/// Copy of an existing disk or archive, optionally edited.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CopiedDisk {
    /// Shared parameters.
    pub spec: DiskSpec,
    /// Disk to copy; exclusive with `source_archive_id`.
    pub source_disk_id: ResourceId,
    /// Archive to copy; exclusive with `source_disk_id`.
    pub source_archive_id: ResourceId,
    /// Settings written into the copy. Only allowed when the source chain
    /// ends in an editable image.
    pub edit: Option<UnixEditParams>,
}

impl CopiedDisk {
    fn source(&self) -> Result<ResourceId, ProvisionError> {
        match (
            self.source_disk_id.non_empty(),
            self.source_archive_id.non_empty(),
        ) {
            (Some(id), None) | (None, Some(id)) => Ok(id),
            (Some(_), Some(_)) => Err(ProvisionError::validation(
                "disk",
                "source disk and source archive are mutually exclusive",
            )),
            (None, None) => Err(ProvisionError::validation(
                "disk",
                "a source disk or source archive is required",
            )),
        }
    }

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
        let source = self.source()?;
        if self.source_disk_id.is_empty() {
            api.read_archive(ctx, zone, source)
                .await
                .during("read source archive")?;
        } else {
            api.read_disk(ctx, zone, source)
                .await
                .during("read source disk")?;
        }
        if let Some(edit) = &self.edit {
            if !can_edit_disk(ctx, zone, api, source).await? {
                return Err(ProvisionError::validation(
                    "disk",
                    format!("source {source} does not support disk edit"),
                ));
            }
            edit.validate(ctx, api).await?;
        }
        Ok(())
    }

    pub(super) async fn plan<A>(
        &self,
        ctx: &Context,
        api: &A,
        _zone: &Zone,
        server_id: ResourceId,
    ) -> Result<DiskPlanOutcome, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        let (edit, artifacts) = match &self.edit {
            Some(params) => {
                let (edit, artifacts) = params.prepare(ctx, api).await?;
                (Some(edit), artifacts)
            }
            None => (None, Artifacts::default()),
        };
        Ok(DiskPlanOutcome {
            create: self.spec.create_request(
                server_id,
                self.source_disk_id,
                self.source_archive_id,
            ),
            edit,
            artifacts,
        })
    }
}
