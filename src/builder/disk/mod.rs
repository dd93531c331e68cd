//! Disk builders.
//!
//! [`DiskBuilder`] is a closed set of variants, one per way a disk comes into
//! existence. Each variant validates its own inputs and plans its creation
//! request; the shared driver in this module creates the disk, waits for the
//! copy to finish, and disposes of the ephemeral artifacts the plan produced.

mod director;
mod image;
mod os;
mod plain;
mod source;
mod unix;

use tracing::{debug, info};

use super::{BuildResult, DiskPorts, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    DiskConnection, DiskCreateRequest, DiskEditRequest, DiskUpdateRequest, GeneratedSshKey,
};
use crate::types::{ResourceId, Tag, Zone};
use crate::wait::wait_until_ready;

pub use director::{DiskKind, DiskRequest, Director};
pub use image::{FixedArchiveDisk, WindowsDisk, WindowsEditParams};
pub use os::OsType;
pub use plain::{BlankDisk, ConnectedDisk};
pub use source::CopiedDisk;
pub use unix::{SshKeyGeneration, UnixDisk, UnixEditParams};

/// Parameters shared by every disk variant.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiskSpec {
    /// Existing disk targeted by [`DiskBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Disk plan.
    pub plan_id: ResourceId,
    /// Attachment bus.
    pub connection: DiskConnection,
    /// Size in GiB; must be an available size of the plan.
    pub size_gb: u32,
    /// Disks the new disk must be stored apart from.
    pub distant_from: Vec<ResourceId>,
}

impl DiskSpec {
    async fn validate<A>(&self, ctx: &Context, api: &A, zone: &Zone) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        require_non_blank("disk", "name", &self.name)?;
        require_id("disk", "plan", self.plan_id)?;
        let plan = api
            .read_disk_plan(ctx, zone, self.plan_id)
            .await
            .during("read disk plan")?;
        if !plan.offers(self.size_gb) {
            return Err(ProvisionError::validation(
                "disk",
                format!(
                    "size {} GiB is not available for plan {}",
                    self.size_gb, plan.name
                ),
            ));
        }
        Ok(())
    }

    fn create_request(
        &self,
        server_id: ResourceId,
        source_disk_id: ResourceId,
        source_archive_id: ResourceId,
    ) -> DiskCreateRequest {
        DiskCreateRequest {
            plan_id: self.plan_id,
            connection: self.connection,
            source_disk_id,
            source_archive_id,
            server_id,
            size_gb: self.size_gb,
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
        }
    }

    fn update_request(&self) -> DiskUpdateRequest {
        DiskUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            connection: self.connection,
        }
    }
}

/// Remote objects created while planning a disk, and which of them to
/// delete once the disk is ready.
#[derive(Debug, Default)]
struct Artifacts {
    generated_key: Option<GeneratedSshKey>,
    delete_key: bool,
    note_ids: Vec<ResourceId>,
    delete_notes: bool,
}

impl Artifacts {
    /// Deletes ephemeral artifacts and hands back the generated private key.
    async fn dispose<A>(self, ctx: &Context, api: &A) -> Result<Option<String>, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        if let (true, Some(key)) = (self.delete_key, &self.generated_key) {
            api.delete_ssh_key(ctx, key.id)
                .await
                .during("delete generated SSH key")?;
            debug!(ssh_key_id = %key.id, "deleted ephemeral SSH key");
        }
        if self.delete_notes {
            for note_id in &self.note_ids {
                api.delete_note(ctx, *note_id)
                    .await
                    .during("delete note")?;
                debug!(%note_id, "deleted ephemeral note");
            }
        }
        Ok(self.generated_key.map(|key| key.private_key))
    }
}

/// What a variant wants created.
#[derive(Debug)]
struct DiskPlanOutcome {
    create: DiskCreateRequest,
    edit: Option<DiskEditRequest>,
    artifacts: Artifacts,
}

/// A disk to build, one variant per source of its contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiskBuilder {
    /// Public Unix-like archive, edited before first boot.
    FromUnix(UnixDisk),
    /// Public Windows archive, optionally with network settings.
    FromWindows(WindowsDisk),
    /// Public appliance archive that cannot be edited.
    FromFixedArchive(FixedArchiveDisk),
    /// Copy of an existing disk or archive.
    FromDiskOrArchive(CopiedDisk),
    /// Empty disk.
    Blank(BlankDisk),
    /// Existing disk, connected as is.
    Connected(ConnectedDisk),
}

impl DiskBuilder {
    /// Variant of this builder.
    #[must_use]
    pub const fn kind(&self) -> DiskKind {
        match self {
            Self::FromUnix(_) => DiskKind::FromUnix,
            Self::FromWindows(_) => DiskKind::FromWindows,
            Self::FromFixedArchive(_) => DiskKind::FromFixedArchive,
            Self::FromDiskOrArchive(_) => DiskKind::FromDiskOrArchive,
            Self::Blank(_) => DiskKind::Blank,
            Self::Connected(_) => DiskKind::Connected,
        }
    }

    /// Shared parameters of this builder.
    #[must_use]
    pub const fn spec(&self) -> &DiskSpec {
        match self {
            Self::FromUnix(disk) => &disk.spec,
            Self::FromWindows(disk) => &disk.spec,
            Self::FromFixedArchive(disk) => &disk.spec,
            Self::FromDiskOrArchive(disk) => &disk.spec,
            Self::Blank(disk) => &disk.spec,
            Self::Connected(disk) => &disk.spec,
        }
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for unusable parameters,
    /// [`ProvisionError::NotFound`] for missing references, and the
    /// translated port error when a lookup fails.
    pub async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        match self {
            Self::FromUnix(disk) => disk.validate(ctx, api, zone).await,
            Self::FromWindows(disk) => disk.validate(ctx, api, zone).await,
            Self::FromFixedArchive(disk) => disk.validate(ctx, api, zone).await,
            Self::FromDiskOrArchive(disk) => disk.validate(ctx, api, zone).await,
            Self::Blank(disk) => disk.spec.validate(ctx, api, zone).await,
            Self::Connected(disk) => disk.validate(ctx, api, zone).await,
        }
    }

    /// Validates, creates the disk (connected to `server_id` when set), waits
    /// until it is available, and deletes ephemeral SSH keys and notes.
    ///
    /// # Errors
    ///
    /// Returns every error of [`DiskBuilder::validate`], the first failed
    /// remote call, and wait errors. Nothing is rolled back.
    pub async fn build<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        server_id: ResourceId,
        timing: &Timing,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        self.validate(ctx, api, zone).await?;
        let outcome = match self {
            Self::Connected(disk) => return disk.connect(ctx, api, zone, server_id).await,
            Self::FromUnix(disk) => disk.plan(ctx, api, zone, server_id).await?,
            Self::FromWindows(disk) => disk.plan(ctx, api, zone, server_id).await?,
            Self::FromFixedArchive(disk) => disk.plan(ctx, api, zone, server_id).await?,
            Self::FromDiskOrArchive(disk) => disk.plan(ctx, api, zone, server_id).await?,
            Self::Blank(disk) => disk.plan(server_id),
        };
        let spec = self.spec();
        let created = match &outcome.edit {
            Some(edit) => {
                api.create_disk_with_config(
                    ctx,
                    zone,
                    &outcome.create,
                    edit,
                    false,
                    &spec.distant_from,
                )
                .await
            }
            None => {
                api.create_disk(ctx, zone, &outcome.create, &spec.distant_from)
                    .await
            }
        }
        .during("create disk")?;
        let id = created.id;
        debug!(disk_id = %id, %zone, kind = ?self.kind(), "disk created");
        wait_until_ready(
            ctx,
            "disk",
            id,
            move || api.read_disk(ctx, zone, id),
            timing.wait,
        )
        .await?;
        let generated_ssh_private_key = outcome.artifacts.dispose(ctx, api).await?;
        info!(disk_id = %id, %zone, "disk ready");
        Ok(BuildResult {
            id,
            generated_ssh_private_key,
        })
    }

    /// Updates the metadata of the existing disk and, for Unix disks,
    /// re-applies the edit.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing disk is set,
    /// the first failed remote call, and wait errors.
    pub async fn update<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        timing: &Timing,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        let id = match self {
            Self::Connected(disk) => disk.disk_id,
            _ => self.spec().id,
        };
        require_id("disk", "id", id)?;
        api.update_disk(ctx, zone, id, &self.spec().update_request())
            .await
            .during("update disk")?;
        let mut generated_ssh_private_key = None;
        if let Self::FromUnix(disk) = self {
            let (edit, artifacts) = disk.edit.prepare(ctx, api).await?;
            api.config_disk(ctx, zone, id, &edit)
                .await
                .during("edit disk")?;
            wait_until_ready(
                ctx,
                "disk",
                id,
                move || api.read_disk(ctx, zone, id),
                timing.wait,
            )
            .await?;
            generated_ssh_private_key = artifacts.dispose(ctx, api).await?;
        }
        info!(disk_id = %id, %zone, "disk updated");
        Ok(BuildResult {
            id,
            generated_ssh_private_key,
        })
    }
}
