//! Source-chain resolution: decides whether a disk's operating system can be
//! edited by following the disk and archive it was copied from.
//!
//! The walk reads strictly sequentially and inspects each disk or archive at
//! most once. A record naming itself as its source, or a chain that loops
//! back to a record already visited, is rejected as an invalid state.

use std::collections::BTreeSet;

use tracing::debug;

use crate::api::{ArchiveApi, DiskApi, RemoteFuture};
use crate::context::Context;
use crate::error::ProvisionError;
use crate::model::{Archive, Availability, Disk};
use crate::types::{ResourceId, Tag, Zone, has_tag};

/// Host class of licensed Windows images.
const WINDOWS_HOST_CLASS: &str = "ms_windows";

/// Service class fragment of Sophos UTM images.
const SOPHOS_SERVICE_CLASS: &str = "sophosutm";

/// Tags marking images whose disk cannot be edited.
const SOPHOS_TAG: &str = "pkg-sophosutm";
const OPNSENSE_TAG: &str = "distro-opnsense";
const NETWISER_TAG: &str = "pkg-netwiserve";

/// Tags marking Unix-like images whose disk can be edited.
const EDITABLE_OS_TAGS: [&str; 2] = ["os-unix", "os-linux"];

/// Read access needed to walk a source chain.
pub trait SourceReader: Send + Sync {
    /// Reads a disk.
    fn source_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Disk>;

    /// Reads an archive.
    fn source_archive<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Archive>;
}

impl<T> SourceReader for T
where
    T: DiskApi + ArchiveApi + ?Sized,
{
    fn source_disk<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Disk> {
        self.read_disk(ctx, zone, id)
    }

    fn source_archive<'a>(
        &'a self,
        ctx: &'a Context,
        zone: &'a Zone,
        id: ResourceId,
    ) -> RemoteFuture<'a, Archive> {
        self.read_archive(ctx, zone, id)
    }
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Cursor {
    Disk(ResourceId),
    Archive(ResourceId),
}

impl Cursor {
    const fn describe(self) -> (&'static str, ResourceId) {
        match self {
            Self::Disk(id) => ("disk", id),
            Self::Archive(id) => ("archive", id),
        }
    }
}

enum Verdict {
    Editable(bool),
    Follow(Cursor),
}

/// Returns `true` when the disk or archive `id` ultimately derives from an
/// image whose operating system supports disk edits.
///
/// `id` is first looked up as a disk; a read miss there means it names an
/// archive. Archive lookups are authoritative and every error propagates.
///
/// # Errors
///
/// Returns [`ProvisionError::InvalidState`] when a record names itself as its
/// source or the chain loops, [`ProvisionError::NotFound`] when an archive in the chain is
/// missing, and the translated port error for any other read failure.
pub async fn can_edit_disk<R>(
    ctx: &Context,
    zone: &Zone,
    reader: &R,
    id: ResourceId,
) -> Result<bool, ProvisionError>
where
    R: SourceReader + ?Sized,
{
    let mut cursor = Cursor::Disk(id);
    let mut visited = BTreeSet::new();
    loop {
        ctx.check("resolve disk source")?;
        if !visited.insert(cursor) {
            let (resource, looped) = cursor.describe();
            return Err(ProvisionError::invalid_state(
                resource,
                looped,
                format!("source chain of {id} loops back to {resource} {looped}"),
            ));
        }
        let verdict = match cursor {
            Cursor::Disk(disk_id) => inspect_disk(ctx, zone, reader, disk_id).await?,
            Cursor::Archive(archive_id) => {
                let archive = reader
                    .source_archive(ctx, zone, archive_id)
                    .await
                    .map_err(|err| ProvisionError::remote("read archive", err))?;
                judge_archive(&archive)?
            }
        };
        match verdict {
            Verdict::Editable(editable) => {
                debug!(%id, hops = visited.len(), editable, "resolved disk source");
                return Ok(editable);
            }
            Verdict::Follow(next) => cursor = next,
        }
    }
}

async fn inspect_disk<R>(
    ctx: &Context,
    zone: &Zone,
    reader: &R,
    id: ResourceId,
) -> Result<Verdict, ProvisionError>
where
    R: SourceReader + ?Sized,
{
    let disk = match reader.source_disk(ctx, zone, id).await {
        Ok(disk) => disk,
        Err(err) if err.is_not_found() => return Ok(Verdict::Follow(Cursor::Archive(id))),
        Err(err) => return Err(ProvisionError::remote("read disk", err)),
    };
    if disk.id == disk.source_disk_id || disk.id == disk.source_archive_id {
        return Err(ProvisionError::invalid_state(
            "disk",
            disk.id,
            "disk names itself as its source",
        ));
    }
    if let Some(source) = disk.source_disk_id.non_empty() {
        return Ok(Verdict::Follow(Cursor::Disk(source)));
    }
    Ok(disk
        .source_archive_id
        .non_empty()
        .map_or(Verdict::Editable(false), |source| {
            Verdict::Follow(Cursor::Archive(source))
        }))
}

fn judge_archive(archive: &Archive) -> Result<Verdict, ProvisionError> {
    if archive.id == archive.source_disk_id || archive.id == archive.source_archive_id {
        return Err(ProvisionError::invalid_state(
            "archive",
            archive.id,
            "archive names itself as its source",
        ));
    }
    if is_uneditable_image(archive) {
        return Ok(Verdict::Editable(false));
    }
    if EDITABLE_OS_TAGS
        .iter()
        .any(|wanted| has_tag(&archive.tags, wanted))
    {
        return Ok(Verdict::Editable(true));
    }
    if !archive.source_disk_id.is_empty()
        && archive.source_disk_availability != Availability::Discontinued
    {
        return Ok(Verdict::Follow(Cursor::Disk(archive.source_disk_id)));
    }
    if !archive.source_archive_id.is_empty()
        && archive.source_archive_availability != Availability::Discontinued
    {
        return Ok(Verdict::Follow(Cursor::Archive(archive.source_archive_id)));
    }
    Ok(Verdict::Editable(false))
}

fn is_uneditable_image(archive: &Archive) -> bool {
    let tags: &[Tag] = &archive.tags;
    if let Some(bundle) = &archive.bundle_info {
        if bundle.host_class == WINDOWS_HOST_CLASS {
            return true;
        }
        if bundle
            .service_class
            .to_ascii_lowercase()
            .contains(SOPHOS_SERVICE_CLASS)
        {
            return true;
        }
    }
    has_tag(tags, SOPHOS_TAG) || has_tag(tags, OPNSENSE_TAG) || has_tag(tags, NETWISER_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::model::BundleInfo;
    use crate::test_support::FakeCloud;
    use rstest::rstest;

    const ZONE: &str = "is1a";

    fn archive(id: u64, tags: &[&str]) -> Archive {
        Archive {
            id: ResourceId::new(id),
            tags: tags.iter().copied().map(Tag::from).collect(),
            ..Archive::default()
        }
    }

    async fn resolve(cloud: &FakeCloud, id: u64) -> Result<bool, ProvisionError> {
        can_edit_disk(&Context::new(), &Zone::from(ZONE), cloud, ResourceId::new(id)).await
    }

    #[rstest]
    #[case(&["os-linux"], true)]
    #[case(&["os-unix", "current-stable"], true)]
    #[case(&["os-linux", "pkg-sophosutm"], false)]
    #[case(&["os-unix", "distro-opnsense"], false)]
    #[case(&["os-linux", "pkg-netwiserve"], false)]
    #[case(&[], false)]
    #[tokio::test]
    async fn archive_tags_decide(#[case] tags: &[&str], #[case] expected: bool) {
        let cloud = FakeCloud::new();
        cloud.insert_archive(archive(100, tags));
        assert_eq!(resolve(&cloud, 100).await, Ok(expected));
    }

    #[rstest]
    #[case(BundleInfo {
        host_class: String::from("ms_windows"),
        service_class: String::new(),
    })]
    #[case(BundleInfo {
        host_class: String::new(),
        service_class: String::from("cloud/os/SophosUTM"),
    })]
    #[tokio::test]
    async fn licensed_bundles_are_never_editable(#[case] bundle: BundleInfo) {
        let cloud = FakeCloud::new();
        cloud.insert_archive(Archive {
            bundle_info: Some(bundle),
            ..archive(100, &["os-linux"])
        });
        assert_eq!(resolve(&cloud, 100).await, Ok(false));
    }

    #[tokio::test]
    async fn follows_disk_disk_archive_chain() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(archive(300, &["os-unix"]));
        cloud.insert_disk(Disk {
            id: ResourceId::new(200),
            source_archive_id: ResourceId::new(300),
            ..Disk::default()
        });
        cloud.insert_disk(Disk {
            id: ResourceId::new(100),
            source_disk_id: ResourceId::new(200),
            ..Disk::default()
        });
        assert_eq!(resolve(&cloud, 100).await, Ok(true));
    }

    #[tokio::test]
    async fn disk_without_source_is_not_editable() {
        let cloud = FakeCloud::new();
        cloud.insert_disk(Disk {
            id: ResourceId::new(100),
            ..Disk::default()
        });
        assert_eq!(resolve(&cloud, 100).await, Ok(false));
    }

    #[tokio::test]
    async fn untagged_archive_follows_its_source() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(archive(300, &["os-linux"]));
        cloud.insert_archive(Archive {
            source_archive_id: ResourceId::new(300),
            ..archive(200, &[])
        });
        assert_eq!(resolve(&cloud, 200).await, Ok(true));
    }

    #[tokio::test]
    async fn discontinued_sources_are_not_followed() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(archive(300, &["os-linux"]));
        cloud.insert_archive(Archive {
            source_archive_id: ResourceId::new(300),
            source_archive_availability: Availability::Discontinued,
            ..archive(200, &[])
        });
        assert_eq!(resolve(&cloud, 200).await, Ok(false));
    }

    #[rstest]
    #[case(Disk {
        id: ResourceId::new(100),
        source_disk_id: ResourceId::new(100),
        ..Disk::default()
    })]
    #[case(Disk {
        id: ResourceId::new(100),
        source_archive_id: ResourceId::new(100),
        ..Disk::default()
    })]
    #[tokio::test]
    async fn self_referencing_disk_is_invalid(#[case] disk: Disk) {
        let cloud = FakeCloud::new();
        cloud.insert_disk(disk);
        let result = resolve(&cloud, 100).await;
        assert!(matches!(result, Err(ProvisionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn self_referencing_archive_is_invalid() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(Archive {
            source_archive_id: ResourceId::new(100),
            ..archive(100, &[])
        });
        let result = resolve(&cloud, 100).await;
        assert!(matches!(result, Err(ProvisionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn looping_disk_chain_is_invalid() {
        let cloud = FakeCloud::new();
        cloud.insert_disk(Disk {
            id: ResourceId::new(100),
            source_disk_id: ResourceId::new(200),
            ..Disk::default()
        });
        cloud.insert_disk(Disk {
            id: ResourceId::new(200),
            source_disk_id: ResourceId::new(100),
            ..Disk::default()
        });
        let result = resolve(&cloud, 100).await;
        assert!(matches!(result, Err(ProvisionError::InvalidState { .. })));
        assert_eq!(cloud.call_count("read_disk"), 2);
    }

    #[tokio::test]
    async fn looping_archive_chain_is_invalid() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(Archive {
            source_archive_id: ResourceId::new(300),
            ..archive(200, &[])
        });
        cloud.insert_archive(Archive {
            source_archive_id: ResourceId::new(200),
            ..archive(300, &[])
        });
        let result = resolve(&cloud, 200).await;
        assert!(matches!(result, Err(ProvisionError::InvalidState { .. })));
        assert_eq!(cloud.call_count("read_archive"), 2);
    }

    #[tokio::test]
    async fn missing_archive_is_not_found() {
        let cloud = FakeCloud::new();
        let result = resolve(&cloud, 404).await;
        assert!(result.is_err_and(|err| err.is_not_found()));
    }

    #[tokio::test]
    async fn archive_read_failure_propagates() {
        let cloud = FakeCloud::new();
        cloud.insert_archive(archive(100, &["os-linux"]));
        cloud.fail_next("read_archive", RemoteError::api(500, "internal", "oops"));
        let result = resolve(&cloud, 100).await;
        assert!(matches!(result, Err(ProvisionError::Remote { .. })));
    }
}
