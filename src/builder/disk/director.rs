//! Selection of the disk variant from a flat disk request.

use super::{
    BlankDisk, ConnectedDisk, CopiedDisk, DiskBuilder, DiskSpec, FixedArchiveDisk, OsType,
    UnixDisk, UnixEditParams, WindowsDisk, WindowsEditParams,
};
use crate::types::ResourceId;

/// Variant a [`Director`] selects.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DiskKind {
    /// See [`DiskBuilder::FromUnix`].
    FromUnix,
    /// See [`DiskBuilder::FromWindows`].
    FromWindows,
    /// See [`DiskBuilder::FromFixedArchive`].
    FromFixedArchive,
    /// See [`DiskBuilder::FromDiskOrArchive`].
    FromDiskOrArchive,
    /// See [`DiskBuilder::Blank`].
    Blank,
    /// See [`DiskBuilder::Connected`].
    Connected,
}

/// Flat description of a disk as a caller declares it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiskRequest {
    /// Shared parameters.
    pub spec: DiskSpec,
    /// Operating system; [`OsType::Custom`] for anything but public archives.
    pub os_type: OsType,
    /// Existing disk to connect.
    pub disk_id: ResourceId,
    /// Disk to copy.
    pub source_disk_id: ResourceId,
    /// Archive to copy.
    pub source_archive_id: ResourceId,
    /// Unix edit settings.
    pub unix_edit: Option<UnixEditParams>,
    /// Windows network settings.
    pub windows_edit: Option<WindowsEditParams>,
}

/// Picks the disk variant for a [`DiskRequest`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Director {
    request: DiskRequest,
}

impl Director {
    /// Wraps a request.
    #[must_use]
    pub const fn new(request: DiskRequest) -> Self {
        Self { request }
    }

    /// Variant the request maps to. Pure; no remote call is made.
    #[must_use]
    pub const fn kind(&self) -> DiskKind {
        let request = &self.request;
        match request.os_type {
            OsType::Custom => {
                if !request.disk_id.is_empty() {
                    DiskKind::Connected
                } else if !request.source_disk_id.is_empty()
                    || !request.source_archive_id.is_empty()
                {
                    DiskKind::FromDiskOrArchive
                } else {
                    DiskKind::Blank
                }
            }
            os if os.is_support_disk_edit() => DiskKind::FromUnix,
            os if os.is_windows() => DiskKind::FromWindows,
            _ => DiskKind::FromFixedArchive,
        }
    }

    /// Builds the selected variant from the request.
    #[must_use]
    pub fn into_builder(self) -> DiskBuilder {
        let kind = self.kind();
        let DiskRequest {
            spec,
            os_type,
            disk_id,
            source_disk_id,
            source_archive_id,
            unix_edit,
            windows_edit,
        } = self.request;
        match kind {
            DiskKind::FromUnix => DiskBuilder::FromUnix(UnixDisk {
                spec,
                os_type,
                edit: unix_edit.unwrap_or_default(),
            }),
            DiskKind::FromWindows => DiskBuilder::FromWindows(WindowsDisk {
                spec,
                os_type,
                edit: windows_edit,
            }),
            DiskKind::FromFixedArchive => {
                DiskBuilder::FromFixedArchive(FixedArchiveDisk { spec, os_type })
            }
            DiskKind::FromDiskOrArchive => DiskBuilder::FromDiskOrArchive(CopiedDisk {
                spec,
                source_disk_id,
                source_archive_id,
                edit: unix_edit,
            }),
            DiskKind::Blank => DiskBuilder::Blank(BlankDisk { spec }),
            DiskKind::Connected => DiskBuilder::Connected(ConnectedDisk { spec, disk_id }),
        }
    }
}

impl From<DiskRequest> for DiskBuilder {
    fn from(request: DiskRequest) -> Self {
        Director::new(request).into_builder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(os_type: OsType, disk: u64, source_disk: u64, source_archive: u64) -> DiskRequest {
        DiskRequest {
            os_type,
            disk_id: ResourceId::new(disk),
            source_disk_id: ResourceId::new(source_disk),
            source_archive_id: ResourceId::new(source_archive),
            ..DiskRequest::default()
        }
    }

    #[rstest]
    #[case(request(OsType::Custom, 10, 0, 0), DiskKind::Connected)]
    #[case(request(OsType::Custom, 10, 20, 30), DiskKind::Connected)]
    #[case(request(OsType::Custom, 0, 20, 0), DiskKind::FromDiskOrArchive)]
    #[case(request(OsType::Custom, 0, 0, 30), DiskKind::FromDiskOrArchive)]
    #[case(request(OsType::Custom, 0, 0, 0), DiskKind::Blank)]
    #[case(request(OsType::CentOs, 0, 0, 0), DiskKind::FromUnix)]
    #[case(request(OsType::Ubuntu, 0, 0, 0), DiskKind::FromUnix)]
    #[case(request(OsType::RockyLinux, 10, 0, 0), DiskKind::FromUnix)]
    #[case(request(OsType::Windows2019, 0, 0, 0), DiskKind::FromWindows)]
    #[case(request(OsType::Windows2022, 0, 0, 0), DiskKind::FromWindows)]
    #[case(request(OsType::OpnSense, 0, 0, 0), DiskKind::FromFixedArchive)]
    #[case(request(OsType::SophosUtm, 0, 20, 0), DiskKind::FromFixedArchive)]
    fn selects_variant(#[case] disk: DiskRequest, #[case] expected: DiskKind) {
        let director = Director::new(disk);
        assert_eq!(director.kind(), expected);
        assert_eq!(director.into_builder().kind(), expected);
    }

    #[test]
    fn unix_builder_defaults_missing_edit() {
        let builder = DiskBuilder::from(request(OsType::Debian, 0, 0, 0));
        let DiskBuilder::FromUnix(disk) = builder else {
            panic!("expected a Unix disk");
        };
        assert_eq!(disk.edit, UnixEditParams::default());
    }
}
