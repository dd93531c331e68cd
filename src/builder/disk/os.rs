//! Operating system catalogue used to pick a disk's source archive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ArchiveApi;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{Archive, Availability, FindCondition};
use crate::types::Zone;

/// Operating system a disk is built from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsType {
    /// No public archive: blank disks, copies of existing disks or archives,
    /// and existing disks.
    #[default]
    Custom,
    /// CentOS.
    #[serde(rename = "centos")]
    CentOs,
    /// Rocky Linux.
    RockyLinux,
    /// AlmaLinux.
    AlmaLinux,
    /// Ubuntu.
    Ubuntu,
    /// Debian.
    Debian,
    /// MIRACLE LINUX.
    MiracleLinux,
    /// Windows Server 2019.
    Windows2019,
    /// Windows Server 2022.
    Windows2022,
    /// OPNsense.
    OpnSense,
    /// Netwiser Virtual Edition.
    Netwiser,
    /// Sophos UTM.
    SophosUtm,
}

impl OsType {
    /// Returns `true` for images whose disk the remote can edit before the
    /// first boot.
    #[must_use]
    pub const fn is_support_disk_edit(self) -> bool {
        matches!(
            self,
            Self::CentOs
                | Self::RockyLinux
                | Self::AlmaLinux
                | Self::Ubuntu
                | Self::Debian
                | Self::MiracleLinux
        )
    }

    /// Returns `true` for licensed Windows images.
    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows2019 | Self::Windows2022)
    }

    /// Tags identifying the public archive of this operating system.
    #[must_use]
    pub const fn archive_tags(self) -> &'static [&'static str] {
        match self {
            Self::Custom => &[],
            Self::CentOs => &["current-stable", "distro-centos"],
            Self::RockyLinux => &["current-stable", "distro-rocky"],
            Self::AlmaLinux => &["current-stable", "distro-alma"],
            Self::Ubuntu => &["current-stable", "distro-ubuntu"],
            Self::Debian => &["current-stable", "distro-debian"],
            Self::MiracleLinux => &["current-stable", "distro-miracle"],
            Self::Windows2019 => &["os-windows", "distro-ver-2019"],
            Self::Windows2022 => &["os-windows", "distro-ver-2022"],
            Self::OpnSense => &["distro-opnsense"],
            Self::Netwiser => &["pkg-netwiserve"],
            Self::SophosUtm => &["pkg-sophosutm"],
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Custom => "custom",
            Self::CentOs => "centos",
            Self::RockyLinux => "rocky-linux",
            Self::AlmaLinux => "alma-linux",
            Self::Ubuntu => "ubuntu",
            Self::Debian => "debian",
            Self::MiracleLinux => "miracle-linux",
            Self::Windows2019 => "windows2019",
            Self::Windows2022 => "windows2022",
            Self::OpnSense => "opn-sense",
            Self::Netwiser => "netwiser",
            Self::SophosUtm => "sophos-utm",
        };
        f.write_str(name)
    }
}

/// Looks up the available public archive of `os_type` in `zone`.
pub(super) async fn find_os_archive<A>(
    ctx: &Context,
    api: &A,
    zone: &Zone,
    os_type: OsType,
) -> Result<Archive, ProvisionError>
where
    A: ArchiveApi + ?Sized,
{
    let tags = os_type.archive_tags();
    if tags.is_empty() {
        return Err(ProvisionError::validation(
            "disk",
            format!("os type {os_type} has no public archive"),
        ));
    }
    let condition = FindCondition::with_tags(tags.iter().copied());
    api.find_archives(ctx, zone, &condition)
        .await
        .during("find archive")?
        .into_iter()
        .find(|archive| archive.availability == Availability::Available)
        .ok_or_else(|| {
            ProvisionError::validation(
                "disk",
                format!("no available archive for os type {os_type} in zone {zone}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OsType::CentOs, true, false)]
    #[case(OsType::Ubuntu, true, false)]
    #[case(OsType::RockyLinux, true, false)]
    #[case(OsType::Windows2019, false, true)]
    #[case(OsType::Windows2022, false, true)]
    #[case(OsType::OpnSense, false, false)]
    #[case(OsType::Custom, false, false)]
    fn capabilities(#[case] os: OsType, #[case] editable: bool, #[case] windows: bool) {
        assert_eq!(os.is_support_disk_edit(), editable);
        assert_eq!(os.is_windows(), windows);
    }

    #[test]
    fn only_custom_lacks_archive_tags() {
        assert!(OsType::Custom.archive_tags().is_empty());
        assert!(!OsType::SophosUtm.archive_tags().is_empty());
    }
}
