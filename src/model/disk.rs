//! Disk, archive and disk plan records.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::Availability;
use crate::types::{ResourceId, Tag};

/// Bus a disk is attached through.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskConnection {
    /// Paravirtualised driver.
    #[default]
    Virtio,
    /// Emulated IDE.
    Ide,
}

/// A disk as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Disk {
    /// Disk identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Storage availability.
    pub availability: Availability,
    /// Disk plan.
    pub plan_id: ResourceId,
    /// Size in GiB.
    pub size_gb: u32,
    /// Attachment bus.
    pub connection: DiskConnection,
    /// Disk this one was copied from.
    pub source_disk_id: ResourceId,
    /// Archive this one was copied from.
    pub source_archive_id: ResourceId,
    /// Server the disk is connected to.
    pub server_id: ResourceId,
}

/// Installer bundle information attached to vendor-supplied archives.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BundleInfo {
    /// Host class the bundle requires (for example `ms_windows`).
    pub host_class: String,
    /// Licensed service class.
    pub service_class: String,
}

/// An archive (disk image) as reported by the remote.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Archive {
    /// Archive identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Tags, including OS family markers such as `os-linux`.
    pub tags: Vec<Tag>,
    /// Storage availability.
    pub availability: Availability,
    /// Size in GiB.
    pub size_gb: u32,
    /// Bundle information, present on licensed images.
    pub bundle_info: Option<BundleInfo>,
    /// Disk this archive was taken from.
    pub source_disk_id: ResourceId,
    /// Availability of the source disk.
    pub source_disk_availability: Availability,
    /// Archive this archive was copied from.
    pub source_archive_id: ResourceId,
    /// Availability of the source archive.
    pub source_archive_availability: Availability,
}

/// One orderable size of a disk plan.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskPlanSize {
    /// Size in GiB.
    pub size_gb: u32,
    /// Whether the size can currently be ordered.
    pub availability: Availability,
}

/// A disk plan (for example SSD or HDD) and its orderable sizes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskPlan {
    /// Plan identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Orderable sizes.
    pub sizes: Vec<DiskPlanSize>,
}

impl DiskPlan {
    /// Returns `true` when `size_gb` is an available size of this plan.
    #[must_use]
    pub fn offers(&self, size_gb: u32) -> bool {
        self.sizes
            .iter()
            .any(|size| size.size_gb == size_gb && size.availability == Availability::Available)
    }
}

/// Parameters of a disk creation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskCreateRequest {
    /// Disk plan.
    pub plan_id: ResourceId,
    /// Attachment bus.
    pub connection: DiskConnection,
    /// Disk to copy from.
    pub source_disk_id: ResourceId,
    /// Archive to copy from.
    pub source_archive_id: ResourceId,
    /// Server to connect the disk to on creation.
    pub server_id: ResourceId,
    /// Size in GiB.
    pub size_gb: u32,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
}

/// Network settings written into the disk during an edit.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EditUserSubnet {
    /// Default gateway.
    pub default_route: Ipv4Addr,
    /// Prefix length of the subnet.
    pub network_mask_len: u8,
}

/// A startup script (note) to run on first boot, with template variables.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskEditNote {
    /// Note identifier.
    pub id: ResourceId,
    /// Template variables passed to the note.
    pub variables: BTreeMap<String, String>,
}

/// Parameters of a disk edit: OS-level settings written into the image.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskEditRequest {
    /// Host name.
    pub host_name: Option<String>,
    /// Administrator password.
    pub password: Option<String>,
    /// Disable password authentication over SSH.
    pub disable_pw_auth: bool,
    /// Configure the primary NIC through DHCP.
    pub enable_dhcp: bool,
    /// Regenerate the partition UUIDs.
    pub change_partition_uuid: bool,
    /// Static address of the primary NIC.
    pub user_ip_address: Option<Ipv4Addr>,
    /// Gateway and prefix for the static address.
    pub user_subnet: Option<EditUserSubnet>,
    /// Public keys to install.
    pub ssh_keys: Vec<String>,
    /// Stored SSH keys to install.
    pub ssh_key_ids: Vec<ResourceId>,
    /// Startup scripts to run.
    pub notes: Vec<DiskEditNote>,
}

/// Parameters of an in-place disk update.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiskUpdateRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Attachment bus.
    pub connection: DiskConnection,
}
