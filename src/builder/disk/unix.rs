//! Disks copied from a public Unix-like archive and edited before first boot.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::debug;
use uuid::Uuid;

use super::os::find_os_archive;
use super::{Artifacts, DiskPlanOutcome, DiskSpec, OsType};
use crate::builder::DiskPorts;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    DiskEditNote, DiskEditRequest, EditUserSubnet, NoteCreateRequest, SshKeyGenerateRequest,
};
use crate::types::{ResourceId, Zone};

/// Request to have the remote generate a key pair during the build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SshKeyGeneration {
    /// Name of the stored public key; a random one when unset.
    pub name: Option<String>,
    /// Description of the stored public key.
    pub description: String,
    /// Passphrase protecting the private key.
    pub pass_phrase: Option<String>,
}

impl SshKeyGeneration {
    fn request(&self) -> SshKeyGenerateRequest {
        SshKeyGenerateRequest {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| format!("kumo-{}", Uuid::new_v4())),
            description: self.description.clone(),
            pass_phrase: self.pass_phrase.clone(),
        }
    }
}

/// OS-level settings written into a Unix-like disk.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnixEditParams {
    /// Host name.
    pub host_name: Option<String>,
    /// Administrator password.
    pub password: Option<String>,
    /// Disable password authentication over SSH.
    pub disable_pw_auth: bool,
    /// Configure the primary NIC through DHCP.
    pub enable_dhcp: bool,
    /// Regenerate partition UUIDs.
    pub change_partition_uuid: bool,
    /// Static address of the primary NIC.
    pub ip_address: Option<Ipv4Addr>,
    /// Prefix length for the static address.
    pub network_mask_len: Option<u8>,
    /// Default gateway for the static address.
    pub default_route: Option<Ipv4Addr>,
    /// Public keys to install verbatim.
    pub ssh_keys: Vec<String>,
    /// Stored keys to install.
    pub ssh_key_ids: Vec<ResourceId>,
    /// Key pair to generate and install.
    pub generate_ssh_key: Option<SshKeyGeneration>,
    /// Delete the generated key from the key store once the disk is ready.
    pub is_ssh_keys_ephemeral: bool,
    /// Existing startup scripts to run.
    pub notes: Vec<DiskEditNote>,
    /// Startup scripts to store as new notes and run.
    pub note_contents: Vec<String>,
    /// Delete the notes created from `note_contents` once the disk is ready.
    pub is_notes_ephemeral: bool,
}

impl UnixEditParams {
    pub(super) async fn validate<A>(&self, ctx: &Context, api: &A) -> Result<(), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        if self.is_ssh_keys_ephemeral && self.generate_ssh_key.is_none() {
            return Err(ProvisionError::validation(
                "disk",
                "ephemeral SSH keys require a key to be generated",
            ));
        }
        if self.ip_address.is_some() != self.network_mask_len.is_some() {
            return Err(ProvisionError::validation(
                "disk",
                "static address and network mask length must be set together",
            ));
        }
        if self.default_route.is_some() && self.ip_address.is_none() {
            return Err(ProvisionError::validation(
                "disk",
                "default route requires a static address",
            ));
        }
        for id in &self.ssh_key_ids {
            api.read_ssh_key(ctx, *id).await.during("read SSH key")?;
        }
        for note in &self.notes {
            api.read_note(ctx, note.id).await.during("read note")?;
        }
        Ok(())
    }

    /// Generates keys and stores notes, returning the edit request that
    /// references them.
    pub(super) async fn prepare<A>(
        &self,
        ctx: &Context,
        api: &A,
    ) -> Result<(DiskEditRequest, Artifacts), ProvisionError>
    where
        A: DiskPorts + ?Sized,
    {
        let user_subnet = match (self.default_route, self.network_mask_len) {
            (Some(default_route), Some(network_mask_len)) => Some(EditUserSubnet {
                default_route,
                network_mask_len,
            }),
            _ => None,
        };
        let mut edit = DiskEditRequest {
            host_name: self.host_name.clone(),
            password: self.password.clone(),
            disable_pw_auth: self.disable_pw_auth,
            enable_dhcp: self.enable_dhcp,
            change_partition_uuid: self.change_partition_uuid,
            user_ip_address: self.ip_address,
            user_subnet,
            ssh_keys: self.ssh_keys.clone(),
            ssh_key_ids: self.ssh_key_ids.clone(),
            notes: self.notes.clone(),
        };
        let mut artifacts = Artifacts {
            delete_key: self.is_ssh_keys_ephemeral,
            delete_notes: self.is_notes_ephemeral,
            ..Artifacts::default()
        };

        if let Some(generation) = &self.generate_ssh_key {
            let key = api
                .generate_ssh_key(ctx, &generation.request())
                .await
                .during("generate SSH key")?;
            debug!(ssh_key_id = %key.id, "generated SSH key");
            edit.ssh_key_ids.push(key.id);
            artifacts.generated_key = Some(key);
        }

        for content in &self.note_contents {
            let request = NoteCreateRequest {
                name: format!("kumo-{}", Uuid::new_v4()),
                content: content.clone(),
                tags: Vec::new(),
            };
            let note = api.create_note(ctx, &request).await.during("create note")?;
            debug!(note_id = %note.id, "stored startup script");
            edit.notes.push(DiskEditNote {
                id: note.id,
                variables: BTreeMap::new(),
            });
            artifacts.note_ids.push(note.id);
        }

        Ok((edit, artifacts))
    }
}

/// Disk copied from the public archive of a Unix-like OS and edited.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnixDisk {
    /// Shared parameters.
    pub spec: DiskSpec,
    /// Operating system; must support disk edits.
    pub os_type: OsType,
    /// Settings written into the disk.
    pub edit: UnixEditParams,
}

impl UnixDisk {
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
        if !self.os_type.is_support_disk_edit() {
            return Err(ProvisionError::validation(
                "disk",
                format!("os type {} does not support disk edit", self.os_type),
            ));
        }
        find_os_archive(ctx, api, zone, self.os_type).await?;
        self.edit.validate(ctx, api).await
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
        let (edit, artifacts) = self.edit.prepare(ctx, api).await?;
        Ok(DiskPlanOutcome {
            create: self
                .spec
                .create_request(server_id, ResourceId::EMPTY, archive.id),
            edit: Some(edit),
            artifacts,
        })
    }
}
