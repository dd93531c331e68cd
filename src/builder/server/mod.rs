//! Server builder: creates the server shell, builds its disks, configures its
//! NICs and CD-ROM, then boots it.

use std::net::Ipv4Addr;

use tracing::{debug, info};

use super::{BuildResult, DiskBuilder, ServerPorts, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    InterfaceDriver, InterfaceUpdateRequest, Server, ServerCreateRequest, ServerPlanQuery,
    ServerUpdateRequest, SwitchConnection,
};
use crate::power::{PowerController, ServerPower};
use crate::types::{ResourceId, Tag, Zone};

/// Maximum number of NICs besides the primary one.
pub const MAX_ADDITIONAL_NICS: usize = 9;

/// One NIC of a server.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NicSpec {
    /// Where the NIC is plugged in.
    pub upstream: SwitchConnection,
    /// Packet filter to bind after creation.
    pub packet_filter_id: ResourceId,
    /// Address shown in the control panel. Only meaningful for NICs plugged
    /// into a user switch.
    pub display_ip_address: Option<Ipv4Addr>,
}

/// Declarative description of a server and everything attached to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerBuilder {
    /// Existing server targeted by [`ServerBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Shape of the plan to look up.
    pub plan: ServerPlanQuery,
    /// Primary NIC; `None` builds a server without network.
    pub nic: Option<NicSpec>,
    /// Further NICs in index order.
    pub additional_nics: Vec<NicSpec>,
    /// NIC driver.
    pub interface_driver: InterfaceDriver,
    /// Dedicated host to place the server on.
    pub private_host_id: ResourceId,
    /// Disks in connection order; the first one is the boot disk.
    pub disks: Vec<DiskBuilder>,
    /// ISO image to insert.
    pub cdrom_id: ResourceId,
    /// Boot once everything is attached.
    pub boot_after_create: bool,
    /// Do not wait for the boot to complete.
    pub no_wait: bool,
    /// Force the shutdown a plan change needs.
    pub force_shutdown: bool,
    /// Waits and power retries.
    pub timing: Timing,
}

impl ServerBuilder {
    fn nics(&self) -> impl Iterator<Item = &NicSpec> {
        self.nic.iter().chain(&self.additional_nics)
    }

    const fn power(&self) -> PowerController {
        PowerController::new(self.timing)
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for unusable parameters or a
    /// plan shape that does not match exactly one plan,
    /// [`ProvisionError::NotFound`] for missing switches, packet filters,
    /// ISO images and disk sources, and the translated lookup errors.
    pub async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        self.check(ctx, api, zone).await.map(|_| ())
    }

    async fn check<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<ResourceId, ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        require_non_blank("server", "name", &self.name)?;
        if self.nic.is_none() && !self.additional_nics.is_empty() {
            return Err(ProvisionError::validation(
                "server",
                "additional NICs require a primary NIC",
            ));
        }
        if self.additional_nics.len() > MAX_ADDITIONAL_NICS {
            return Err(ProvisionError::validation(
                "server",
                format!("at most {MAX_ADDITIONAL_NICS} additional NICs are supported"),
            ));
        }
        let plan_id = self.resolve_plan(ctx, api, zone).await?;
        for nic in self.nics() {
            match nic.upstream {
                SwitchConnection::Switch(switch_id) => {
                    api.read_switch(ctx, zone, switch_id)
                        .await
                        .during("read switch")?;
                }
                SwitchConnection::Shared | SwitchConnection::Disconnected => {
                    if nic.display_ip_address.is_some() {
                        return Err(ProvisionError::validation(
                            "server",
                            "a display IP address needs a NIC plugged into a switch",
                        ));
                    }
                }
            }
            if let Some(filter_id) = nic.packet_filter_id.non_empty() {
                api.read_packet_filter(ctx, zone, filter_id)
                    .await
                    .during("read packet filter")?;
            }
        }
        if let Some(cdrom_id) = self.cdrom_id.non_empty() {
            api.read_cdrom(ctx, zone, cdrom_id)
                .await
                .during("read ISO image")?;
        }
        for disk in &self.disks {
            disk.validate(ctx, api, zone).await?;
        }
        Ok(plan_id)
    }

    async fn resolve_plan<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<ResourceId, ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        let plans = api
            .find_server_plans(ctx, zone)
            .await
            .during("find server plans")?;
        let mut matching = plans.iter().filter(|plan| self.plan.matches(plan));
        match (matching.next(), matching.next()) {
            (Some(plan), None) => Ok(plan.id),
            (None, _) => Err(ProvisionError::validation(
                "server",
                format!(
                    "no available plan with {} CPU and {} GiB memory",
                    self.plan.cpu, self.plan.memory_gb
                ),
            )),
            (Some(_), Some(_)) => Err(ProvisionError::validation(
                "server",
                format!(
                    "several plans match {} CPU and {} GiB memory; set a generation",
                    self.plan.cpu, self.plan.memory_gb
                ),
            )),
        }
    }

    /// Creates the server, builds its disks in order, configures its NICs
    /// and CD-ROM, and boots it when `boot_after_create` is set.
    ///
    /// # Errors
    ///
    /// Returns every error of [`ServerBuilder::validate`], the first failed
    /// remote call, and wait or power errors. Nothing is rolled back.
    pub async fn build<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        let plan_id = self.check(ctx, api, zone).await?;
        let request = ServerCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            plan_id,
            connected_switches: self.nics().map(|nic| nic.upstream).collect(),
            interface_driver: self.interface_driver,
            private_host_id: self.private_host_id,
        };
        let server = api
            .create_server(ctx, zone, &request)
            .await
            .during("create server")?;
        let id = server.id;
        info!(server_id = %id, %zone, %plan_id, "server created");

        let mut generated_ssh_private_key = None;
        for (position, disk) in self.disks.iter().enumerate() {
            let built = disk.build(ctx, api, zone, id, &self.timing).await?;
            debug!(server_id = %id, disk_id = %built.id, position, "disk attached");
            if generated_ssh_private_key.is_none() {
                generated_ssh_private_key = built.generated_ssh_private_key;
            }
        }

        self.configure_nics(ctx, api, zone, &server).await?;

        if let Some(cdrom_id) = self.cdrom_id.non_empty() {
            api.insert_cdrom(ctx, zone, id, cdrom_id)
                .await
                .during("insert ISO image")?;
            debug!(server_id = %id, %cdrom_id, "ISO image inserted");
        }

        if self.boot_after_create {
            self.power()
                .with_no_wait(self.no_wait)
                .boot(ctx, &ServerPower::new(api, zone, id))
                .await?;
        }
        info!(server_id = %id, %zone, "server ready");
        Ok(BuildResult {
            id,
            generated_ssh_private_key,
        })
    }

    async fn configure_nics<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        server: &Server,
    ) -> Result<(), ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        for (index, nic) in self.nics().enumerate() {
            if nic.packet_filter_id.is_empty() && nic.display_ip_address.is_none() {
                continue;
            }
            let interface = server.interfaces.get(index).ok_or_else(|| {
                ProvisionError::invalid_state(
                    "server",
                    server.id,
                    format!("NIC {index} was not created"),
                )
            })?;
            if let Some(filter_id) = nic.packet_filter_id.non_empty() {
                api.connect_to_packet_filter(ctx, zone, interface.id, filter_id)
                    .await
                    .during("connect packet filter")?;
                debug!(interface_id = %interface.id, %filter_id, "packet filter bound");
            }
            if let Some(address) = nic.display_ip_address {
                let request = InterfaceUpdateRequest {
                    user_ip_address: Some(address),
                };
                api.update_interface(ctx, zone, interface.id, &request)
                    .await
                    .during("update interface")?;
                debug!(interface_id = %interface.id, %address, "display address set");
            }
        }
        Ok(())
    }

    /// Applies plan, metadata and CD-ROM changes to the existing server.
    ///
    /// A plan change stops the server first and gives it a new identifier,
    /// which the result carries. The server is booted again when it was
    /// running before or `boot_after_create` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing server is set
    /// or the plan shape is unusable, the first failed remote call, and power
    /// errors.
    pub async fn update<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: ServerPorts + ?Sized,
    {
        require_id("server", "id", self.id)?;
        require_non_blank("server", "name", &self.name)?;
        let plan_id = self.resolve_plan(ctx, api, zone).await?;
        if let Some(cdrom_id) = self.cdrom_id.non_empty() {
            api.read_cdrom(ctx, zone, cdrom_id)
                .await
                .during("read ISO image")?;
        }
        let current = api
            .read_server(ctx, zone, self.id)
            .await
            .during("read server")?;
        let was_up = current.instance_status.is_up();
        let mut is_up = was_up;
        let mut id = current.id;

        if current.plan_id != plan_id {
            if was_up {
                self.power()
                    .shutdown(ctx, &ServerPower::new(api, zone, id), self.force_shutdown)
                    .await?;
                is_up = false;
            }
            let changed = api
                .change_server_plan(ctx, zone, id, plan_id)
                .await
                .during("change server plan")?;
            info!(old_id = %id, new_id = %changed.id, %plan_id, "server plan changed");
            id = changed.id;
        }

        let request = ServerUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
        };
        api.update_server(ctx, zone, id, &request)
            .await
            .during("update server")?;

        if current.cdrom_id != self.cdrom_id {
            if let Some(inserted) = current.cdrom_id.non_empty() {
                api.eject_cdrom(ctx, zone, id, inserted)
                    .await
                    .during("eject ISO image")?;
            }
            if let Some(cdrom_id) = self.cdrom_id.non_empty() {
                api.insert_cdrom(ctx, zone, id, cdrom_id)
                    .await
                    .during("insert ISO image")?;
            }
        }

        if !is_up && (was_up || self.boot_after_create) {
            self.power()
                .with_no_wait(self.no_wait)
                .boot(ctx, &ServerPower::new(api, zone, id))
                .await?;
        }
        info!(server_id = %id, %zone, "server updated");
        Ok(BuildResult::with_id(id))
    }
}

#[cfg(test)]
mod tests;
