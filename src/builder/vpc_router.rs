//! VPC router builder.

use std::net::Ipv4Addr;

use tracing::{debug, info};

use super::{BuildResult, VpcRouterPorts, first_duplicate, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    SwitchConnection, VpcRouter, VpcRouterCreateRequest, VpcRouterInterface, VpcRouterPlan,
    VpcRouterSettings, VpcRouterUpdateRequest,
};
use crate::power::{PowerController, VpcRouterPower};
use crate::types::{ResourceId, Tag, Zone};
use crate::wait::wait_until_ready;

/// Highest index of a private NIC; index 0 is the public NIC.
pub const MAX_NIC_INDEX: u8 = 7;

/// Addresses a redundant pair needs on each segment: one per instance.
const REDUNDANT_ADDRESSES: usize = 2;

/// A private NIC of a VPC router.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VpcRouterNic {
    /// NIC index, 1 to 7.
    pub index: u8,
    /// Switch to plug the NIC into.
    pub switch_id: ResourceId,
    /// Shared address of the redundant pair; redundant plans only.
    pub virtual_ip: Option<Ipv4Addr>,
    /// Router address, or one address per instance on redundant plans.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Prefix length of the switch subnet.
    pub network_mask_len: u8,
}

impl VpcRouterNic {
    fn settings(&self) -> VpcRouterInterface {
        VpcRouterInterface {
            index: self.index,
            switch_id: self.switch_id,
            virtual_ip: self.virtual_ip,
            ip_addresses: self.ip_addresses.clone(),
            network_mask_len: self.network_mask_len,
        }
    }
}

/// Declarative description of a VPC router.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VpcRouterBuilder {
    /// Existing router targeted by [`VpcRouterBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Plan.
    pub plan: VpcRouterPlan,
    /// Switch of the public NIC; redundant plans only.
    pub switch_id: ResourceId,
    /// Shared public address; redundant plans only.
    pub virtual_ip: Option<Ipv4Addr>,
    /// Real public addresses; redundant plans only.
    pub ip_addresses: Vec<Ipv4Addr>,
    /// Virtual router id of the pair; redundant plans only.
    pub vrid: Option<u8>,
    /// Route to the internet.
    pub internet_connection_enabled: bool,
    /// Remote syslog target.
    pub syslog_host: Option<String>,
    /// Private NICs.
    pub nics: Vec<VpcRouterNic>,
    /// Boot once configured.
    pub boot_after_create: bool,
    /// Do not wait for the boot to complete.
    pub no_wait: bool,
    /// Waits and power retries.
    pub timing: Timing,
}

impl VpcRouterBuilder {
    fn settings(&self) -> VpcRouterSettings {
        VpcRouterSettings {
            vrid: self.vrid,
            internet_connection_enabled: self.internet_connection_enabled,
            interfaces: self.nics.iter().map(VpcRouterNic::settings).collect(),
            syslog_host: self.syslog_host.clone(),
        }
    }

    fn check_fields(&self) -> Result<(), ProvisionError> {
        require_non_blank("VPC router", "name", &self.name)?;
        if self.plan.is_redundant() {
            require_id("VPC router", "switch", self.switch_id)?;
            if self.virtual_ip.is_none()
                || self.ip_addresses.len() != REDUNDANT_ADDRESSES
                || self.vrid.is_none()
            {
                return Err(ProvisionError::validation(
                    "VPC router",
                    "redundant plans need a virtual IP, two real IPs and a VRID",
                ));
            }
        } else if !self.switch_id.is_empty()
            || self.virtual_ip.is_some()
            || !self.ip_addresses.is_empty()
        {
            return Err(ProvisionError::validation(
                "VPC router",
                "the standard plan uses the shared segment without explicit addresses",
            ));
        }
        if let Some(index) = first_duplicate(self.nics.iter().map(|nic| nic.index)) {
            return Err(ProvisionError::validation(
                "VPC router",
                format!("NIC index {index} is used twice"),
            ));
        }
        let addresses = if self.plan.is_redundant() {
            REDUNDANT_ADDRESSES
        } else {
            1
        };
        for nic in &self.nics {
            if !(1..=MAX_NIC_INDEX).contains(&nic.index) {
                return Err(ProvisionError::validation(
                    "VPC router",
                    format!("NIC index {} is outside 1..={MAX_NIC_INDEX}", nic.index),
                ));
            }
            require_id("VPC router", "NIC switch", nic.switch_id)?;
            if nic.ip_addresses.len() != addresses
                || nic.virtual_ip.is_some() != self.plan.is_redundant()
            {
                return Err(ProvisionError::validation(
                    "VPC router",
                    format!("NIC {} has the wrong number of addresses", nic.index),
                ));
            }
        }
        Ok(())
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for addressing that does not
    /// fit the plan or bad NIC indexes, and [`ProvisionError::NotFound`] for
    /// missing switches.
    pub async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: VpcRouterPorts + ?Sized,
    {
        self.check_fields()?;
        let switches = self.switch_id.non_empty().into_iter();
        for switch_id in switches.chain(self.nics.iter().map(|nic| nic.switch_id)) {
            api.read_switch(ctx, zone, switch_id)
                .await
                .during("read switch")?;
        }
        Ok(())
    }

    /// Creates the router, plugs its private NICs in, applies its settings,
    /// and boots it when `boot_after_create` is set.
    ///
    /// # Errors
    ///
    /// Returns every error of [`VpcRouterBuilder::validate`], the first
    /// failed remote call, and wait or power errors.
    pub async fn build<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: VpcRouterPorts + ?Sized,
    {
        self.validate(ctx, api, zone).await?;
        let public_upstream = match self.switch_id.non_empty() {
            Some(switch_id) => SwitchConnection::Switch(switch_id),
            None => SwitchConnection::Shared,
        };
        let request = VpcRouterCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            plan: self.plan,
            public_upstream,
            virtual_ip: self.virtual_ip,
            ip_addresses: self.ip_addresses.clone(),
            settings: VpcRouterSettings {
                interfaces: Vec::new(),
                ..self.settings()
            },
        };
        let created = api
            .create_vpc_router(ctx, zone, &request)
            .await
            .during("create VPC router")?;
        let id = created.id;
        debug!(vpc_router_id = %id, %zone, plan = ?self.plan, "VPC router created");
        let ready = wait_until_ready(
            ctx,
            "VPC router",
            id,
            move || api.read_vpc_router(ctx, zone, id),
            self.timing.wait,
        )
        .await?;

        for nic in &self.nics {
            api.connect_vpc_router_to_switch(ctx, zone, id, nic.index, nic.switch_id)
                .await
                .during("connect VPC router to switch")?;
            debug!(
                vpc_router_id = %id,
                index = nic.index,
                switch_id = %nic.switch_id,
                "NIC connected"
            );
        }
        self.apply_settings(ctx, api, zone, &ready).await?;

        if self.boot_after_create {
            PowerController::new(self.timing)
                .with_no_wait(self.no_wait)
                .boot(ctx, &VpcRouterPower::new(api, zone, id))
                .await?;
        }
        info!(vpc_router_id = %id, %zone, "VPC router ready");
        Ok(BuildResult::with_id(id))
    }

    async fn apply_settings<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        current: &VpcRouter,
    ) -> Result<(), ProvisionError>
    where
        A: VpcRouterPorts + ?Sized,
    {
        let request = VpcRouterUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            settings: self.settings(),
            settings_hash: current.settings_hash.clone(),
        };
        api.update_vpc_router(ctx, zone, current.id, &request)
            .await
            .during("update VPC router")?;
        api.config_vpc_router(ctx, zone, current.id)
            .await
            .during("apply VPC router settings")?;
        Ok(())
    }

    /// Updates metadata and settings of the existing router and applies them.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing router is set
    /// or the parameters are unusable, and the first failed remote call.
    pub async fn update<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: VpcRouterPorts + ?Sized,
    {
        require_id("VPC router", "id", self.id)?;
        self.check_fields()?;
        let current = api
            .read_vpc_router(ctx, zone, self.id)
            .await
            .during("read VPC router")?;
        self.apply_settings(ctx, api, zone, &current).await?;
        info!(vpc_router_id = %self.id, %zone, "VPC router updated");
        Ok(BuildResult::with_id(self.id))
    }
}
