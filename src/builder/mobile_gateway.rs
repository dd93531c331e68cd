//! Mobile gateway builder.

use std::net::Ipv4Addr;

use tracing::{debug, info};

use super::{BuildResult, MobileGatewayPorts, first_duplicate, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    MobileGateway, MobileGatewayCreateRequest, MobileGatewayDns, MobileGatewayInterface,
    MobileGatewaySettings, MobileGatewayUpdateRequest, TrafficConfig,
};
use crate::power::{MobileGatewayPower, PowerController};
use crate::types::{ResourceId, Tag, Zone};
use crate::wait::wait_until_ready;

/// A SIM to register with the gateway.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimSpec {
    /// SIM to register.
    pub sim_id: ResourceId,
    /// Address the SIM gets inside the gateway's network.
    pub ip_address: Ipv4Addr,
}

/// Declarative description of a mobile gateway.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MobileGatewayBuilder {
    /// Existing gateway targeted by [`MobileGatewayBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Private NIC.
    pub interface: Option<MobileGatewayInterface>,
    /// Let SIMs reach the internet.
    pub internet_connection_enabled: bool,
    /// Let SIMs reach each other.
    pub inter_device_communication_enabled: bool,
    /// Resolvers handed to SIMs.
    pub dns: Option<MobileGatewayDns>,
    /// SIMs to register.
    pub sims: Vec<SimSpec>,
    /// Monthly traffic quota.
    pub traffic_config: Option<TrafficConfig>,
    /// Boot once configured.
    pub boot_after_create: bool,
    /// Do not wait for the boot to complete.
    pub no_wait: bool,
    /// Waits and power retries.
    pub timing: Timing,
}

impl MobileGatewayBuilder {
    fn settings(&self) -> MobileGatewaySettings {
        MobileGatewaySettings {
            internet_connection_enabled: self.internet_connection_enabled,
            inter_device_communication_enabled: self.inter_device_communication_enabled,
            interface: self.interface.clone(),
        }
    }

    fn check_fields(&self) -> Result<(), ProvisionError> {
        require_non_blank("mobile gateway", "name", &self.name)?;
        if let Some(interface) = &self.interface {
            require_id("mobile gateway", "interface switch", interface.switch_id)?;
        }
        if let Some(sim_id) = first_duplicate(self.sims.iter().map(|sim| sim.sim_id)) {
            return Err(ProvisionError::validation(
                "mobile gateway",
                format!("SIM {sim_id} is listed twice"),
            ));
        }
        Ok(())
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for duplicate SIMs and
    /// [`ProvisionError::NotFound`] for a missing switch or SIM.
    pub async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: MobileGatewayPorts + ?Sized,
    {
        self.check_fields()?;
        if let Some(interface) = &self.interface {
            api.read_switch(ctx, zone, interface.switch_id)
                .await
                .during("read switch")?;
        }
        for sim in &self.sims {
            api.read_sim(ctx, sim.sim_id).await.during("read SIM")?;
        }
        Ok(())
    }

    /// Creates the gateway, connects and configures it, registers its SIMs,
    /// and boots it when `boot_after_create` is set.
    ///
    /// # Errors
    ///
    /// Returns every error of [`MobileGatewayBuilder::validate`], the first
    /// failed remote call, and wait or power errors.
    pub async fn build<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: MobileGatewayPorts + ?Sized,
    {
        self.validate(ctx, api, zone).await?;
        let request = MobileGatewayCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            settings: MobileGatewaySettings {
                interface: None,
                ..self.settings()
            },
        };
        let created = api
            .create_mobile_gateway(ctx, zone, &request)
            .await
            .during("create mobile gateway")?;
        let id = created.id;
        debug!(mobile_gateway_id = %id, %zone, "mobile gateway created");
        let ready = wait_until_ready(
            ctx,
            "mobile gateway",
            id,
            move || api.read_mobile_gateway(ctx, zone, id),
            self.timing.wait,
        )
        .await?;

        if let Some(interface) = &self.interface {
            api.connect_mobile_gateway_to_switch(ctx, zone, id, interface.switch_id)
                .await
                .during("connect mobile gateway to switch")?;
        }
        self.apply_settings(ctx, api, zone, &ready).await?;

        if let Some(dns) = &self.dns {
            api.set_mobile_gateway_dns(ctx, zone, id, dns)
                .await
                .during("set mobile gateway DNS")?;
        }
        self.register_sims(ctx, api, zone, id, &[]).await?;
        if let Some(traffic) = &self.traffic_config {
            api.set_traffic_config(ctx, zone, id, traffic)
                .await
                .during("set traffic config")?;
        }

        if self.boot_after_create {
            PowerController::new(self.timing)
                .with_no_wait(self.no_wait)
                .boot(ctx, &MobileGatewayPower::new(api, zone, id))
                .await?;
        }
        info!(mobile_gateway_id = %id, %zone, "mobile gateway ready");
        Ok(BuildResult::with_id(id))
    }

    async fn apply_settings<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        current: &MobileGateway,
    ) -> Result<(), ProvisionError>
    where
        A: MobileGatewayPorts + ?Sized,
    {
        let request = MobileGatewayUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            settings: self.settings(),
            settings_hash: current.settings_hash.clone(),
        };
        api.update_mobile_gateway(ctx, zone, current.id, &request)
            .await
            .during("update mobile gateway")?;
        api.config_mobile_gateway(ctx, zone, current.id)
            .await
            .during("apply mobile gateway settings")?;
        Ok(())
    }

    /// Adds every SIM not in `registered` and assigns its address.
    async fn register_sims<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        id: ResourceId,
        registered: &[ResourceId],
    ) -> Result<(), ProvisionError>
    where
        A: MobileGatewayPorts + ?Sized,
    {
        for sim in self
            .sims
            .iter()
            .filter(|sim| !registered.contains(&sim.sim_id))
        {
            api.add_sim(ctx, zone, id, sim.sim_id)
                .await
                .during("add SIM")?;
            api.assign_sim_ip(ctx, sim.sim_id, sim.ip_address)
                .await
                .during("assign SIM address")?;
            debug!(
                mobile_gateway_id = %id,
                sim_id = %sim.sim_id,
                ip = %sim.ip_address,
                "SIM registered"
            );
        }
        Ok(())
    }

    /// Updates metadata and settings of the existing gateway, applies them,
    /// and registers SIMs it does not know yet.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing gateway is
    /// set, and the first failed remote call.
    pub async fn update<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: MobileGatewayPorts + ?Sized,
    {
        require_id("mobile gateway", "id", self.id)?;
        self.check_fields()?;
        let current = api
            .read_mobile_gateway(ctx, zone, self.id)
            .await
            .during("read mobile gateway")?;
        self.apply_settings(ctx, api, zone, &current).await?;
        self.register_sims(ctx, api, zone, self.id, &current.sim_ids)
            .await?;
        info!(mobile_gateway_id = %self.id, %zone, "mobile gateway updated");
        Ok(BuildResult::with_id(self.id))
    }
}
