//! Database appliance builder.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::{debug, info};

use super::{BuildResult, DatabasePorts, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    DatabaseCreateRequest, DatabasePlan, DatabaseSettings, DatabaseType, DatabaseUpdateRequest,
};
use crate::power::{DatabasePower, PowerController};
use crate::types::{ResourceId, Tag, Zone};
use crate::wait::{wait_until_ready, wait_until_up};

/// Lowest listen port the appliance accepts.
const MIN_PORT: u16 = 1024;

/// Declarative description of a database appliance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatabaseBuilder {
    /// Existing appliance targeted by [`DatabaseBuilder::update`].
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
    pub plan: DatabasePlan,
    /// Engine.
    pub database_type: DatabaseType,
    /// Switch to connect to.
    pub switch_id: ResourceId,
    /// Appliance address on the switch.
    pub ip_address: Option<Ipv4Addr>,
    /// Prefix length of the switch subnet.
    pub network_mask_len: u8,
    /// Default gateway.
    pub default_route: Option<Ipv4Addr>,
    /// Service settings.
    pub settings: DatabaseSettings,
    /// Engine parameters, applied once the appliance is up.
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Waits.
    pub timing: Timing,
}

impl DatabaseBuilder {
    fn check_fields(&self) -> Result<(), ProvisionError> {
        require_non_blank("database", "name", &self.name)?;
        require_non_blank("database", "user name", &self.settings.user_name)?;
        require_non_blank("database", "password", &self.settings.password)?;
        require_id("database", "switch", self.switch_id)?;
        if self.ip_address.is_none() {
            return Err(ProvisionError::validation(
                "database",
                "an IP address is required",
            ));
        }
        if !(1..=32).contains(&self.network_mask_len) {
            return Err(ProvisionError::validation(
                "database",
                format!("invalid network mask length {}", self.network_mask_len),
            ));
        }
        if let Some(port) = self.settings.port.filter(|port| *port < MIN_PORT) {
            return Err(ProvisionError::validation(
                "database",
                format!("port {port} is outside {MIN_PORT}..=65535"),
            ));
        }
        Ok(())
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for unusable parameters and
    /// [`ProvisionError::NotFound`] when the switch does not exist.
    pub async fn validate<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<(), ProvisionError>
    where
        A: DatabasePorts + ?Sized,
    {
        self.check_fields()?;
        api.read_switch(ctx, zone, self.switch_id)
            .await
            .during("read switch")?;
        Ok(())
    }

    /// Creates the appliance, waits until it is up, and applies the engine
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns every error of [`DatabaseBuilder::validate`], the first failed
    /// remote call, and wait errors.
    pub async fn build<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: DatabasePorts + ?Sized,
    {
        self.validate(ctx, api, zone).await?;
        let request = DatabaseCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            plan: self.plan,
            database_type: self.database_type,
            switch_id: self.switch_id,
            ip_addresses: self.ip_address.into_iter().collect(),
            network_mask_len: self.network_mask_len,
            default_route: self.default_route,
            settings: self.settings.clone(),
        };
        let created = api
            .create_database(ctx, zone, &request)
            .await
            .during("create database")?;
        let id = created.id;
        debug!(database_id = %id, %zone, "database created");
        wait_until_ready(
            ctx,
            "database",
            id,
            move || api.read_database(ctx, zone, id),
            self.timing.wait,
        )
        .await?;
        wait_until_up(
            ctx,
            "database",
            id,
            move || api.read_database(ctx, zone, id),
            self.timing.wait,
        )
        .await?;
        self.apply_parameters(ctx, api, zone, id).await?;
        info!(database_id = %id, %zone, "database ready");
        Ok(BuildResult::with_id(id))
    }

    async fn apply_parameters<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
        id: ResourceId,
    ) -> Result<(), ProvisionError>
    where
        A: DatabasePorts + ?Sized,
    {
        if self.parameters.is_empty() {
            return Ok(());
        }
        api.set_database_parameters(ctx, zone, id, &self.parameters)
            .await
            .during("set database parameters")?;
        debug!(database_id = %id, count = self.parameters.len(), "parameters applied");
        Ok(())
    }

    /// Updates metadata and service settings of the existing appliance,
    /// applies them, and sets the engine parameters. An appliance found
    /// powered off is booted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing appliance is
    /// set or the parameters are unusable, the first failed remote call, and
    /// power errors from the boot.
    pub async fn update<A>(
        &self,
        ctx: &Context,
        api: &A,
        zone: &Zone,
    ) -> Result<BuildResult, ProvisionError>
    where
        A: DatabasePorts + ?Sized,
    {
        require_id("database", "id", self.id)?;
        self.check_fields()?;
        let current = api
            .read_database(ctx, zone, self.id)
            .await
            .during("read database")?;
        let was_up = current.instance_status.is_up();
        let request = DatabaseUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            settings: self.settings.clone(),
            settings_hash: current.settings_hash,
        };
        api.update_database(ctx, zone, self.id, &request)
            .await
            .during("update database")?;
        api.config_database(ctx, zone, self.id)
            .await
            .during("apply database settings")?;
        self.apply_parameters(ctx, api, zone, self.id).await?;
        if !was_up {
            PowerController::new(self.timing)
                .boot(ctx, &DatabasePower::new(api, zone, self.id))
                .await?;
            debug!(database_id = %self.id, "stopped database booted");
        }
        info!(database_id = %self.id, %zone, "database updated");
        Ok(BuildResult::with_id(self.id))
    }
}
