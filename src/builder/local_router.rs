//! Local router builder. Local routers are global resources that join a
//! zonal switch to other routers.

use tracing::{debug, info};

use super::{BuildResult, LocalRouterPorts, first_duplicate, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    LocalRouterCreateRequest, LocalRouterInterface, LocalRouterPeer, LocalRouterSettings,
    LocalRouterStaticRoute, LocalRouterSwitch,
};
use crate::types::{ResourceId, Tag};
use crate::wait::wait_until_ready;

/// Real addresses a local router interface carries.
const INTERFACE_ADDRESSES: usize = 2;

/// Declarative description of a local router.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LocalRouterBuilder {
    /// Existing router targeted by [`LocalRouterBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Switch the router attaches to.
    pub switch: LocalRouterSwitch,
    /// Addressing on the switch.
    pub interface: Option<LocalRouterInterface>,
    /// Routers to peer with.
    pub peers: Vec<LocalRouterPeer>,
    /// Static routes.
    pub static_routes: Vec<LocalRouterStaticRoute>,
    /// Waits.
    pub timing: Timing,
}

impl LocalRouterBuilder {
    fn settings(&self) -> LocalRouterSettings {
        LocalRouterSettings {
            switch: self.switch.clone(),
            interface: self.interface.clone(),
            peers: self.peers.clone(),
            static_routes: self.static_routes.clone(),
        }
    }

    fn check_fields(&self) -> Result<(), ProvisionError> {
        require_non_blank("local router", "name", &self.name)?;
        require_non_blank("local router", "switch code", &self.switch.code)?;
        let Some(interface) = &self.interface else {
            return Err(ProvisionError::validation(
                "local router",
                "an interface is required",
            ));
        };
        if interface.ip_addresses.len() != INTERFACE_ADDRESSES {
            return Err(ProvisionError::validation(
                "local router",
                format!(
                    "the interface needs {INTERFACE_ADDRESSES} IP addresses, got {}",
                    interface.ip_addresses.len()
                ),
            ));
        }
        if !(1..=32).contains(&interface.network_mask_len) {
            return Err(ProvisionError::validation(
                "local router",
                format!("invalid network mask length {}", interface.network_mask_len),
            ));
        }
        for peer in &self.peers {
            require_id("local router", "peer", peer.peer_id)?;
            if peer.peer_id == self.id {
                return Err(ProvisionError::validation(
                    "local router",
                    "a router cannot peer with itself",
                ));
            }
        }
        if let Some(peer_id) = first_duplicate(self.peers.iter().map(|peer| peer.peer_id)) {
            return Err(ProvisionError::validation(
                "local router",
                format!("peer {peer_id} is listed twice"),
            ));
        }
        Ok(())
    }

    /// Checks the parameters against the remote without changing anything.
    ///
    /// Every peer must exist and accept the configured secret key.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for unusable parameters or a
    /// wrong peer key, and [`ProvisionError::NotFound`] for a missing peer.
    pub async fn validate<A>(&self, ctx: &Context, api: &A) -> Result<(), ProvisionError>
    where
        A: LocalRouterPorts + ?Sized,
    {
        self.check_fields()?;
        for peer in &self.peers {
            let remote = api
                .read_local_router(ctx, peer.peer_id)
                .await
                .during("read peer local router")?;
            if !remote.secret_keys.contains(&peer.secret_key) {
                return Err(ProvisionError::validation(
                    "local router",
                    format!("peer {} does not accept the given secret key", peer.peer_id),
                ));
            }
        }
        Ok(())
    }

    /// Creates the router, waits until it is available, and applies its
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns every error of [`LocalRouterBuilder::validate`], the first
    /// failed remote call, and wait errors.
    pub async fn build<A>(&self, ctx: &Context, api: &A) -> Result<BuildResult, ProvisionError>
    where
        A: LocalRouterPorts + ?Sized,
    {
        self.validate(ctx, api).await?;
        let request = LocalRouterCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
        };
        let created = api
            .create_local_router(ctx, &request)
            .await
            .during("create local router")?;
        let id = created.id;
        debug!(local_router_id = %id, "local router created");
        let ready = wait_until_ready(
            ctx,
            "local router",
            id,
            move || api.read_local_router(ctx, id),
            self.timing.wait,
        )
        .await?;
        api.update_local_router_settings(ctx, id, &self.settings(), &ready.settings_hash)
            .await
            .during("update local router settings")?;
        info!(local_router_id = %id, peers = self.peers.len(), "local router ready");
        Ok(BuildResult::with_id(id))
    }

    /// Replaces the settings of the existing router.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing router is set
    /// or the parameters are unusable, and the first failed remote call.
    pub async fn update<A>(&self, ctx: &Context, api: &A) -> Result<BuildResult, ProvisionError>
    where
        A: LocalRouterPorts + ?Sized,
    {
        require_id("local router", "id", self.id)?;
        self.validate(ctx, api).await?;
        let current = api
            .read_local_router(ctx, self.id)
            .await
            .during("read local router")?;
        api.update_local_router_settings(ctx, self.id, &self.settings(), &current.settings_hash)
            .await
            .during("update local router settings")?;
        info!(local_router_id = %self.id, "local router updated");
        Ok(BuildResult::with_id(self.id))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::model::{Availability, LocalRouter};
    use crate::test_support::FakeCloud;

    const PEER: ResourceId = ResourceId::new(900);

    #[fixture]
    fn cloud() -> FakeCloud {
        let cloud = FakeCloud::new();
        cloud.insert_local_router(LocalRouter {
            id: PEER,
            name: String::from("peer"),
            availability: Availability::Available,
            secret_keys: vec![String::from("peer-secret")],
            ..LocalRouter::default()
        });
        cloud
    }

    fn router() -> LocalRouterBuilder {
        LocalRouterBuilder {
            name: String::from("backbone"),
            switch: LocalRouterSwitch {
                code: String::from("112900000001"),
                category: String::from("cloud"),
                zone_id: String::from("is1b"),
            },
            interface: Some(LocalRouterInterface {
                virtual_ip_address: Ipv4Addr::new(192, 168, 0, 1),
                ip_addresses: vec![Ipv4Addr::new(192, 168, 0, 2), Ipv4Addr::new(192, 168, 0, 3)],
                network_mask_len: 24,
                vrid: 101,
            }),
            peers: vec![LocalRouterPeer {
                peer_id: PEER,
                secret_key: String::from("peer-secret"),
                enabled: true,
            }],
            static_routes: vec![LocalRouterStaticRoute {
                prefix: String::from("10.0.0.0/24"),
                next_hop: String::from("192.168.0.254"),
            }],
            timing: Timing::uniform(Duration::from_millis(10), Duration::from_secs(5)),
            ..LocalRouterBuilder::default()
        }
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn build_applies_settings_once_ready(cloud: FakeCloud) {
        let builder = router();
        let result = builder
            .build(&Context::new(), &cloud)
            .await
            .expect("build local router");

        let record = cloud.local_router(result.id).expect("router exists");
        assert_eq!(record.availability, Availability::Available);
        assert_eq!(record.settings, builder.settings());
        assert_eq!(
            cloud.mutating_calls(),
            vec!["create_local_router", "update_local_router_settings"]
        );
    }

    #[rstest]
    #[case::blank_switch_code(LocalRouterBuilder {
        switch: LocalRouterSwitch::default(),
        ..router()
    })]
    #[case::missing_interface(LocalRouterBuilder { interface: None, ..router() })]
    #[case::single_address(LocalRouterBuilder {
        interface: router().interface.map(|interface| LocalRouterInterface {
            ip_addresses: vec![Ipv4Addr::new(192, 168, 0, 2)],
            ..interface
        }),
        ..router()
    })]
    #[case::wrong_peer_secret(LocalRouterBuilder {
        peers: vec![LocalRouterPeer {
            peer_id: PEER,
            secret_key: String::from("guess"),
            enabled: true,
        }],
        ..router()
    })]
    #[tokio::test]
    async fn invalid_routers_are_rejected(cloud: FakeCloud, #[case] builder: LocalRouterBuilder) {
        let err = builder
            .build(&Context::new(), &cloud)
            .await
            .expect_err("invalid local router");
        assert!(matches!(err, ProvisionError::Validation { .. }));
        assert!(cloud.mutating_calls().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn missing_peer_is_not_found(cloud: FakeCloud) {
        let builder = LocalRouterBuilder {
            peers: vec![LocalRouterPeer {
                peer_id: ResourceId::new(901),
                ..LocalRouterPeer::default()
            }],
            ..router()
        };
        let err = builder
            .validate(&Context::new(), &cloud)
            .await
            .expect_err("missing peer");
        assert!(err.is_not_found());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn update_replaces_routes(cloud: FakeCloud) {
        let ctx = Context::new();
        let created = router().build(&ctx, &cloud).await.expect("build router");
        let builder = LocalRouterBuilder {
            id: created.id,
            static_routes: Vec::new(),
            ..router()
        };
        builder.update(&ctx, &cloud).await.expect("update router");

        let record = cloud.local_router(created.id).expect("router exists");
        assert!(record.settings.static_routes.is_empty());
        assert_eq!(cloud.call_count("update_local_router_settings"), 2);
    }
}
