//! Provisioning orchestration for a zone-based IaaS cloud.
//!
//! `kumo` turns declarative descriptions of servers, disks and network
//! appliances into correctly ordered sequences of remote calls. Callers
//! implement the port traits in [`api`] for their transport; builders in
//! [`builder`] validate parameters against the remote, create resources,
//! wait for them to settle, and boot them through the [`power`] controller,
//! which retries while the remote reports a resource as still being created.

pub mod api;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod power;
pub mod provenance;
pub mod test_support;
pub mod types;
pub mod wait;

pub use builder::{
    BuildResult, ContainerRegistryBuilder, DatabaseBuilder, DiskBuilder, DiskSpec,
    LocalRouterBuilder, MobileGatewayBuilder, ServerBuilder, VpcRouterBuilder,
};
pub use config::{ConfigError, Timing, TimingConfig, load_timing};
pub use context::Context;
pub use error::{ProvisionError, RemoteError};
pub use power::{PowerController, PowerHandler, RetryPolicy};
pub use provenance::can_edit_disk;
pub use types::{ResourceId, Tag, Zone};
pub use wait::WaitOptions;
