//! Boot and shutdown with retry on "still creating" conflicts.
//!
//! A freshly created resource rejects power requests with HTTP 409 and the
//! `still_creating` code until the remote has finished provisioning it. The
//! [`PowerController`] retries exactly that conflict within a bounded budget,
//! treats every other error as fatal, and then waits for the target run
//! status, re-issuing the request when the resource keeps reporting the
//! opposite status.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::api::{DatabaseApi, MobileGatewayApi, RemoteFuture, ServerApi, VpcRouterApi};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteError};
use crate::model::RunStatus;
use crate::types::{ResourceId, Zone};
use crate::wait::{WaitOptions, wait_for_state};

/// Default pause between attempts rejected as "still creating".
pub const DEFAULT_INITIAL_RETRY_SPAN: Duration = Duration::from_secs(20);

/// Default interval after which an unanswered boot is re-issued.
pub const DEFAULT_BOOT_RETRY_SPAN: Duration = Duration::from_secs(20);

/// Default interval after which an unanswered shutdown is re-issued.
pub const DEFAULT_SHUTDOWN_RETRY_SPAN: Duration = Duration::from_secs(20);

/// Default budget for getting the first request accepted.
pub const DEFAULT_INITIAL_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing of power request retries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Pause between attempts rejected as "still creating".
    pub initial_retry_span: Duration,
    /// Interval after which a boot is re-issued while the resource is down.
    pub boot_retry_span: Duration,
    /// Interval after which a shutdown is re-issued while the resource is up.
    pub shutdown_retry_span: Duration,
    /// Budget for the first request, measured from the first attempt.
    pub initial_request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_retry_span: DEFAULT_INITIAL_RETRY_SPAN,
            boot_retry_span: DEFAULT_BOOT_RETRY_SPAN,
            shutdown_retry_span: DEFAULT_SHUTDOWN_RETRY_SPAN,
            initial_request_timeout: DEFAULT_INITIAL_REQUEST_TIMEOUT,
        }
    }
}

/// Power capability of a single bootable resource.
pub trait PowerHandler: Send + Sync {
    /// Requests a boot.
    fn boot<'a>(&'a self, ctx: &'a Context) -> RemoteFuture<'a, ()>;

    /// Requests a shutdown; `force` is passed through untouched.
    fn shutdown<'a>(&'a self, ctx: &'a Context, force: bool) -> RemoteFuture<'a, ()>;

    /// Reads the current run status.
    fn current_status<'a>(&'a self, ctx: &'a Context) -> RemoteFuture<'a, RunStatus>;

    /// Names the target in logs and errors, for example `server 42`.
    fn describe(&self) -> String;
}

#[derive(Clone, Copy, Debug)]
enum PowerOp {
    Boot,
    Shutdown { force: bool },
}

impl PowerOp {
    const fn verb(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Shutdown { .. } => "shutdown",
        }
    }

    const fn target(self) -> RunStatus {
        match self {
            Self::Boot => RunStatus::Up,
            Self::Shutdown { .. } => RunStatus::Down,
        }
    }

    const fn is_opposite(self, status: RunStatus) -> bool {
        match self {
            Self::Boot => status.is_down(),
            Self::Shutdown { .. } => status.is_up(),
        }
    }

    const fn reissue_span(self, policy: &RetryPolicy) -> Duration {
        match self {
            Self::Boot => policy.boot_retry_span,
            Self::Shutdown { .. } => policy.shutdown_retry_span,
        }
    }

    async fn issue<H>(self, ctx: &Context, handler: &H) -> Result<(), RemoteError>
    where
        H: PowerHandler + ?Sized,
    {
        match self {
            Self::Boot => handler.boot(ctx).await,
            Self::Shutdown { force } => handler.shutdown(ctx, force).await,
        }
    }
}

/// Issues power requests and confirms the resulting run status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PowerController {
    policy: RetryPolicy,
    wait: WaitOptions,
    no_wait: bool,
}

impl PowerController {
    /// Builds a controller from resolved timing.
    #[must_use]
    pub const fn new(timing: Timing) -> Self {
        Self {
            policy: timing.power,
            wait: timing.wait,
            no_wait: false,
        }
    }

    /// Returns once the request is accepted instead of waiting for the
    /// target run status.
    #[must_use]
    pub const fn with_no_wait(mut self, no_wait: bool) -> Self {
        self.no_wait = no_wait;
        self
    }

    /// Boots the resource behind `handler` and waits until it is up.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Timeout`] when the request is still rejected
    /// as "still creating" after the initial budget or the resource does not
    /// come up in time, [`ProvisionError::Remote`] for any other request
    /// error, and the context errors.
    pub async fn boot<H>(&self, ctx: &Context, handler: &H) -> Result<(), ProvisionError>
    where
        H: PowerHandler + ?Sized,
    {
        self.run(ctx, handler, PowerOp::Boot).await
    }

    /// Shuts the resource behind `handler` down and waits until it is down.
    ///
    /// # Errors
    ///
    /// Same as [`PowerController::boot`].
    pub async fn shutdown<H>(
        &self,
        ctx: &Context,
        handler: &H,
        force: bool,
    ) -> Result<(), ProvisionError>
    where
        H: PowerHandler + ?Sized,
    {
        self.run(ctx, handler, PowerOp::Shutdown { force }).await
    }

    async fn run<H>(&self, ctx: &Context, handler: &H, op: PowerOp) -> Result<(), ProvisionError>
    where
        H: PowerHandler + ?Sized,
    {
        let action = format!("{} {}", op.verb(), handler.describe());
        self.request_until_accepted(ctx, handler, op, &action).await?;
        if self.no_wait {
            info!(action = %action, "power request accepted; not waiting");
            return Ok(());
        }
        self.confirm(ctx, handler, op, &action).await?;
        info!(action = %action, "power state confirmed");
        Ok(())
    }

    async fn request_until_accepted<H>(
        &self,
        ctx: &Context,
        handler: &H,
        op: PowerOp,
        action: &str,
    ) -> Result<(), ProvisionError>
    where
        H: PowerHandler + ?Sized,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            ctx.check(action)?;
            attempts = attempts.saturating_add(1);
            match op.issue(ctx, handler).await {
                Ok(()) => {
                    debug!(action, attempts, "power request accepted");
                    return Ok(());
                }
                Err(err) if err.is_still_creating() => {
                    debug!(action, attempts, "resource still creating; retrying");
                    ctx.sleep(self.policy.initial_retry_span, action).await?;
                    if started.elapsed() >= self.policy.initial_request_timeout {
                        return Err(ProvisionError::Timeout {
                            action: action.to_owned(),
                        });
                    }
                }
                Err(err) => return Err(ProvisionError::remote(action, err)),
            }
        }
    }

    async fn confirm<H>(
        &self,
        ctx: &Context,
        handler: &H,
        op: PowerOp,
        action: &str,
    ) -> Result<(), ProvisionError>
    where
        H: PowerHandler + ?Sized,
    {
        let span = op.reissue_span(&self.policy);
        let last_request_at = Mutex::new(Instant::now());
        let last_request = &last_request_at;
        let probe = move || async move {
            let status = handler.current_status(ctx).await?;
            let due = {
                let last = last_request.lock().unwrap_or_else(PoisonError::into_inner);
                last.elapsed() >= span
            };
            if op.is_opposite(status) && due {
                match op.issue(ctx, handler).await {
                    Ok(()) => debug!(action, "power request re-issued"),
                    Err(err) if err.is_conflict() => debug!(action, "re-issue rejected as busy"),
                    Err(err) => return Err(err),
                }
                *last_request.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
            }
            Ok(status)
        };
        let target = op.target();
        let is_target = |status: &RunStatus| *status == target;
        wait_for_state(ctx, action, probe, is_target, self.wait).await?;
        Ok(())
    }
}

macro_rules! power_adapter {
    (
        $(#[$meta:meta])*
        $name:ident, $api:ident, $kind:literal,
        boot: $boot:ident, shutdown: $shutdown:ident, read: $read:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<'a, A: ?Sized> {
            api: &'a A,
            zone: &'a Zone,
            id: ResourceId,
        }

        impl<'a, A: ?Sized> $name<'a, A> {
            /// Targets resource `id` in `zone`.
            #[must_use]
            pub const fn new(api: &'a A, zone: &'a Zone, id: ResourceId) -> Self {
                Self { api, zone, id }
            }
        }

        impl<A> PowerHandler for $name<'_, A>
        where
            A: $api + ?Sized,
        {
            fn boot<'b>(&'b self, ctx: &'b Context) -> RemoteFuture<'b, ()> {
                self.api.$boot(ctx, self.zone, self.id)
            }

            fn shutdown<'b>(&'b self, ctx: &'b Context, force: bool) -> RemoteFuture<'b, ()> {
                self.api.$shutdown(ctx, self.zone, self.id, force)
            }

            fn current_status<'b>(&'b self, ctx: &'b Context) -> RemoteFuture<'b, RunStatus> {
                Box::pin(async move {
                    let record = self.api.$read(ctx, self.zone, self.id).await?;
                    Ok(record.instance_status)
                })
            }

            fn describe(&self) -> String {
                format!("{} {}", $kind, self.id)
            }
        }
    };
}

power_adapter!(
    /// Power handler for a server.
    ServerPower, ServerApi, "server",
    boot: boot_server, shutdown: shutdown_server, read: read_server
);
power_adapter!(
    /// Power handler for a database appliance.
    DatabasePower, DatabaseApi, "database",
    boot: boot_database, shutdown: shutdown_database, read: read_database
);
power_adapter!(
    /// Power handler for a VPC router.
    VpcRouterPower, VpcRouterApi, "VPC router",
    boot: boot_vpc_router, shutdown: shutdown_vpc_router, read: read_vpc_router
);
power_adapter!(
    /// Power handler for a mobile gateway.
    MobileGatewayPower, MobileGatewayApi, "mobile gateway",
    boot: boot_mobile_gateway, shutdown: shutdown_mobile_gateway, read: read_mobile_gateway
);
