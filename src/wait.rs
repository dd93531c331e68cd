//! Polling waiters that block until a remote resource reaches a target state.
//!
//! Every loop polls at a fixed interval, stops at the first matching state,
//! and gives up once its own budget or the caller's context runs out.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::context::Context;
use crate::error::{ProvisionError, RemoteError};
use crate::model::{Availability, Lifecycle, RunStatus};
use crate::types::ResourceId;

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default budget of a single wait loop.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Poll interval and overall budget of a wait loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitOptions {
    /// Fixed delay between two polls.
    pub poll_interval: Duration,
    /// Time after which the loop gives up.
    pub timeout: Duration,
}

impl WaitOptions {
    /// Builds options from an interval and a budget.
    #[must_use]
    pub const fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT)
    }
}

/// Polls `probe` until `is_target` accepts the observed state.
///
/// A probe error, including a read miss, ends the wait immediately. The last
/// observed state is discarded when the wait fails.
///
/// # Errors
///
/// Returns [`ProvisionError::Timeout`] once `opts.timeout` has elapsed,
/// [`ProvisionError::Cancelled`] or [`ProvisionError::DeadlineExceeded`] when
/// the context ends first, and the translated probe error otherwise.
pub async fn wait_for_state<S, P, F, T>(
    ctx: &Context,
    action: &str,
    mut probe: P,
    is_target: T,
    opts: WaitOptions,
) -> Result<S, ProvisionError>
where
    P: FnMut() -> F,
    F: Future<Output = Result<S, RemoteError>>,
    T: Fn(&S) -> bool,
{
    let deadline = Instant::now() + opts.timeout;
    let mut polls: u32 = 0;
    loop {
        ctx.check(action)?;
        polls = polls.saturating_add(1);
        let state = probe()
            .await
            .map_err(|err| ProvisionError::remote(action, err))?;
        if is_target(&state) {
            debug!(action, polls, "target state reached");
            return Ok(state);
        }
        if Instant::now() >= deadline {
            debug!(action, polls, "wait budget exhausted");
            return Err(ProvisionError::Timeout {
                action: action.to_owned(),
            });
        }
        ctx.sleep(opts.poll_interval, action).await?;
    }
}

/// Polls `probe` until it reports a read miss.
///
/// # Errors
///
/// Returns [`ProvisionError::Timeout`] when the resource is still readable
/// after `opts.timeout`, the context errors, and any probe error other than a
/// read miss.
pub async fn wait_until_deleted<S, P, F>(
    ctx: &Context,
    action: &str,
    mut probe: P,
    opts: WaitOptions,
) -> Result<(), ProvisionError>
where
    P: FnMut() -> F,
    F: Future<Output = Result<S, RemoteError>>,
{
    let deadline = Instant::now() + opts.timeout;
    loop {
        ctx.check(action)?;
        match probe().await {
            Err(err) if err.is_not_found() => {
                debug!(action, "resource gone");
                return Ok(());
            }
            Err(err) => return Err(ProvisionError::remote(action, err)),
            Ok(_) => {}
        }
        if Instant::now() >= deadline {
            return Err(ProvisionError::Timeout {
                action: action.to_owned(),
            });
        }
        ctx.sleep(opts.poll_interval, action).await?;
    }
}

/// Waits until `resource` `id` leaves its transitional availability.
///
/// # Errors
///
/// Returns [`ProvisionError::InvalidState`] when the resource settles in
/// [`Availability::Failed`], plus every error of [`wait_for_state`].
pub async fn wait_until_ready<R, P, F>(
    ctx: &Context,
    resource: &str,
    id: ResourceId,
    probe: P,
    opts: WaitOptions,
) -> Result<R, ProvisionError>
where
    R: Lifecycle,
    P: FnMut() -> F,
    F: Future<Output = Result<R, RemoteError>>,
{
    let action = format!("{resource} {id} to become available");
    let record = wait_for_state(
        ctx,
        &action,
        probe,
        |record: &R| !record.availability().is_transitional(),
        opts,
    )
    .await?;
    if record.availability() == Availability::Failed {
        return Err(ProvisionError::invalid_state(
            resource,
            id,
            "remote reported a failed creation",
        ));
    }
    Ok(record)
}

/// Waits until `resource` `id` reports [`RunStatus::Up`].
///
/// # Errors
///
/// Returns every error of [`wait_for_state`].
pub async fn wait_until_up<R, P, F>(
    ctx: &Context,
    resource: &str,
    id: ResourceId,
    probe: P,
    opts: WaitOptions,
) -> Result<R, ProvisionError>
where
    R: Lifecycle,
    P: FnMut() -> F,
    F: Future<Output = Result<R, RemoteError>>,
{
    wait_for_run_status(ctx, resource, id, probe, RunStatus::Up, opts).await
}

/// Waits until `resource` `id` reports [`RunStatus::Down`].
///
/// # Errors
///
/// Returns every error of [`wait_for_state`].
pub async fn wait_until_down<R, P, F>(
    ctx: &Context,
    resource: &str,
    id: ResourceId,
    probe: P,
    opts: WaitOptions,
) -> Result<R, ProvisionError>
where
    R: Lifecycle,
    P: FnMut() -> F,
    F: Future<Output = Result<R, RemoteError>>,
{
    wait_for_run_status(ctx, resource, id, probe, RunStatus::Down, opts).await
}

async fn wait_for_run_status<R, P, F>(
    ctx: &Context,
    resource: &str,
    id: ResourceId,
    probe: P,
    target: RunStatus,
    opts: WaitOptions,
) -> Result<R, ProvisionError>
where
    R: Lifecycle,
    P: FnMut() -> F,
    F: Future<Output = Result<R, RemoteError>>,
{
    let action = format!("{resource} {id} to reach {target:?}");
    wait_for_state(
        ctx,
        &action,
        probe,
        |record: &R| record.run_status() == Some(target),
        opts,
    )
    .await
}
