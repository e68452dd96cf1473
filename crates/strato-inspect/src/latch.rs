// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic poll-until-done primitive.
//!
//! [`wait_for`] samples a [`Predicate`] at a fixed cadence until it reports
//! completion, the configured budget runs out, or the wait is cancelled. It
//! knows nothing about deployments; the inspectors and the shell's
//! visibility pre-lookup both drive it.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_ERROR_MESSAGE: &str = "Operation timed out";

/// A process whose completion the latch samples.
#[async_trait]
pub trait Predicate: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Report whether the monitored process has completed.
    async fn is_done(&mut self) -> Result<bool, Self::Error>;
}

/// Rejected latch configuration.
#[derive(Debug, Error)]
#[error("polling interval must be greater than zero")]
pub struct InvalidPollingInterval;

/// Immutable latch configuration, constructed once per wait.
#[derive(Debug, Clone)]
pub struct LatchConfig {
    timeout: Duration,
    polling_interval: Duration,
    timeout_error_message: String,
    verbose: bool,
    retry_on_error: bool,
}

impl LatchConfig {
    /// Create a configuration with the given budget and polling cadence.
    ///
    /// A zero timeout is allowed (the predicate still gets evaluated once
    /// before the wait fails); a zero polling interval is rejected.
    pub fn new(
        timeout: Duration,
        polling_interval: Duration,
    ) -> Result<Self, InvalidPollingInterval> {
        if polling_interval.is_zero() {
            return Err(InvalidPollingInterval);
        }
        Ok(Self {
            timeout,
            polling_interval,
            timeout_error_message: DEFAULT_TIMEOUT_ERROR_MESSAGE.to_string(),
            verbose: false,
            retry_on_error: false,
        })
    }

    /// Set the message carried by a timed-out wait.
    pub fn with_timeout_error_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_error_message = message.into();
        self
    }

    /// Enable progress logging between checks.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Keep polling through predicate failures instead of aborting.
    ///
    /// Reserved for the pre-lookup phase right after a deployment request,
    /// where the gateway may transiently answer errors while the deployment
    /// is still being registered. Off by default; the main lifecycle polls
    /// must fail fast.
    pub fn with_retry_on_error(mut self, retry_on_error: bool) -> Self {
        self.retry_on_error = retry_on_error;
        self
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }
}

/// Why a wait did not complete. Completion is `Ok(())`.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The configured budget elapsed before the predicate completed.
    /// Carries the configured timeout message.
    #[error("{0}")]
    Timeout(String),

    /// The wait was cancelled from the outside.
    #[error("wait cancelled")]
    Cancelled,

    /// The predicate itself failed.
    #[error(transparent)]
    Failed(E),
}

/// Wait until `predicate` reports completion.
///
/// The predicate is evaluated at least once, even with a zero budget. The
/// deadline is only checked between evaluations; an in-flight evaluation is
/// never interrupted by the timeout. Cancelling `cancel` aborts the sleep
/// between polls and surfaces as [`WaitError::Cancelled`].
pub async fn wait_for<P>(
    config: &LatchConfig,
    cancel: &CancellationToken,
    predicate: &mut P,
) -> Result<(), WaitError<P::Error>>
where
    P: Predicate,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        match predicate.is_done().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) if config.retry_on_error => {
                warn!(error = %err, "condition check failed, retrying");
            }
            Err(err) => return Err(WaitError::Failed(err)),
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout(config.timeout_error_message.clone()));
        }

        if config.verbose {
            debug!(
                seconds = config.polling_interval.as_secs_f64(),
                "next condition check"
            );
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = tokio::time::sleep(config.polling_interval) => {}
        }
    }
}
