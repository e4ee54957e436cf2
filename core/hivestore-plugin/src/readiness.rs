//! Schema readiness verification.
//!
//! Before the plugin accepts messages it polls the backend until the
//! required tables and UDTs exist. The poll is bounded: after
//! `schema_checks_count` failed probes the verifier reports
//! [`ReadinessState::Failed`] and the plugin terminates the process.
//!
//! Waiting and termination go through the [`Timer`] and [`Terminator`]
//! traits so tests can observe both without sleeping or exiting.

use crate::config::{PluginConfig, millis};
use async_trait::async_trait;
use hivestore_model::SchemaSet;
use hivestore_storage::StorageBackend;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Exit code used when schemas never appear.
pub const SCHEMA_UNAVAILABLE_EXIT_CODE: i32 = 1;

/// Lifecycle state of schema verification.
///
/// Moves from `Pending` to exactly one of `Ready` or `Failed` and never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReadinessState {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl ReadinessState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only `Pending` may move, and only to a terminal state.
    pub fn can_transition_to(self, next: ReadinessState) -> bool {
        !self.is_terminal() && next.is_terminal()
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// Suspends the verifier between probes.
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Timer backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Ends the process when readiness fails.
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Terminator that exits the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, code: i32) {
        error!(code, "Terminating process");
        std::process::exit(code);
    }
}

/// Result of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub state: ReadinessState,
    /// Number of probes issued.
    pub attempts: u32,
}

impl VerifyOutcome {
    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }
}

/// Bounded poll of the backend's schema-existence probe.
pub struct ReadinessVerifier<'a, B: ?Sized> {
    backend: &'a B,
    schemas: &'a SchemaSet,
    timer: &'a dyn Timer,
    max_attempts: u32,
    interval: Duration,
}

impl<'a, B: StorageBackend + ?Sized> ReadinessVerifier<'a, B> {
    pub fn new(
        backend: &'a B,
        schemas: &'a SchemaSet,
        config: &PluginConfig,
        timer: &'a dyn Timer,
    ) -> Self {
        Self {
            backend,
            schemas,
            timer,
            max_attempts: config.schema_checks_count,
            interval: config.schema_checks_interval,
        }
    }

    /// Probes until the schemas exist or the attempt budget is spent.
    ///
    /// A probe that errors counts as "not present". There is no wait after
    /// the final probe, and none at all when the interval is zero.
    pub async fn verify(&self) -> VerifyOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let present = match self.backend.check_schemas_exist(self.schemas).await {
                Ok(present) => present,
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "Schema probe failed");
                    false
                }
            };

            if present {
                info!(attempts, "Storage schemas present");
                return VerifyOutcome {
                    state: ReadinessState::Ready,
                    attempts,
                };
            }

            if attempts >= self.max_attempts {
                error!(attempts, "Storage schemas still missing, giving up");
                return VerifyOutcome {
                    state: ReadinessState::Failed,
                    attempts,
                };
            }

            debug!(
                attempt = attempts,
                max_attempts = self.max_attempts,
                interval_ms = millis(self.interval),
                "Storage schemas missing, retrying"
            );
            if !self.interval.is_zero() {
                self.timer.sleep(self.interval).await;
            }
        }
    }
}
