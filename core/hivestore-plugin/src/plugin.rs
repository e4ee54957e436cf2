use crate::config::{PluginConfig, millis};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{PluginError, PluginResult};
use crate::provision::provision;
use crate::readiness::{
    ProcessTerminator, ReadinessState, ReadinessVerifier, SCHEMA_UNAVAILABLE_EXIT_CODE,
    Terminator, Timer, TokioTimer,
};
use hivestore_model::{SchemaSet, TableAssignment, TableGroups};
use hivestore_storage::StorageBackend;
use hivestore_types::PluginMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{error, info, warn};

/// The storage plugin.
///
/// Created in [`ReadinessState::Pending`]. [`after_start`](Self::after_start)
/// waits for the schemas, provisions the backend and moves the plugin to
/// `Ready`; from then on [`handle_message`](Self::handle_message) stores
/// incoming messages. Messages arriving earlier are rejected with
/// [`PluginError::NotReady`].
pub struct StoragePlugin<B: ?Sized> {
    backend: Arc<B>,
    schemas: SchemaSet,
    groups: TableGroups,
    config: PluginConfig,
    timer: Arc<dyn Timer>,
    terminator: Arc<dyn Terminator>,
    started: AtomicBool,
    state: RwLock<ReadinessState>,
    dispatcher: OnceLock<Dispatcher<B>>,
}

impl<B: StorageBackend + ?Sized> StoragePlugin<B> {
    /// Creates a plugin using the tokio timer and the process terminator.
    pub fn new(
        backend: Arc<B>,
        schemas: SchemaSet,
        groups: TableGroups,
        config: PluginConfig,
    ) -> PluginResult<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            schemas,
            groups,
            config,
            timer: Arc::new(TokioTimer),
            terminator: Arc::new(ProcessTerminator),
            started: AtomicBool::new(false),
            state: RwLock::new(ReadinessState::Pending),
            dispatcher: OnceLock::new(),
        })
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn state(&self) -> ReadinessState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// The table routing, once provisioning has completed.
    pub fn assignment(&self) -> Option<&TableAssignment> {
        self.dispatcher.get().map(Dispatcher::assignment)
    }

    /// Startup hook: verify schemas, provision, become ready.
    ///
    /// If the schemas never appear the terminator is invoked with
    /// [`SCHEMA_UNAVAILABLE_EXIT_CODE`]. A terminator that returns leaves the
    /// plugin `Failed` and this method returns
    /// [`PluginError::SchemaUnavailable`]. A provisioning failure also leaves
    /// the plugin `Failed` and is returned to the caller.
    pub async fn after_start(&self) -> PluginResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PluginError::AlreadyStarted(self.state()));
        }

        info!(
            max_attempts = self.config.schema_checks_count,
            interval_ms = millis(self.config.schema_checks_interval),
            "Verifying storage schemas"
        );
        let outcome = ReadinessVerifier::new(
            self.backend.as_ref(),
            &self.schemas,
            &self.config,
            self.timer.as_ref(),
        )
        .verify()
        .await;

        if !outcome.is_ready() {
            self.transition(ReadinessState::Failed);
            error!(
                attempts = outcome.attempts,
                "Storage schemas unavailable, run schema creation before starting"
            );
            self.terminator.terminate(SCHEMA_UNAVAILABLE_EXIT_CODE);
            return Err(PluginError::SchemaUnavailable {
                attempts: outcome.attempts,
            });
        }

        let assignment = match provision(self.backend.as_ref(), &self.schemas, &self.groups).await {
            Ok(assignment) => assignment,
            Err(e) => {
                self.transition(ReadinessState::Failed);
                error!(error = %e, "Provisioning failed");
                return Err(e);
            }
        };

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.backend),
            Arc::new(assignment),
            &self.config,
        );
        if self.dispatcher.set(dispatcher).is_err() {
            warn!("Dispatcher already installed");
        }
        self.transition(ReadinessState::Ready);
        info!(
            command_updates_storing = self.config.command_updates_storing,
            "Storage plugin ready"
        );
        Ok(())
    }

    /// Stores one incoming message.
    pub async fn handle_message(&self, message: &PluginMessage) -> PluginResult<DispatchOutcome> {
        let Some(dispatcher) = self.dispatcher.get() else {
            return Err(PluginError::NotReady(self.state()));
        };
        dispatcher.dispatch_raw(message).await
    }

    fn transition(&self, next: ReadinessState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.can_transition_to(next) {
            *state = next;
        } else {
            warn!(from = %*state, to = %next, "Ignoring readiness transition");
        }
    }
}
