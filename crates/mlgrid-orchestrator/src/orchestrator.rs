//! Orchestrator — admission control and dispatch across the engine pool.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use mlgrid_core::{Endpoint, EngineState, RequestId};
use mlgrid_engine::{Engine, EngineResult};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::{RequestLedger, RequestRecord};

/// Owns the fixed engine list and the request ledger.
///
/// Booking holds the pool-wide mutex just long enough to pick and mark an
/// engine — no I/O inside. Dispatch and release hold only the per-engine
/// lock, so sessions on different engines run fully in parallel.
pub struct Orchestrator {
    engines: Vec<Arc<Engine>>,
    ledger: RequestLedger,
    /// Pool-wide critical section for the selection scan.
    booking: Mutex<()>,
}

impl Orchestrator {
    pub fn new(engines: Vec<Arc<Engine>>) -> Self {
        Self {
            engines,
            ledger: RequestLedger::new(),
            booking: Mutex::new(()),
        }
    }

    /// Read-only view of the pool, for diagnostics and status reporting.
    pub fn engines(&self) -> &[Arc<Engine>] {
        &self.engines
    }

    /// Live booked requests, for diagnostics.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.ledger.snapshot()
    }

    /// Launch every engine in configured order at startup.
    ///
    /// One engine failing to come up is not fatal to the rest; each engine
    /// independently ends up idle or off.
    pub async fn launch_engines(&self) {
        for engine in &self.engines {
            if let Err(error) = engine.launch_engine().await {
                error!(endpoint = %engine.endpoint(), %error, "engine failed to launch at startup");
            }
        }
    }

    /// Reserve the first idle engine for `action_name`.
    ///
    /// First match in configuration order wins; there is no load metric
    /// and no queue — an exhausted pool rejects immediately.
    pub async fn book_engine(&self, action_name: &str) -> OrchestratorResult<RequestId> {
        let _scan = self.booking.lock().await;

        let engine = self
            .engines
            .iter()
            .find(|engine| engine.state() == EngineState::Idle)
            .ok_or_else(|| {
                warn!(action = action_name, "no idle engine in pool, rejecting");
                OrchestratorError::NoAvailableEngine(action_name.to_string())
            })?;

        engine.mark_booked();
        let request_id = self.ledger.register(action_name, engine.endpoint().clone());
        info!(
            %request_id,
            endpoint = %engine.endpoint(),
            action = action_name,
            "engine booked"
        );
        Ok(request_id)
    }

    /// One-shot dispatch: book, run, and release regardless of outcome.
    ///
    /// Action errors propagate to the caller, but only after the engine is
    /// back in the pool.
    pub async fn run_on_engine<T, F, Fut>(
        &self,
        action: F,
        action_name: &str,
    ) -> OrchestratorResult<T>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let request_id = self.book_engine(action_name).await?;
        let result = self.dispatch(request_id, action, action_name).await;

        // Unconditional release; a failure here must not mask the action's
        // own result.
        if let Err(release_error) = self.release_engine(request_id, action_name).await {
            error!(%request_id, %release_error, "failed to release engine after one-shot dispatch");
        }
        result
    }

    /// Run one step of a session on its booked engine.
    ///
    /// The engine returns to `Booked` afterwards, success or failure — the
    /// caller decides when the session ends.
    pub async fn run_on_booked_engine<T, F, Fut>(
        &self,
        request_id: RequestId,
        action: F,
        action_name: &str,
    ) -> OrchestratorResult<T>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        self.dispatch(request_id, action, action_name).await
    }

    /// End a session: remove the ledger record and idle the engine.
    pub async fn release_engine(
        &self,
        request_id: RequestId,
        action_name: &str,
    ) -> OrchestratorResult<()> {
        let engine = self.resolve(request_id, action_name)?;
        let _dispatch = engine.lock_for_dispatch().await;

        engine.mark_idle();
        self.ledger.remove(request_id);
        info!(
            %request_id,
            endpoint = %engine.endpoint(),
            action = action_name,
            "engine released to idle"
        );
        Ok(())
    }

    /// Alias of [`release_engine`](Self::release_engine) for callers
    /// phrasing the end of a request as completion.
    pub async fn complete_request(
        &self,
        request_id: RequestId,
        action_name: &str,
    ) -> OrchestratorResult<()> {
        self.release_engine(request_id, action_name).await
    }

    async fn dispatch<T, F, Fut>(
        &self,
        request_id: RequestId,
        action: F,
        action_name: &str,
    ) -> OrchestratorResult<T>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let engine = self.resolve(request_id, action_name)?;
        let _dispatch = engine.lock_for_dispatch().await;

        info!(
            %request_id,
            endpoint = %engine.endpoint(),
            action = action_name,
            "engine computing"
        );
        engine.mark_computing();
        let result = action(Arc::clone(&engine)).await;
        engine.mark_booked();

        match result {
            Ok(value) => Ok(value),
            Err(engine_error) => {
                error!(
                    %request_id,
                    endpoint = %engine.endpoint(),
                    action = action_name,
                    error = %engine_error,
                    "action failed on engine"
                );
                Err(engine_error.into())
            }
        }
    }

    /// Ledger record → engine, surfacing unknown ids and ledger
    /// inconsistencies distinctly.
    fn resolve(&self, request_id: RequestId, action_name: &str) -> OrchestratorResult<Arc<Engine>> {
        let record = self.ledger.get(request_id).ok_or_else(|| {
            warn!(%request_id, action = action_name, "unknown request id");
            OrchestratorError::NoBookedEngine {
                request_id,
                action: action_name.to_string(),
            }
        })?;

        self.engine_by_endpoint(&record.endpoint)
            .cloned()
            .ok_or_else(|| {
                error!(
                    endpoint = %record.endpoint,
                    action = action_name,
                    "ledger names an endpoint no engine carries, not expected - check logs"
                );
                OrchestratorError::InconsistentLedger {
                    endpoint: record.endpoint.clone(),
                    action: action_name.to_string(),
                }
            })
    }

    fn engine_by_endpoint(&self, endpoint: &Endpoint) -> Option<&Arc<Engine>> {
        self.engines
            .iter()
            .find(|engine| engine.endpoint() == endpoint)
    }
}
