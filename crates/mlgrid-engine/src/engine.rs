//! Engine — a stateful compute endpoint backed by a supervised process.
//!
//! The engine owns its relaunch-on-crash policy and nothing else about
//! scheduling: `Booked`/`Computing`/`Idle` transitions during dispatch are
//! the orchestrator's responsibility, so multi-step sessions can decide
//! whether a finished call returns the engine to `Booked` or `Idle`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::sync::MutexGuard as AsyncMutexGuard;
use tracing::{error, info, warn};

use mlgrid_core::model::{
    ClassifierDataRequest, ClassifierDataResponse, ClassifierRequest, ClassifierStartCommand,
    ClassifierType, TimeSeries, TimeSeriesAnalysisRequest, timeseries,
};
use mlgrid_core::{Endpoint, EngineState};

use crate::client::EngineClient;
use crate::error::{EngineError, EngineResult};
use crate::launcher::ProcessLauncher;
use crate::supervisor::{ExitCallback, ProcessSupervisor};

/// One pooled compute engine.
///
/// Created once at startup per configured endpoint and never destroyed —
/// only cycled through states. Always held behind an `Arc`: the crash
/// watcher keeps a `Weak` back-reference for relaunching.
pub struct Engine {
    endpoint: Endpoint,
    state: Mutex<EngineState>,
    supervisor: ProcessSupervisor,
    client: OnceLock<EngineClient>,
    /// Serializes dispatch and release against this one engine.
    dispatch: tokio::sync::Mutex<()>,
    /// Serializes launch attempts: a speculative liveness check racing the
    /// crash callback must never spawn two processes.
    launch: tokio::sync::Mutex<()>,
}

impl Engine {
    pub fn new(
        endpoint: Endpoint,
        launcher: Arc<dyn ProcessLauncher>,
        logs_path: PathBuf,
        engine_path: PathBuf,
        startup_timeout: Duration,
    ) -> Arc<Self> {
        let supervisor = ProcessSupervisor::new(
            endpoint.clone(),
            launcher,
            logs_path,
            engine_path,
            startup_timeout,
        );
        Arc::new(Self {
            endpoint,
            state: Mutex::new(EngineState::Off),
            supervisor,
            client: OnceLock::new(),
            dispatch: tokio::sync::Mutex::new(()),
            launch: tokio::sync::Mutex::new(()),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap()
    }

    /// Pid of the backing process, for diagnostics.
    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    pub fn is_process_alive(&self) -> bool {
        self.supervisor.is_alive()
    }

    // State transitions below are driven by the orchestrator under its own
    // locks; the engine only guards the copy itself.

    pub fn mark_idle(&self) {
        self.set_state(EngineState::Idle);
    }

    pub fn mark_booked(&self) {
        self.set_state(EngineState::Booked);
    }

    pub fn mark_computing(&self) {
        self.set_state(EngineState::Computing);
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap() = state;
    }

    /// Acquire the per-engine dispatch lock.
    ///
    /// Held by the orchestrator around a remote call or a release, so
    /// operations against one engine never interleave while other engines
    /// stay fully available.
    pub async fn lock_for_dispatch(&self) -> AsyncMutexGuard<'_, ()> {
        self.dispatch.lock().await
    }

    /// Launch the backing process, or verify it is still alive.
    ///
    /// On `Off` this is a real launch; on any other state it is a liveness
    /// check that relaunches only if the supervisor reports the process
    /// dead. Idempotent and safe to call speculatively.
    pub async fn launch_engine(self: &Arc<Self>) -> EngineResult<()> {
        let _launch = self.launch.lock().await;
        if self.state() != EngineState::Off {
            if self.supervisor.is_alive() {
                return Ok(());
            }
            warn!(endpoint = %self.endpoint, "engine process dead at liveness check, relaunching");
        }
        self.relaunch().await
    }

    async fn relaunch(self: &Arc<Self>) -> EngineResult<()> {
        self.set_state(EngineState::Off);

        let on_exit = self.exit_callback();
        match self.supervisor.launch(on_exit).await {
            Ok(()) => {
                self.set_state(EngineState::Idle);
                info!(endpoint = %self.endpoint, "engine up and idle");
                Ok(())
            }
            Err(source) => {
                error!(endpoint = %self.endpoint, error = %source, "engine launch failed");
                Err(EngineError::UnableToLaunch {
                    endpoint: self.endpoint.clone(),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Exit callback handed to the supervisor: mark `Off` immediately so no
    /// new bookings land on a dead engine, then attempt one relaunch.
    fn exit_callback(self: &Arc<Self>) -> ExitCallback {
        let weak = Arc::downgrade(self);
        Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(engine) = weak.upgrade() {
                    engine.on_engine_killed().await;
                }
            })
        })
    }

    async fn on_engine_killed(self: Arc<Self>) {
        error!(endpoint = %self.endpoint, "engine died unexpectedly");
        self.set_state(EngineState::Off);

        // One opportunistic relaunch; a failure leaves the engine Off and
        // out of the pool until a future launch_engine call succeeds.
        if let Err(error) = self.launch_engine().await {
            error!(endpoint = %self.endpoint, %error, "relaunch failed, engine stays off");
        }
    }

    fn client(&self) -> &EngineClient {
        self.client
            .get_or_init(|| EngineClient::new(self.endpoint.clone()))
    }

    // ── Domain actions ─────────────────────────────────────────
    //
    // One remote call each; results and errors pass through unchanged and
    // state is never touched here.

    pub async fn forecast(&self, request: &TimeSeriesAnalysisRequest) -> EngineResult<TimeSeries> {
        self.client().post(timeseries::FORECAST_URL, request).await
    }

    pub async fn compute_forecast_accuracy(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> EngineResult<f64> {
        self.client()
            .post(timeseries::FORECAST_ACCURACY_URL, request)
            .await
    }

    pub async fn predict(&self, request: &TimeSeriesAnalysisRequest) -> EngineResult<TimeSeries> {
        self.client().post(timeseries::PREDICT_URL, request).await
    }

    pub async fn classifier_start(
        &self,
        command: &ClassifierStartCommand,
        classifier: ClassifierType,
    ) -> EngineResult<()> {
        self.client()
            .post_for_ack(classifier.start_url(), command)
            .await
    }

    pub async fn classifier_data(
        &self,
        request: &ClassifierDataRequest,
        classifier: ClassifierType,
    ) -> EngineResult<()> {
        self.client()
            .post_for_ack(classifier.data_url(), request)
            .await
    }

    pub async fn classifier_predict(
        &self,
        request: &ClassifierRequest,
        classifier: ClassifierType,
    ) -> EngineResult<ClassifierDataResponse> {
        self.client()
            .post(classifier.predict_url(), request)
            .await
    }

    pub async fn classifier_predict_accuracy(
        &self,
        request: &ClassifierRequest,
        classifier: ClassifierType,
    ) -> EngineResult<f64> {
        self.client()
            .post(classifier.predict_accuracy_url(), request)
            .await
    }

    pub async fn classifier_cancel(
        &self,
        request: &ClassifierRequest,
        classifier: ClassifierType,
    ) -> EngineResult<()> {
        self.client()
            .post_for_ack(classifier.cancel_url(), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;
    use std::process::Stdio;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::process::{Child, Command};

    /// Shell launcher whose script can differ between the first launch and
    /// every later relaunch.
    struct SequencedLauncher {
        first: String,
        rest: String,
        launches: AtomicUsize,
    }

    impl SequencedLauncher {
        fn new(first: &str, rest: &str) -> Arc<Self> {
            Arc::new(Self {
                first: first.to_string(),
                rest: rest.to_string(),
                launches: AtomicUsize::new(0),
            })
        }

        fn launch_count(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }
    }

    impl ProcessLauncher for SequencedLauncher {
        fn launch(&self, _: &Endpoint, _: &Path, _: &Path) -> io::Result<Child> {
            let n = self.launches.fetch_add(1, Ordering::SeqCst);
            let script = if n == 0 { &self.first } else { &self.rest };
            Command::new("sh")
                .arg("-c")
                .arg(script)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
        }
    }

    fn test_engine(launcher: Arc<dyn ProcessLauncher>) -> Arc<Engine> {
        Engine::new(
            Endpoint::new("127.0.0.1", 6766),
            launcher,
            PathBuf::from("/tmp"),
            PathBuf::from("/tmp"),
            Duration::from_millis(100),
        )
    }

    async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn launch_moves_off_to_idle() {
        let engine = test_engine(SequencedLauncher::new("sleep 30", "sleep 30"));
        assert_eq!(engine.state(), EngineState::Off);

        engine.launch_engine().await.unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.is_process_alive());
    }

    #[tokio::test]
    async fn launch_is_idempotent_while_alive() {
        let launcher = SequencedLauncher::new("sleep 30", "sleep 30");
        let engine = test_engine(launcher.clone());

        engine.launch_engine().await.unwrap();
        let pid = engine.pid();

        engine.launch_engine().await.unwrap();
        assert_eq!(launcher.launch_count(), 1, "second call must be a no-op");
        assert_eq!(engine.pid(), pid);
    }

    #[tokio::test]
    async fn concurrent_launches_spawn_one_process() {
        let launcher = SequencedLauncher::new("sleep 30", "sleep 30");
        let engine = test_engine(launcher.clone());

        // Both callers see Off; the launch lock makes the second a no-op
        // instead of a duplicate spawn.
        let (first, second) = tokio::join!(
            {
                let engine = Arc::clone(&engine);
                async move { engine.launch_engine().await }
            },
            {
                let engine = Arc::clone(&engine);
                async move { engine.launch_engine().await }
            },
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(launcher.launch_count(), 1, "racing launches spawned twice");
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn failed_launch_leaves_engine_off() {
        let engine = test_engine(SequencedLauncher::new(
            "printf 'bad interpreter' >&2; exit 1",
            "exit 1",
        ));

        let error = engine.launch_engine().await.unwrap_err();
        match &error {
            EngineError::UnableToLaunch { endpoint, source } => {
                assert_eq!(endpoint, engine.endpoint());
                assert!(matches!(**source, EngineError::Creation { .. }));
                assert!(error.to_string().contains("bad interpreter"));
            }
            other => panic!("expected UnableToLaunch, got {other:?}"),
        }
        assert_eq!(engine.state(), EngineState::Off);
    }

    #[tokio::test]
    async fn crash_triggers_relaunch_back_to_idle() {
        let launcher = SequencedLauncher::new("sleep 0.3", "sleep 30");
        let engine = test_engine(launcher.clone());

        engine.launch_engine().await.unwrap();
        let first_pid = engine.pid();

        // The first process dies on its own; the watcher relaunches.
        wait_for(
            || launcher.launch_count() >= 2 && engine.state() == EngineState::Idle,
            "crash-driven relaunch",
        )
        .await;
        assert!(engine.is_process_alive());
        assert_ne!(engine.pid(), first_pid);
    }

    #[tokio::test]
    async fn failed_relaunch_leaves_engine_off() {
        let launcher = SequencedLauncher::new("sleep 0.3", "printf 'gone' >&2; exit 1");
        let engine = test_engine(launcher.clone());

        engine.launch_engine().await.unwrap();

        wait_for(|| launcher.launch_count() >= 2, "relaunch attempt").await;
        wait_for(|| engine.state() == EngineState::Off, "engine settling off").await;
        assert!(!engine.is_process_alive());
        // No background retry: one failed relaunch attempt, then quiet.
        let attempts = launcher.launch_count();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(launcher.launch_count(), attempts);
    }

    #[tokio::test]
    async fn liveness_check_relaunches_dead_process() {
        let launcher = SequencedLauncher::new(
            // Dies shortly after the probe window with nothing watching the
            // state transition (relaunch also dies quickly at first).
            "sleep 0.3",
            "sleep 30",
        );
        let engine = test_engine(launcher.clone());

        engine.launch_engine().await.unwrap();
        wait_for(|| !engine.is_process_alive() || launcher.launch_count() >= 2, "first exit").await;

        // Whatever the crash callback already did, a speculative launch call
        // must leave the engine idle on a live process.
        engine.launch_engine().await.unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.is_process_alive());
    }
}
