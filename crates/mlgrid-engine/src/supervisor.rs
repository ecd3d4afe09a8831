//! Process supervisor — owns the lifecycle of one engine's backing process.
//!
//! `launch` spawns the process through the [`ProcessLauncher`], then runs a
//! bounded readiness probe: if the process exits within the startup window
//! its stderr is drained into the error; if it survives, a one-shot watcher
//! task is installed that awaits the real exit and fires the callback off
//! the launching task. A fresh watcher is installed on every successful
//! (re)launch, so the callback fires exactly once per launch.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr};
use tracing::{debug, info, warn};

use mlgrid_core::Endpoint;

use crate::error::{EngineError, EngineResult};
use crate::launcher::ProcessLauncher;

/// Invoked exactly once when the supervised process exits, for any reason.
pub type ExitCallback = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What remains visible of a launched process after its `Child` moves into
/// the watcher task.
struct ProcessHandle {
    pid: u32,
    alive: Arc<AtomicBool>,
}

/// Supervises the OS process behind one engine endpoint.
///
/// Launch failures are not retried here — retry policy belongs to the
/// engine. The supervisor never lies about liveness: `is_alive` is false
/// until a launch succeeds and flips back the moment the watcher observes
/// the exit.
pub struct ProcessSupervisor {
    endpoint: Endpoint,
    launcher: Arc<dyn ProcessLauncher>,
    logs_path: PathBuf,
    engine_path: PathBuf,
    startup_timeout: Duration,
    handle: Mutex<Option<ProcessHandle>>,
}

impl ProcessSupervisor {
    pub fn new(
        endpoint: Endpoint,
        launcher: Arc<dyn ProcessLauncher>,
        logs_path: PathBuf,
        engine_path: PathBuf,
        startup_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            launcher,
            logs_path,
            engine_path,
            startup_timeout,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the process and probe that it survives the startup window.
    ///
    /// A process that exits inside the window yields
    /// [`EngineError::Creation`] carrying its captured stderr. On success
    /// the exit watcher is installed before this returns, so a crash right
    /// after the window still reaches `on_exit`.
    pub async fn launch(&self, on_exit: ExitCallback) -> EngineResult<()> {
        info!(endpoint = %self.endpoint, "launching engine process");

        let mut child = self
            .launcher
            .launch(&self.endpoint, &self.logs_path, &self.engine_path)?;
        let stderr = child.stderr.take();

        match tokio::time::timeout(self.startup_timeout, child.wait()).await {
            Ok(wait_result) => {
                // Exited before the window elapsed: the launch failed.
                let status = wait_result?;
                let stderr_text = drain_stderr(stderr).await;
                warn!(
                    endpoint = %self.endpoint,
                    %status,
                    stderr = %stderr_text,
                    "engine process died during readiness probe"
                );
                Err(EngineError::Creation {
                    stderr: stderr_text,
                })
            }
            Err(_elapsed) => {
                let pid = child.id().unwrap_or_default();
                let alive = Arc::new(AtomicBool::new(true));
                *self.handle.lock().unwrap() = Some(ProcessHandle {
                    pid,
                    alive: Arc::clone(&alive),
                });

                info!(endpoint = %self.endpoint, pid, "engine process launched");
                tokio::spawn(watch_exit(
                    self.endpoint.clone(),
                    child,
                    stderr,
                    alive,
                    on_exit,
                ));
                Ok(())
            }
        }
    }

    /// True only while a launched process is still running. Never errors.
    pub fn is_alive(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| handle.alive.load(Ordering::Acquire))
    }

    /// Pid of the current process. Diagnostic only; valid while alive.
    pub fn pid(&self) -> Option<u32> {
        self.handle.lock().unwrap().as_ref().map(|handle| handle.pid)
    }
}

/// One-shot watcher: waits for the process to exit, flips the liveness
/// flag, then fires the callback.
async fn watch_exit(
    endpoint: Endpoint,
    mut child: Child,
    stderr: Option<ChildStderr>,
    alive: Arc<AtomicBool>,
    on_exit: ExitCallback,
) {
    // Drain stderr off to the side so the pipe can never back-pressure the
    // engine process. A descendant may inherit the pipe and hold it open
    // long after the supervised process itself exits, so the drain must
    // never gate the exit callback — it finishes whenever the last writer
    // goes away.
    {
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            let stderr_text = drain_stderr(stderr).await;
            if !stderr_text.is_empty() {
                debug!(%endpoint, stderr = %stderr_text, "engine stderr at exit");
            }
        });
    }

    let status = child.wait().await;
    alive.store(false, Ordering::Release);

    match status {
        Ok(status) => warn!(%endpoint, %status, "engine process exited"),
        Err(error) => warn!(%endpoint, %error, "engine process wait failed"),
    }

    on_exit().await;
}

async fn drain_stderr(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut buffer = Vec::new();
    let _ = stderr.read_to_end(&mut buffer).await;
    String::from_utf8_lossy(&buffer).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;
    use std::process::Stdio;
    use tokio::process::Command;
    use tokio::sync::Notify;

    /// Launches `sh -c <script>`, ignoring the endpoint and paths.
    struct ShellLauncher {
        script: String,
    }

    impl ShellLauncher {
        fn new(script: &str) -> Arc<Self> {
            Arc::new(Self {
                script: script.to_string(),
            })
        }
    }

    impl ProcessLauncher for ShellLauncher {
        fn launch(&self, _: &Endpoint, _: &Path, _: &Path) -> io::Result<tokio::process::Child> {
            Command::new("sh")
                .arg("-c")
                .arg(&self.script)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
        }
    }

    fn supervisor(script: &str, startup_timeout: Duration) -> ProcessSupervisor {
        ProcessSupervisor::new(
            Endpoint::new("127.0.0.1", 6766),
            ShellLauncher::new(script),
            PathBuf::from("/tmp"),
            PathBuf::from("/tmp"),
            startup_timeout,
        )
    }

    fn noop_exit() -> ExitCallback {
        Arc::new(|| Box::pin(async {}))
    }

    #[test]
    fn not_alive_before_any_launch() {
        let supervisor = supervisor("sleep 30", Duration::from_millis(100));
        assert!(!supervisor.is_alive());
        assert_eq!(supervisor.pid(), None);
    }

    #[tokio::test]
    async fn fast_failing_process_yields_creation_error_with_stderr() {
        let supervisor = supervisor(
            "printf 'port already in use' >&2; exit 7",
            Duration::from_millis(500),
        );

        let error = supervisor.launch(noop_exit()).await.unwrap_err();
        match error {
            EngineError::Creation { stderr } => {
                assert_eq!(stderr, "port already in use");
            }
            other => panic!("expected Creation error, got {other:?}"),
        }
        assert!(!supervisor.is_alive());
    }

    #[tokio::test]
    async fn surviving_process_probes_alive() {
        let supervisor = supervisor("sleep 30", Duration::from_millis(100));

        supervisor.launch(noop_exit()).await.unwrap();
        assert!(supervisor.is_alive());
        assert!(supervisor.pid().is_some());
    }

    #[tokio::test]
    async fn watcher_fires_exit_callback_once() {
        let supervisor = supervisor("sleep 0.2", Duration::from_millis(50));

        let notify = Arc::new(Notify::new());
        let fired = Arc::new(AtomicBool::new(false));
        let on_exit: ExitCallback = {
            let notify = Arc::clone(&notify);
            let fired = Arc::clone(&fired);
            Arc::new(move || {
                let notify = Arc::clone(&notify);
                let fired = Arc::clone(&fired);
                Box::pin(async move {
                    assert!(!fired.swap(true, Ordering::SeqCst), "callback fired twice");
                    notify.notify_one();
                })
            })
        };

        supervisor.launch(on_exit).await.unwrap();
        assert!(supervisor.is_alive());

        tokio::time::timeout(Duration::from_secs(5), notify.notified())
            .await
            .expect("exit callback never fired");
        assert!(!supervisor.is_alive());
    }

    #[tokio::test]
    async fn exit_fires_while_a_descendant_holds_stderr_open() {
        // The backgrounded sleep inherits the stderr pipe and outlives the
        // supervised process by minutes; the watcher must still fire on
        // the process's own exit, not on stderr EOF.
        let supervisor = supervisor("sleep 300 & exec sleep 0.2", Duration::from_millis(50));

        let notify = Arc::new(Notify::new());
        let on_exit: ExitCallback = {
            let notify = Arc::clone(&notify);
            Arc::new(move || {
                let notify = Arc::clone(&notify);
                Box::pin(async move {
                    notify.notify_one();
                })
            })
        };

        supervisor.launch(on_exit).await.unwrap();
        assert!(supervisor.is_alive());

        tokio::time::timeout(Duration::from_secs(5), notify.notified())
            .await
            .expect("exit callback gated on a descendant's stderr");
        assert!(!supervisor.is_alive());
    }

    #[tokio::test]
    async fn spawn_failure_surfaces_io_error() {
        struct BrokenLauncher;
        impl ProcessLauncher for BrokenLauncher {
            fn launch(
                &self,
                _: &Endpoint,
                _: &Path,
                _: &Path,
            ) -> io::Result<tokio::process::Child> {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such binary"))
            }
        }

        let supervisor = ProcessSupervisor::new(
            Endpoint::new("127.0.0.1", 6766),
            Arc::new(BrokenLauncher),
            PathBuf::from("/tmp"),
            PathBuf::from("/tmp"),
            Duration::from_millis(100),
        );

        let error = supervisor.launch(noop_exit()).await.unwrap_err();
        assert!(matches!(error, EngineError::Spawn(_)));
    }
}
