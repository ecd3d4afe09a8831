//! Process launcher — how an engine's server process actually gets started.
//!
//! The supervisor only needs "give me a child process for this endpoint";
//! argv and environment construction stay behind this trait so tests can
//! substitute arbitrary processes.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use mlgrid_core::Endpoint;

/// Spawns the backing process for one engine endpoint.
///
/// Implementations must pipe stderr — the supervisor drains it to build
/// the creation error when a process dies inside the readiness window.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, endpoint: &Endpoint, logs_path: &Path, engine_path: &Path)
    -> io::Result<Child>;
}

/// Default launcher for the Python engine server.
#[derive(Debug, Default)]
pub struct PythonLauncher;

impl ProcessLauncher for PythonLauncher {
    fn launch(
        &self,
        endpoint: &Endpoint,
        logs_path: &Path,
        engine_path: &Path,
    ) -> io::Result<Child> {
        Command::new("python3")
            .arg("engine_server.py")
            .arg("--port")
            .arg(endpoint.port.to_string())
            .arg("--logs-path")
            .arg(logs_path)
            .arg("--log-level")
            .arg("INFO")
            .current_dir(engine_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
    }
}
