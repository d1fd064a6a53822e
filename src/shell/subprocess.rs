//! Shell subprocess supervision.
//!
//! This module owns the lifecycle of the embedded shell: launching it with
//! piped standard streams, forwarding input lines, streaming its output to the
//! host, and tearing everything down again. At most one session is alive per
//! supervisor.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SupervisorConfig;
use super::pump::{deliver_output, pump_output, OutputCallback};
use super::registry::ShellDescriptor;

// Interactive shells read stdin line by line.
const LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Where the supervisor is in a session's lifecycle.
enum SessionState {
    Absent,
    Running(Session),
    /// The shell exited on its own; its tasks are still owned until `stop`.
    Exited(Session),
}

/// Everything that belongs to one launched shell. Created and destroyed as a
/// unit: the stdin writer, the reaper (which owns the child), the pump (which
/// owns stdout/stderr) and the delivery task (which owns the output callback).
struct Session {
    shell_id: &'static str,
    pid: Option<u32>,
    stdin: ChildStdin,
    cancel: watch::Sender<bool>,
    exited: watch::Receiver<bool>,
    reaper: JoinHandle<()>,
    pump: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

impl Session {
    async fn write_line(&mut self, text: &str) -> Result<()> {
        let mut line = String::with_capacity(text.len() + LINE_ENDING.len());
        line.push_str(text);
        line.push_str(LINE_ENDING);

        self.stdin
            .write_all(line.as_bytes())
            .await
            .context("Failed to write command to shell stdin")?;
        // Without an explicit flush the shell never sees the line.
        self.stdin
            .flush()
            .await
            .context("Failed to flush shell stdin")?;
        Ok(())
    }

    fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Cancels the tasks, closes stdin, kills and reaps the process, then
    /// joins the remaining tasks. Never fails.
    async fn shutdown(self) {
        let Session {
            shell_id,
            stdin,
            cancel,
            reaper,
            pump,
            delivery,
            ..
        } = self;

        cancel.send_replace(true);
        delivery.abort();
        drop(stdin);

        // The reaper kills the child once it sees the cancellation.
        if let Err(e) = reaper.await {
            warn!(shell = shell_id, error = %e, "Shell reaper task failed");
        }
        if let Err(e) = pump.await {
            warn!(shell = shell_id, error = %e, "Output pump task failed");
        }
        match delivery.await {
            Err(e) if e.is_panic() => warn!(shell = shell_id, "Output callback panicked"),
            _ => {}
        }
        info!(shell = shell_id, "shell session stopped");
    }

    /// Synchronous best-effort teardown for `Drop`. The reaper is left to
    /// kill and reap the child; if the runtime is gone, `kill_on_drop` does.
    fn abandon(self) {
        debug!(shell = self.shell_id, "abandoning shell session");
        self.cancel.send_replace(true);
        self.pump.abort();
        self.delivery.abort();
    }
}

/// Owns the child: publishes its exit, or kills and reaps it on cancellation.
async fn reap_child(
    mut child: Child,
    shell_id: &'static str,
    mut cancel: watch::Receiver<bool>,
    exited: watch::Sender<bool>,
) {
    let status = tokio::select! {
        biased;
        status = child.wait() => status,
        // A dropped sender means the session is gone too.
        _ = cancel.changed() => {
            if let Err(e) = child.kill().await {
                warn!(shell = shell_id, error = %e, "Failed to kill shell process");
            }
            child.wait().await
        }
    };

    match status {
        Ok(status) => info!(shell = shell_id, %status, "shell exited"),
        Err(e) => warn!(shell = shell_id, error = %e, "Failed to wait for shell process"),
    }
    exited.send_replace(true);
}

/// Supervises a single interactive shell process.
///
/// The public operations never fail: launch errors are reported through the
/// output callback, everything else is logged.
pub struct ShellSupervisor {
    config: SupervisorConfig,
    state: SessionState,
}

impl Default for ShellSupervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

impl ShellSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config: config.normalized(),
            state: SessionState::Absent,
        }
    }

    /// Launches `shell`, replacing any existing session.
    ///
    /// Output (stdout and stderr combined) is delivered to `on_output` from a
    /// background task, in the order the shell produced it. If the shell
    /// cannot be launched, `on_output` receives a single `"Error: ..."` line
    /// and no session is installed.
    ///
    /// # Arguments
    /// * `shell` - Descriptor whose argv is launched verbatim
    /// * `working_dir` - Directory for the shell; `None` inherits ours
    /// * `on_output` - Sink for decoded output chunks
    pub async fn start<F>(&mut self, shell: &ShellDescriptor, working_dir: Option<&Path>, on_output: F)
    where
        F: FnMut(String) + Send + 'static,
    {
        self.stop().await;

        let mut on_output: OutputCallback = Box::new(on_output);
        match self.launch(shell, working_dir) {
            Ok(child) => self.install(shell, child, on_output),
            Err(e) => {
                let message = format!("{:#}", e);
                error!(shell = shell.id, error = %message, "Failed to start shell");
                on_output(format!("Error: {}\n", message));
            }
        }
    }

    fn launch(&self, shell: &ShellDescriptor, working_dir: Option<&Path>) -> Result<Child> {
        let (program, args) = shell
            .command
            .split_first()
            .ok_or_else(|| anyhow!("Shell '{}' has an empty command", shell.id))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("TERM", &self.config.term)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd.spawn()
            .with_context(|| format!("Failed to launch {} ({})", shell.display_name, program))
    }

    fn install(&mut self, shell: &ShellDescriptor, mut child: Child, mut on_output: OutputCallback) {
        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            // kill_on_drop reaps the half-configured child.
            error!(shell = shell.id, "Shell pipes were not captured");
            on_output("Error: shell standard streams were not captured\n".to_string());
            return;
        };

        let pid = child.id();
        let (cancel, cancel_rx) = watch::channel(false);
        let (exited_tx, exited) = watch::channel(false);
        let (output_tx, output_rx) = mpsc::channel(self.config.channel_capacity);

        let reaper = tokio::spawn(reap_child(child, shell.id, cancel_rx.clone(), exited_tx));
        let pump = tokio::spawn(pump_output(
            stdout,
            stderr,
            cancel_rx.clone(),
            exited.clone(),
            output_tx,
            self.config.read_chunk_size,
        ));
        let delivery = tokio::spawn(deliver_output(output_rx, on_output, cancel_rx));

        info!(shell = shell.id, pid = ?pid, "shell session started");
        self.state = SessionState::Running(Session {
            shell_id: shell.id,
            pid,
            stdin,
            cancel,
            exited,
            reaper,
            pump,
            delivery,
        });
    }

    /// Sends `text` plus a line terminator to the shell.
    ///
    /// With no running shell this only logs; write failures are logged too.
    pub async fn send(&mut self, text: &str) {
        let session = match &mut self.state {
            SessionState::Running(session) => session,
            SessionState::Exited(session) => {
                warn!(shell = session.shell_id, "Shell has exited; dropping input");
                return;
            }
            SessionState::Absent => {
                warn!("No shell is running; dropping input");
                return;
            }
        };

        match session.write_line(text).await {
            Ok(()) => debug!(shell = session.shell_id, command = text, "sent command"),
            Err(e) => {
                let message = format!("{:#}", e);
                error!(shell = session.shell_id, error = %message, "Failed to send command");
            }
        }
    }

    /// Tears down the current session, if any. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Absent) {
            SessionState::Absent => {}
            SessionState::Running(session) | SessionState::Exited(session) => {
                session.shutdown().await
            }
        }
    }

    /// True while a session exists and its process has not exited.
    ///
    /// Once an exit is observed the session's tasks are cancelled, so the
    /// callback receives nothing more, and the state moves to `Exited`.
    pub fn is_running(&mut self) -> bool {
        let exited = match &self.state {
            SessionState::Running(session) => session.has_exited(),
            SessionState::Absent | SessionState::Exited(_) => return false,
        };
        if exited {
            self.mark_exited();
        }
        !exited
    }

    fn mark_exited(&mut self) {
        if let SessionState::Running(session) = std::mem::replace(&mut self.state, SessionState::Absent) {
            debug!(shell = session.shell_id, "shell exit observed; silencing output");
            session.cancel.send_replace(true);
            self.state = SessionState::Exited(session);
        }
    }

    /// OS process id of the live shell.
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            SessionState::Running(session) if !session.has_exited() => session.pid,
            SessionState::Running(_) | SessionState::Absent | SessionState::Exited(_) => None,
        }
    }
}

impl Drop for ShellSupervisor {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Absent) {
            SessionState::Absent => {}
            SessionState::Running(session) | SessionState::Exited(session) => session.abandon(),
        }
    }
}
