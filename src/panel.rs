//! Headless terminal panel.
//!
//! Models the host-side widget around the supervisor: a shell picker, start
//! and stop controls, an input line and an append-only output transcript.
//! Rendering is left to whoever supplies the view callback.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::shell::{available_shells, ShellDescriptor, ShellSupervisor, SupervisorConfig};

pub const STOPPED_MARKER: &str = "\n--- Terminal stopped ---";
pub const NOT_RUNNING_NOTICE: &str = "Terminal is not running. Please start a shell first.";

/// Called with every piece of text appended to the transcript.
pub type PanelView = Arc<dyn Fn(&str) + Send + Sync>;

/// What happened to a submitted input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Sent,
    /// Blank input while the shell is running.
    Ignored,
    NotRunning,
}

pub struct TerminalPanel {
    supervisor: ShellSupervisor,
    working_dir: Option<PathBuf>,
    current_shell: Option<&'static ShellDescriptor>,
    transcript: Arc<Mutex<String>>,
    view: PanelView,
}

impl TerminalPanel {
    pub fn new(config: SupervisorConfig, working_dir: Option<PathBuf>, view: PanelView) -> Self {
        Self {
            supervisor: ShellSupervisor::new(config),
            working_dir,
            current_shell: None,
            transcript: Arc::new(Mutex::new(String::new())),
            view,
        }
    }

    /// Entries for the shell picker.
    pub fn shells(&self) -> Vec<&'static ShellDescriptor> {
        available_shells()
    }

    pub fn current_shell(&self) -> Option<&'static ShellDescriptor> {
        self.current_shell
    }

    /// Stops any running shell, clears the transcript and starts `shell`.
    pub async fn start(&mut self, shell: &'static ShellDescriptor) {
        // The old session's delivery task must be gone before clearing.
        self.supervisor.stop().await;
        self.current_shell = Some(shell);
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.clear();
        }

        let transcript = self.transcript.clone();
        let view = self.view.clone();
        let working_dir = self.working_dir.clone();
        self.supervisor
            .start(shell, working_dir.as_deref(), move |chunk: String| {
                append(&transcript, &view, &chunk)
            })
            .await;
    }

    pub async fn stop(&mut self) {
        self.supervisor.stop().await;
        self.append(STOPPED_MARKER);
    }

    /// Forwards a trimmed input line to the shell.
    pub async fn submit(&mut self, input: &str) -> Submission {
        if !self.supervisor.is_running() {
            self.append(NOT_RUNNING_NOTICE);
            return Submission::NotRunning;
        }

        let command = input.trim();
        if command.is_empty() {
            debug!("ignoring blank input");
            return Submission::Ignored;
        }
        self.supervisor.send(command).await;
        Submission::Sent
    }

    pub fn is_running(&mut self) -> bool {
        self.supervisor.is_running()
    }

    pub fn transcript(&self) -> String {
        match self.transcript.lock() {
            Ok(transcript) => transcript.clone(),
            Err(e) => {
                warn!("Transcript lock poisoned: {}", e);
                String::new()
            }
        }
    }

    fn append(&self, text: &str) {
        append(&self.transcript, &self.view, text);
    }
}

fn append(transcript: &Mutex<String>, view: &PanelView, text: &str) {
    if let Ok(mut transcript) = transcript.lock() {
        transcript.push_str(text);
    }
    view(text);
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, Instant};

    use super::*;
    use crate::shell::Platform;

    fn not_listed(_: Platform) -> bool {
        false
    }

    static SH: ShellDescriptor = ShellDescriptor {
        id: "panel-sh",
        display_name: "POSIX sh",
        command: &["/bin/sh"],
        offered_on: not_listed,
    };

    fn panel() -> (TerminalPanel, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let view: PanelView = Arc::new(move |text: &str| sink.lock().unwrap().push(text.to_string()));
        (TerminalPanel::new(SupervisorConfig::default(), None, view), seen)
    }

    async fn wait_for(panel: &TerminalPanel, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if panel.transcript().contains(needle) {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_submit_before_start_reports_not_running() {
        let (mut panel, seen) = panel();
        assert_eq!(panel.submit("ls").await, Submission::NotRunning);
        assert_eq!(panel.transcript(), NOT_RUNNING_NOTICE);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submitted_command_output_reaches_transcript_and_view() {
        let (mut panel, seen) = panel();
        panel.start(&SH).await;
        assert_eq!(panel.current_shell().map(|s| s.id), Some("panel-sh"));

        assert_eq!(panel.submit("  echo from-panel  ").await, Submission::Sent);
        assert!(wait_for(&panel, "from-panel").await);
        assert!(seen.lock().unwrap().concat().contains("from-panel"));

        panel.stop().await;
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (mut panel, _) = panel();
        panel.start(&SH).await;
        assert_eq!(panel.submit("   ").await, Submission::Ignored);
        panel.stop().await;
    }

    #[tokio::test]
    async fn test_stop_appends_marker() {
        let (mut panel, _) = panel();
        panel.start(&SH).await;
        panel.stop().await;
        assert!(!panel.is_running());
        assert!(panel.transcript().ends_with(STOPPED_MARKER));
    }

    #[tokio::test]
    async fn test_restart_clears_transcript() {
        let (mut panel, _) = panel();
        panel.start(&SH).await;
        panel.submit("echo old-output").await;
        assert!(wait_for(&panel, "old-output").await);

        panel.start(&SH).await;
        assert!(!panel.transcript().contains("old-output"));
        panel.stop().await;
    }

    #[tokio::test]
    async fn test_restart_during_output_keeps_stale_text_out() {
        let (mut panel, _) = panel();
        panel.start(&SH).await;
        panel.submit("while :; do echo stale-line; done").await;
        assert!(wait_for(&panel, "stale-line").await);

        panel.start(&SH).await;
        sleep(Duration::from_millis(100)).await;
        assert!(!panel.transcript().contains("stale-line"), "got {:?}", panel.transcript());

        panel.submit("echo fresh-line").await;
        assert!(wait_for(&panel, "fresh-line").await);
        assert!(!panel.transcript().contains("stale-line"));
        panel.stop().await;
    }
}
