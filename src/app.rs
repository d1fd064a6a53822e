//! Application state and the console event loop.
//!
//! The App owns the terminal panel and the user input stream. Shell output is
//! printed as it arrives; input lines are either panel commands or text for
//! the shell.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::Receiver;
use tracing::{error, info};

use crate::event::{init_user_event, PanelCommand, UserEvent};
use crate::panel::{PanelView, TerminalPanel};
use crate::shell::{find, ShellDescriptor, SupervisorConfig};

pub struct App {
    panel: TerminalPanel,
    shell: &'static ShellDescriptor,
    user_events: Receiver<std::io::Result<UserEvent>>,
    exit: bool,
}

impl App {
    pub fn new(
        config: SupervisorConfig,
        shell: &'static ShellDescriptor,
        working_dir: Option<PathBuf>,
    ) -> Self {
        let view: PanelView = Arc::new(|text: &str| {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
                error!("Failed to write shell output: {}", e);
            }
        });

        Self {
            panel: TerminalPanel::new(config, working_dir, view),
            shell,
            user_events: init_user_event(),
            exit: false,
        }
    }

    /// Starts the shell and runs until `:quit`, EOF on stdin or Ctrl+C.
    pub async fn run(&mut self) -> Result<()> {
        self.panel.start(self.shell).await;

        while !self.exit {
            tokio::select! {
                event = self.user_events.recv() => match event {
                    Some(Ok(line)) => self.handle_line(&line).await,
                    Some(Err(e)) => {
                        self.panel.stop().await;
                        return Err(e).context("Failed to read user input");
                    }
                    None => {
                        info!("stdin closed");
                        self.exit = true;
                    }
                },
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl+C")?;
                    info!("interrupted");
                    self.exit = true;
                }
            }
        }

        self.panel.stop().await;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) {
        match PanelCommand::parse(line) {
            PanelCommand::Input(input) => {
                self.panel.submit(&input).await;
            }
            PanelCommand::Start(None) => self.panel.start(self.shell).await,
            PanelCommand::Start(Some(id)) => match find(&id) {
                Some(shell) => {
                    self.shell = shell;
                    self.panel.start(shell).await;
                }
                None => println!("Unknown shell '{}'", id),
            },
            PanelCommand::Stop => self.panel.stop().await,
            PanelCommand::Shells => {
                for shell in self.panel.shells() {
                    let marker = if shell.id == self.shell.id { '*' } else { ' ' };
                    println!("{} {:<12} {}", marker, shell.id, shell.display_name);
                }
            }
            PanelCommand::Quit => self.exit = true,
        }
    }
}
