//! shell-panel - an interactive shell embedded in a host application
//!
//! This library runs a real shell (cmd.exe, bash, ...) behind plain pipes and
//! streams its output to the host, without any terminal emulation:
//! - Shell registry: which shells exist and how to launch them per OS
//! - Shell supervisor: one child shell, its input, its output pump, teardown
//! - Terminal panel: headless model of the widget around the supervisor
//!
//! # Example
//!
//! ```no_run
//! use shell_panel::shell::{available_shells, ShellSupervisor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let shell = available_shells()[0];
//!     let mut supervisor = ShellSupervisor::default();
//!
//!     supervisor.start(shell, None, |chunk: String| print!("{}", chunk)).await;
//!     supervisor.send("echo hello").await;
//!
//!     // Output arrives asynchronously through the callback.
//!     tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//!     supervisor.stop().await;
//! }
//! ```

pub mod app;
pub mod event;
pub mod panel;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use app::App;
pub use panel::{PanelView, Submission, TerminalPanel};
pub use shell::{ShellDescriptor, ShellSupervisor, SupervisorConfig};
