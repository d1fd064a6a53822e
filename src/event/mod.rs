//! Input events for the console host.
//!
//! User input is read on a dedicated thread so a slow shell or a long
//! teardown never delays reading the next line.

use std::io::{self, BufRead, Result};
use std::thread;

use tokio::sync::mpsc::{self, Receiver};

/// One line typed by the user, without its terminator.
pub type UserEvent = String;

/// What the host should do with a line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    /// `:start [id]` - (re)start the given or current shell.
    Start(Option<String>),
    /// `:stop`
    Stop,
    /// `:shells` - list available shells.
    Shells,
    /// `:quit`
    Quit,
    /// Anything else goes to the shell.
    Input(String),
}

impl PanelCommand {
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim().strip_prefix(':') else {
            return PanelCommand::Input(line.to_string());
        };
        let mut words = rest.split_whitespace();
        match (words.next(), words.next()) {
            (Some("start"), shell) => PanelCommand::Start(shell.map(str::to_string)),
            (Some("stop"), None) => PanelCommand::Stop,
            (Some("shells"), None) => PanelCommand::Shells,
            (Some("quit" | "q"), None) => PanelCommand::Quit,
            _ => PanelCommand::Input(line.to_string()),
        }
    }
}

/// Initializes the user event stream.
///
/// Spawns a thread reading stdin line by line. The channel closes on EOF; the
/// thread exits when the receiver is dropped.
pub fn init_user_event() -> Receiver<Result<UserEvent>> {
    let (tx, rx) = mpsc::channel(64);
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_input() {
        assert_eq!(PanelCommand::parse("ls -la"), PanelCommand::Input("ls -la".to_string()));
        assert_eq!(PanelCommand::parse(""), PanelCommand::Input(String::new()));
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(PanelCommand::parse(":start"), PanelCommand::Start(None));
        assert_eq!(
            PanelCommand::parse(" :start bash "),
            PanelCommand::Start(Some("bash".to_string()))
        );
        assert_eq!(PanelCommand::parse(":stop"), PanelCommand::Stop);
        assert_eq!(PanelCommand::parse(":shells"), PanelCommand::Shells);
        assert_eq!(PanelCommand::parse(":q"), PanelCommand::Quit);
    }

    #[test]
    fn test_unknown_colon_lines_go_to_shell() {
        // `:` is a valid shell builtin.
        assert_eq!(PanelCommand::parse(":"), PanelCommand::Input(":".to_string()));
        assert_eq!(
            PanelCommand::parse(":stop now"),
            PanelCommand::Input(":stop now".to_string())
        );
    }
}
