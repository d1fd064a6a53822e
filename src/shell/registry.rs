//! Catalog of the shells the panel knows how to launch.
//!
//! Every descriptor carries the literal argv needed to keep the shell in an
//! interactive session. Without the interactive flag (`/K`, `-NoExit`, `-i`)
//! the shell would run a single line and exit.

use std::fmt;

use serde::Serialize;

/// Host operating system family, as far as shell selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    pub fn is_unix(self) -> bool {
        matches!(self, Platform::Linux | Platform::MacOs)
    }
}

/// A launchable shell: an id, a human-readable name and its argv.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShellDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Executable followed by its arguments.
    pub command: &'static [&'static str],
    /// Whether the descriptor is offered on a given platform.
    #[serde(skip)]
    pub offered_on: fn(Platform) -> bool,
}

impl ShellDescriptor {
    pub fn is_offered_on(&self, platform: Platform) -> bool {
        (self.offered_on)(platform)
    }
}

impl fmt::Display for ShellDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name)
    }
}

fn windows_only(platform: Platform) -> bool {
    platform == Platform::Windows
}

fn unix_only(platform: Platform) -> bool {
    platform.is_unix()
}

// Reachable through `find`, never listed.
fn never_listed(_: Platform) -> bool {
    false
}

static CATALOG: [ShellDescriptor; 5] = [
    ShellDescriptor {
        id: "cmd",
        display_name: "Command Prompt",
        command: &["cmd.exe", "/K"],
        offered_on: windows_only,
    },
    ShellDescriptor {
        id: "powershell",
        display_name: "PowerShell",
        command: &["powershell.exe", "-NoExit", "-NonInteractive"],
        offered_on: never_listed,
    },
    ShellDescriptor {
        id: "git-bash",
        display_name: "Git Bash",
        command: &["bash.exe", "-i"],
        offered_on: never_listed,
    },
    ShellDescriptor {
        id: "wsl",
        display_name: "WSL Bash",
        command: &["wsl.exe"],
        offered_on: never_listed,
    },
    ShellDescriptor {
        id: "bash",
        display_name: "Bash",
        command: &["/bin/bash", "-i"],
        offered_on: unix_only,
    },
];

/// Shells offered on the platform this binary runs on, in catalog order.
pub fn available_shells() -> Vec<&'static ShellDescriptor> {
    available_shells_for(Platform::current())
}

/// Shells offered on `platform`, in catalog order.
pub fn available_shells_for(platform: Platform) -> Vec<&'static ShellDescriptor> {
    CATALOG
        .iter()
        .filter(|shell| shell.is_offered_on(platform))
        .collect()
}

/// Looks up a descriptor by id, including entries that are never listed.
pub fn find(id: &str) -> Option<&'static ShellDescriptor> {
    CATALOG.iter().find(|shell| shell.id == id)
}
