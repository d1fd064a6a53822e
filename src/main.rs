//! Main entry point for the shell-panel console host.
//!
//! Picks a shell, starts it in the terminal panel and feeds it stdin lines
//! until the user quits.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use shell_panel::shell::{available_shells, find, SupervisorConfig};
use shell_panel::utils;
use shell_panel::App;

#[derive(Debug, Parser)]
#[command(version, about = "Run an interactive shell behind plain pipes")]
struct Args {
    /// Print the shells available on this system as JSON and exit
    #[arg(long)]
    list: bool,

    /// Shell id to start (defaults to the first available shell)
    #[arg(long)]
    shell: Option<String>,

    /// Working directory for the shell
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// JSON file with supervisor settings
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        println!("{}", serde_json::to_string_pretty(&available_shells())?);
        return Ok(());
    }

    let _log_guard = utils::logger::init_logging();

    let config = match &args.config {
        Some(path) => SupervisorConfig::load(path)?,
        None => SupervisorConfig::default(),
    };

    let shell = match &args.shell {
        Some(id) => find(id).with_context(|| format!("Unknown shell '{}'", id))?,
        None => match available_shells().first() {
            Some(shell) => *shell,
            None => bail!("No shell is available on this platform"),
        },
    };

    let working_dir = match args.cwd {
        Some(dir) => Some(dir),
        None => std::env::current_dir().ok(),
    };

    let mut app = App::new(config, shell, working_dir);
    app.run().await
}
