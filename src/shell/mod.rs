//! Shell execution and process management module.
//!
//! This module knows which shells can be launched on the host, and supervises
//! the one shell process embedded in the panel: spawning it, feeding it input,
//! streaming its output and shutting it down.

mod config;
mod decode;
mod pump;
pub mod registry;
mod subprocess;


pub use config::SupervisorConfig;
pub use decode::Utf8Decoder;
pub use pump::OutputCallback;
pub use registry::{available_shells, available_shells_for, find, Platform, ShellDescriptor};
pub use subprocess::ShellSupervisor;
