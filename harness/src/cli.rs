//! Command-line surface, mirroring the teacher's `CliOptions` /
//! `ConfigFileOptions` split (`main/core/support/configuration.rs`): flags
//! the operator types every run live here, everything else belongs in the
//! config file.

use clap::Parser;

/// Fault-inject libc calls made by a traced program and record the call
/// graph the harness observed.
#[derive(Debug, Clone, Parser)]
#[command(name = "analyser", version)]
pub struct CliOptions {
    /// Path to the session configuration file.
    pub config: String,

    /// Overrides the config file's output destination.
    #[arg(long)]
    pub output: Option<String>,

    /// Print the merged configuration and exit without running anything.
    #[arg(long)]
    pub show_config: bool,
}
