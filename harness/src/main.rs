//! Binary entry point (styled after `main/core/main.rs`'s `run_shadow`):
//! parse the CLI, load and validate the config, install a SIGINT handler,
//! run the session, write the output file.

mod cli;
mod config;
mod controller;
mod logging;
mod output;
mod session;

use anyhow::Context;
use clap::Parser;
use config::{Config, OutputKind};
use signal_hook::{consts, iterator::Signals};
use std::thread;

fn main() -> anyhow::Result<()> {
    let cli = cli::CliOptions::parse();

    logging::init(log::LevelFilter::Info).context("initializing logger")?;

    let mut signals = Signals::new([consts::signal::SIGINT]).context("installing SIGINT handler")?;
    thread::spawn(move || {
        if signals.forever().next().is_some() {
            log::info!("received SIGINT, exiting");
            std::process::exit(1);
        }
    });

    let config = Config::load(&cli).context("loading configuration")?;

    if config.show_config {
        println!("{config}");
        return Ok(());
    }

    let graph = session::run(&config).context("running session")?;

    let rendered = match config.output_kind {
        OutputKind::Dot => output::to_dot(&graph),
        OutputKind::Json => output::to_json(&graph),
    };
    std::fs::write(&config.output_path, rendered)
        .with_context(|| format!("writing output to {}", config.output_path))?;

    log::info!("wrote output to {}", config.output_path);
    Ok(())
}
