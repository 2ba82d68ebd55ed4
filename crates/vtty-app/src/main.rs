//! VTTY on standard input and output.
//!
//! Reads command lines from stdin until EOF and prints results to stdout.
//! Configuration comes from the TOML file named by the first argument or
//! the `VTTY_CONFIG` environment variable; defaults apply otherwise.

mod commands;
mod stdio;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use vtty_shell::Vtty;
use vtty_types::VttyConfig;

use commands::SleepCmd;
use stdio::StdioTransport;

const IDLE_POLL: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = load_config()?;
    // The dispatch loop runs on the main thread.
    config.detach = false;
    let grace = config.shutdown_grace();

    let transport = StdioTransport::spawn().context("starting stdin reader")?;
    let mut vtty = Vtty::new(transport, config)?;
    vtty.bind::<SleepCmd>("sleep")?;
    log::info!("Commands: {}", vtty.command_list().join(" "));

    vtty.run();

    // Let tasks admitted before EOF finish on their own first.
    let deadline = Instant::now() + grace;
    while !vtty.scheduler().is_empty() && Instant::now() < deadline {
        thread::sleep(IDLE_POLL);
    }
    vtty.shutdown();
    Ok(())
}

fn load_config() -> Result<VttyConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VTTY_CONFIG").ok());
    match path {
        Some(path) => {
            let config =
                VttyConfig::load(&path).with_context(|| format!("loading config {path}"))?;
            log::info!("Loaded config from {path}");
            Ok(config)
        },
        None => Ok(VttyConfig::default()),
    }
}
