//! Furrow Runtime
//!
//! Boots the game: logging, config and the network session, then either
//! the windowed loop or the headless dedicated server.

mod app;
mod keymap;
mod launch;
mod server;

use std::path::Path;

use anyhow::Result;
use furrow_net::NetMode;
use furrow_services::GameConfig;

use crate::launch::Launch;

const CONFIG_PATH: &str = "config.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Furrow v{}", furrow_core::VERSION);
    let config = GameConfig::load_or_default(Path::new(CONFIG_PATH))?;
    let launch = Launch::from_config(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    tracing::info!(mode = ?launch.net_mode, "starting");

    match launch.net_mode {
        NetMode::DedicatedServer => server::run(&runtime, &launch),
        NetMode::Standalone | NetMode::Client => app::run(runtime, config, launch),
    }
}
