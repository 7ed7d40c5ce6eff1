use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use airlink::config::Config;
use airlink::connector::UdpConnector;
use airlink::engine::{Command, Engine, EngineModel};

/// Process-wide shutdown latch, flipped by SIGINT and SIGTERM.
static RUNNING: AtomicBool = AtomicBool::new(true);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("airlink.toml"));
    let config =
        Config::load(&path).with_context(|| format!("loading {}", path.display()))?;

    if config.auto_discover_relay {
        warn!("relay discovery is not supported, using the configured address");
    }

    ctrlc::set_handler(|| RUNNING.store(false, Ordering::SeqCst))
        .context("installing the shutdown handler")?;

    let connector = Arc::new(UdpConnector::new(&config.relay_ip, config.relay_port));
    let mut engine = Engine::new(config, connector);
    let mut model = EngineModel {
        command: Command::StartEngine,
        ..EngineModel::default()
    };

    engine.run(&mut model, &RUNNING);

    Ok(())
}
