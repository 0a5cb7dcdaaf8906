//! Growstation - Soil Sensor Node
//!
//! Host build of the node firmware. Serves the file browser out of a local
//! directory, samples a simulated probe front end and runs the same
//! cooperative control loop as the board.
//!
//! Usage: `growstation-node [node.toml]`

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant as StdInstant};

use anyhow::{anyhow, Context};
use embassy_time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use growstation_core::runtime::Peripherals;
use growstation_core::Node;
use growstation_hal::net::LinkUp;

use crate::board::{HostProbe, NoUpdates, SimulatedFrontEnd};
use crate::config::HostConfig;
use crate::fs_store::DirStore;
use crate::tcp::TcpAcceptor;

// Shared with build.rs, compiled here for its tests
#[cfg(test)]
mod banner;
mod board;
mod config;
mod fs_store;
mod tcp;

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "growstation_node=info,growstation_core=info";

/// Pause between loop iterations while no client is being served
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Loop time, counted from boot
fn uptime(boot: StdInstant) -> Instant {
    let micros = u64::try_from(boot.elapsed().as_micros()).unwrap_or(u64::MAX);
    Instant::from_micros(micros)
}

fn main() -> anyhow::Result<()> {
    let boot = StdInstant::now();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Growstation node starting...");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = HostConfig::load(config_path.as_deref())?;
    config.log_summary();

    let flash = DirStore::new(&config.storage.root).with_context(|| {
        format!(
            "failed to open storage root {}",
            config.storage.root.display()
        )
    })?;
    tracing::info!(
        "Storage root: {}",
        fs_store::describe(&config.storage.root)
    );

    let listen = config.listen_addr();
    let listener =
        TcpAcceptor::bind(listen).with_context(|| format!("failed to bind {}", listen))?;
    let bound = listener.local_addr()?;

    let link = LinkUp {
        hostname: config.node.hostname.clone(),
        address: match bound.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => ip.octets(),
            _ => [127, 0, 0, 1],
        },
    };

    let peripherals = Peripherals {
        flash,
        listener,
        analog: SimulatedFrontEnd::new(config.analog.raw),
        probe: HostProbe::new(config.probe.analog),
        update: NoUpdates,
    };
    let mut node = Node::new(&link, &config.node, peripherals, uptime(boot))
        .map_err(|e| anyhow!("failed to start node: {:?}", e))?;
    tracing::info!("Listening on {}", bound);

    loop {
        node.poll(uptime(boot));
        if !node.is_serving() {
            std::thread::sleep(IDLE_SLEEP);
        }
    }
}
