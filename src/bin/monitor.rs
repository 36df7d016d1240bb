//! NetraMonitor - Read-only monitor view for NetraConsole
//!
//! Polls the shared state mirror and prints robot status and event log
//! entries. Fully decoupled from the console: it tolerates a missing or
//! half-written store file and keeps polling.
//!
//! Usage:
//!   netra-monitor [config.toml]

use netra_console::config::ConsoleConfig;
use netra_console::error::Result;
use netra_console::mirror::{FileStore, MirrorReader};

use std::path::Path;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netra_console=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = if args.len() > 1 {
        ConsoleConfig::load(Path::new(&args[1]))?
    } else if Path::new("netra.toml").exists() {
        ConsoleConfig::load(Path::new("netra.toml"))?
    } else {
        ConsoleConfig::default()
    };

    info!("NetraMonitor v{}", env!("CARGO_PKG_VERSION"));
    info!("Watching mirror at {}", config.mirror.store_path);

    let reader = MirrorReader::new(FileStore::new(&config.mirror.store_path));
    let poll_interval = Duration::from_millis(config.mirror.poll_ms);

    let mut last_status = String::new();
    let mut seen_entries = 0usize;

    loop {
        if let Some(state) = reader.read_state() {
            if state.status != last_status {
                println!(
                    "[{}] {} | mode {} | pose ({:.2}, {:.2}, {:.1}°)",
                    if state.connected { "UP" } else { "DOWN" },
                    state.status,
                    state.mode,
                    state.pose.x,
                    state.pose.y,
                    state.pose.theta_deg,
                );
                last_status = state.status;
            }
        }

        if let Some(entries) = reader.read_log() {
            // Console restart shrinks the log; resync instead of skipping
            if entries.len() < seen_entries {
                seen_entries = 0;
            }
            for entry in &entries[seen_entries..] {
                println!("  {:7} {}", format!("{:?}", entry.severity), entry.message);
            }
            seen_entries = entries.len();
        }

        std::thread::sleep(poll_interval);
    }
}
