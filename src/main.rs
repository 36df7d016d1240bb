//! NetraConsole - Operator console for a mobile robot
//!
//! Connects to a JSON topic bridge, renders the occupancy-grid map view
//! to SVG, and drives the robot from line-based operator commands on
//! stdin. A separate monitor binary reads the mirrored state.
//!
//! Usage:
//!   netra-console [config.toml] [--bridge HOST:PORT]
//!
//! Commands are one per line: `connect`, `disconnect`, `mode <m>`,
//! `name <station name>`, `click <x> <y>`, `zoom in|out`, `pan <dx> <dy>`,
//! `reset`, `drive <dir>`, `stop`, `delete station|waypoint <id>`,
//! `clear-goal`, `patrol <id>|off`, `status`, `quit`.

use netra_console::config::ConsoleConfig;
use netra_console::console::{Console, OperatorCommand};
use netra_console::error::Result;
use netra_console::mirror::FileStore;

use crossbeam_channel::{unbounded, TryRecvError};
use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Main loop period
const STEP_INTERVAL: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netra_console=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        ConsoleConfig::load(config_path)?
    } else {
        let bridge_url = args
            .iter()
            .position(|a| a == "--bridge")
            .and_then(|i| args.get(i + 1))
            .cloned();

        let mut config = if Path::new("netra.toml").exists() {
            info!("Loading configuration from netra.toml");
            ConsoleConfig::load(Path::new("netra.toml"))?
        } else {
            info!("Using default configuration");
            ConsoleConfig::default()
        };

        if let Some(url) = bridge_url {
            info!("Using bridge at {}", url);
            config.connection.bridge_url = url;
        }

        config
    };

    info!("NetraConsole v{}", env!("CARGO_PKG_VERSION"));
    info!("Bridge endpoint: {}", config.connection.bridge_url);
    info!("View output: {}", config.render.view_path);

    let store = FileStore::new(&config.mirror.store_path);
    let mut console = Console::new(config, store);

    // Stdin reader thread feeds the single-threaded runtime
    let (tx, rx) = unbounded::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    // Draw the empty view once so the operator has output immediately
    console.request_render(Instant::now());

    'main: loop {
        let now = Instant::now();

        loop {
            match rx.try_recv() {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match OperatorCommand::parse(trimmed) {
                        Some(command) => {
                            if !console.handle_command(command, now) {
                                break 'main;
                            }
                        }
                        None => warn!("Unrecognized command: {}", trimmed),
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'main,
            }
        }

        console.step(now);
        std::thread::sleep(STEP_INTERVAL);
    }

    info!("NetraConsole finished");
    Ok(())
}
