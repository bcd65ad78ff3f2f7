//! InfernoNav - navigation server daemon
//!
//! Waits for one operator console on the configured TCP address, serves the
//! session and exits after teardown.

use std::env;
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use inferno_nav::drive::{self, MockDrive};
use inferno_nav::{Config, Error, NavServer, Result};

const DEFAULT_CONFIG: &str = "inferno.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `inferno-nav <path>` (positional)
/// - `inferno-nav --config <path>` (flag-based)
/// - `inferno-nav -c <path>` (short flag)
///
/// Falls back to `inferno.toml` when present.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    Path::new(DEFAULT_CONFIG)
        .exists()
        .then(|| DEFAULT_CONFIG.to_string())
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("InfernoNav v{} starting...", env!("CARGO_PKG_VERSION"));

    let drive = drive::share(MockDrive::new(config.drive.battery_voltage));
    let mut server = NavServer::init(config.clone(), drive)?;

    let running = server.running_flag();
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Before any socket exists
    server.start_sensor()?;

    let bind_addr = &config.network.bind_address;
    let listener = TcpListener::bind(bind_addr)
        .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_addr, e)))?;
    listener.set_nonblocking(true)?;
    log::info!("Awaiting connection on {}", bind_addr);

    let stream = loop {
        if !running.load(Ordering::Relaxed) {
            log::info!("Interrupted before a client connected");
            server.teardown();
            return Ok(());
        }
        match listener.accept() {
            Ok((stream, addr)) => {
                log::info!("Successful connection from {}", addr);
                break stream;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                server.teardown();
                return Err(e.into());
            }
        }
    };
    drop(listener);

    let result = server.run(stream);

    log::info!("InfernoNav stopped");
    match result {
        Err(Error::Disconnected) => Ok(()),
        other => other,
    }
}
