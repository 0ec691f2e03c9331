//! Drishti - camera/lidar fusion daemon
//!
//! Listens for camera detections and lidar scans, correlates them into a
//! table of tracked objects and republishes the table every cycle.
//!
//! # Threads
//!
//! - `detections-rx`, `scan-rx`: one ZeroMQ subscriber per inbound channel
//! - `fusion`: scan index, correlation, tracking, eviction
//! - `objects-tx`: ZeroMQ publisher for the tracked-objects channel
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config configs/drishti.toml
//!
//! # With command line overrides
//! cargo run --release -- --scan tcp://192.168.1.30:5556 --log-level debug
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;

use drishti::config::Config;
use drishti::io::{ChannelReceiver, ObjectPublisher, decode_detections, decode_scan, mailbox};
use drishti::threads::{Diagnostics, FusionService, FusionThread};
use drishti::Result;

#[derive(Parser, Debug)]
#[command(name = "drishti")]
#[command(about = "Camera/lidar fusion and object tracking daemon")]
#[command(version)]
struct Args {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Override the endpoint the detections subscriber connects to
    #[arg(long, value_name = "ENDPOINT")]
    detections: Option<String>,

    /// Override the endpoint the scan subscriber connects to
    #[arg(long, value_name = "ENDPOINT")]
    scan: Option<String>,

    /// Override the endpoint the tracked-objects publisher binds
    #[arg(long, value_name = "ENDPOINT")]
    output: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    let default_level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&default_level, args.log_level.as_deref());

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("drishti {} starting", env!("CARGO_PKG_VERSION"));
    log::info!("  Detections: {}", config.network.detections_endpoint);
    log::info!("  Scan: {}", config.network.scan_endpoint);
    log::info!("  Tracked objects: {}", config.network.objects_endpoint);
    log::info!(
        "  Tracker: alpha {}, merge {}°, window {}s",
        config.tracker.smoothing_alpha,
        config.tracker.merge_bearing_threshold_deg,
        config.tracker.persistence_window_sec
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    }) {
        log::error!("Error setting signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&config, running) {
        log::error!("Startup failed: {}", e);
        std::process::exit(1);
    }

    log::info!("drishti shutdown complete");
}

/// Initialize env_logger.
///
/// `RUST_LOG` overrides the configured level; `--log-level` overrides both.
fn init_logging(default_level: &str, cli_level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if let Some(level) = cli_level {
        builder.parse_filters(level);
    }
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Load the config file (or defaults) and apply command line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(addr) = &args.detections {
        config.network.detections_endpoint = addr.clone();
    }
    if let Some(addr) = &args.scan {
        config.network.scan_endpoint = addr.clone();
    }
    if let Some(addr) = &args.output {
        config.network.objects_endpoint = addr.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Open every channel, start the threads and block until shutdown.
///
/// Returns an error only for startup failures.
fn run(config: &Config, running: Arc<AtomicBool>) -> Result<()> {
    // One context for the process; sockets are owned by their threads
    let context = zmq::Context::new();

    // 1. Open all sockets before starting any thread
    let (detection_rx, detections) = ChannelReceiver::connect(
        &context,
        "detections",
        &config.network.detections_endpoint,
        decode_detections,
        running.clone(),
    )?;
    let (scan_rx, scans) = ChannelReceiver::connect(
        &context,
        "scan",
        &config.network.scan_endpoint,
        decode_scan,
        running.clone(),
    )?;

    let (output_tx, output_rx) = mailbox();
    let publisher = ObjectPublisher::bind(
        &context,
        &config.network.objects_endpoint,
        output_rx,
        running.clone(),
    )?;

    let diagnostics = Diagnostics {
        channels: vec![
            ("detections", detection_rx.stats()),
            ("scan", scan_rx.stats()),
        ],
        publisher: Some(publisher.stats()),
    };

    // 2. Start threads, publisher first so fusion output always has a consumer.
    // A spawn failure is fatal; the process exits and takes running threads with it.
    let publisher_handle = publisher.spawn()?;
    let fusion = FusionThread::spawn(
        FusionService::new(&config.correlation, config.tracker),
        config.service,
        scans,
        detections,
        output_tx,
        diagnostics,
        running.clone(),
    )?;
    let detection_handle = detection_rx.spawn()?;
    let scan_handle = scan_rx.spawn()?;

    log::info!("Fusion daemon running");

    // 3. Wait for shutdown signal (main thread just monitors)
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutdown signal received, waiting for threads...");

    // 4. Join threads
    for (name, handle) in [("Detections receiver", detection_handle), ("Scan receiver", scan_handle)] {
        if let Err(e) = handle.join() {
            log::error!("{} thread panicked: {:?}", name, e);
        }
    }
    match fusion.join() {
        Ok(stats) => log::info!(
            "Fusion totals: {} cycles, {} objects created, {} published",
            stats.cycles,
            stats.created,
            stats.published
        ),
        Err(e) => log::error!("Fusion thread panicked: {:?}", e),
    }
    if let Err(e) = publisher_handle.join() {
        log::error!("Publisher thread panicked: {:?}", e);
    }

    log::info!("All threads stopped");
    Ok(())
}
