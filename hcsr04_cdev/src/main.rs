//! # HC-SR04 Ranging Demo
//!
//! Opens the ranging device, then repeatedly writes `start`, reads the
//! result line and logs the status and distance.
//!
//! # Usage
//!
//! ```bash
//! # Simulated sensor with built-in defaults
//! hcsr04_cdev
//!
//! # Ten measurements from a config file, half a second apart
//! hcsr04_cdev --config config/hcsr04.toml --count 10 --interval-ms 500
//!
//! # Raspberry Pi GPIO (built with --features rppal)
//! hcsr04_cdev --config /etc/hcsr04/hcsr04.toml --backend rppal -v
//! ```

use clap::Parser;
use hcsr04_cdev::{CharDevice, DeviceError, ResultLine};
use hcsr04_common::config::ConfigLoader;
use hcsr04_common::consts::RESULT_LINE_CAPACITY;
use hcsr04_common::ranging::DeviceConfig;
use hcsr04_ranging::{BackendRegistry, ResultCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// HC-SR04 ranging demo over the character-device interface
#[derive(Parser, Debug)]
#[command(name = "hcsr04_cdev")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Trigger HC-SR04 measurements and print the distance")]
#[command(long_about = None)]
struct Args {
    /// Path to hcsr04.toml. Built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Line backend, overriding [backend].name
    #[arg(short, long)]
    backend: Option<String>,

    /// Number of measurements (runs until Ctrl-C when omitted)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Pause between measurements in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        // Config errors surface before the subscriber is installed.
        eprintln!("hcsr04_cdev: {e}");
        error!("hcsr04 demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(backend) = &args.backend {
        config.backend.name = backend.clone();
    }
    config.validate()?;

    setup_tracing(&args, config.shared.log_level.as_tracing_level());
    info!("HC-SR04 demo v{} starting...", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let device = CharDevice::from_config(config, &BackendRegistry::with_builtin())?;
    let file = device.open()?;
    let interval = Duration::from_millis(args.interval_ms);
    let mut buf = [0u8; RESULT_LINE_CAPACITY];
    let mut done = 0u64;

    while running.load(Ordering::SeqCst) && args.count.is_none_or(|count| done < count) {
        match measure(&file, &mut buf) {
            Ok(Some(result)) => report(&result),
            Ok(None) => warn!("Status: Not Started"),
            Err(e) => warn!("Measurement failed: {} (errno {})", e, e.errno()),
        }
        done += 1;
        thread::sleep(interval);
    }

    file.release();
    info!("HC-SR04 demo finished after {} measurements", done);
    Ok(())
}

/// One `start` + `read` round trip.
fn measure(
    file: &hcsr04_cdev::DeviceFile,
    buf: &mut [u8],
) -> Result<Option<ResultLine>, DeviceError> {
    file.write(b"start\n")?;
    let len = file.read(buf)?;
    if len == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..len]);
    eprint!("{line}");
    match ResultLine::parse(&line) {
        Ok(result) => Ok(Some(result)),
        Err(e) => {
            warn!("{}", e);
            Ok(None)
        }
    }
}

fn report(result: &ResultLine) {
    match result.code {
        ResultCode::Success => info!("Status: Success {:.2} cm.", result.distance_cm()),
        ResultCode::InProgress => info!("Status: In-progress"),
        ResultCode::TimedOut => info!("Status: Timedout"),
        ResultCode::NotStarted => info!("Status: Not Started"),
        ResultCode::Unknown => info!("Status: Unknown"),
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
