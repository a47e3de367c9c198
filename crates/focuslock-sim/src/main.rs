//! FocusLock simulator.
//!
//! Replays an observation script through the enforcement runtime on a
//! simulated device and logs every decision.
//!
//! # Usage
//!
//! ```bash
//! # Replay a script file
//! focuslock-sim --script escape.txt --grant overlay_draw --locked
//!
//! # Read the script from stdin, without system dialog dismissal
//! echo "lock
//! shade
//! foreground com.android.settings" | focuslock-sim --no-dismiss --log-level debug
//! ```

mod driver;
mod script;

use std::{io::Read, time::Duration};

use clap::Parser;
use focuslock_core::{AppId, Capability, LockStateStore, engine::DEFAULT_GUARDED_APP};
use focuslock_harness::SimDevice;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::driver::{Driver, DriverConfig};

/// FocusLock enforcement simulator
#[derive(Parser, Debug)]
#[command(name = "focuslock-sim")]
#[command(about = "Replay observation scripts through the FocusLock enforcement engine")]
#[command(version)]
struct Args {
    /// Script file to replay (stdin if omitted)
    #[arg(short, long)]
    script: Option<String>,

    /// Package the lock keeps the user inside
    #[arg(long, default_value = DEFAULT_GUARDED_APP)]
    guarded_app: String,

    /// Start with the lock engaged
    #[arg(long)]
    locked: bool,

    /// Capability granted before the script starts (repeatable)
    #[arg(short, long)]
    grant: Vec<Capability>,

    /// Simulate a platform that cannot dismiss system dialogs
    #[arg(long)]
    no_dismiss: bool,

    /// Capability cache lifetime in milliseconds (0 disables caching)
    #[arg(long, default_value = "500")]
    probe_ttl_ms: u64,

    /// Runtime queue capacity
    #[arg(long, default_value_t = focuslock_app::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let source = match &args.script {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        },
    };
    let lines = script::parse(&source)?;

    tracing::info!(
        guarded_app = %args.guarded_app,
        directives = lines.len(),
        "FocusLock simulator starting"
    );

    let config = DriverConfig {
        guarded_app: AppId::new(args.guarded_app.as_str()),
        dismiss_supported: !args.no_dismiss,
        probe_ttl: Duration::from_millis(args.probe_ttl_ms),
        queue_capacity: args.queue_capacity,
    };

    let device = SimDevice::new(config.guarded_app.clone());
    for capability in &args.grant {
        device.grant(*capability);
    }

    let mut driver = Driver::start(&config, device);
    if args.locked {
        driver.lock_flag().lock();
    }

    driver.run(&lines).await?;

    tracing::info!(
        lock = ?driver.lock_flag().read_lock_state(),
        foreground = %driver.device().foreground(),
        overlay = driver.device().overlay_drawn(),
        "Script finished"
    );

    let stats = driver.finish().await?;
    tracing::info!(
        observations = stats.observations,
        enforced = stats.enforced,
        failures = stats.failures,
        invalid = stats.invalid,
        "Simulation complete"
    );

    Ok(())
}
