// src/main.rs - Host binary driving the simulated rig
use clap::Parser;
use std::path::Path;

use orient_rs::config::{self, Config};
use orient_rs::hardware;
use orient_rs::{ActivationMonitor, Platform, ProcessTable};

const DEFAULT_CONFIG: &str = "orient.toml";

#[derive(Debug, Parser)]
#[command(name = "orient-host", version, about = "Turn a platform to the angle of the active workload")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Angle to turn to on startup, overriding the configuration
    #[arg(short = 'a', long, allow_negative_numbers = true)]
    initial_angle: Option<f64>,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    tracing::info!("Starting orient-host {}", env!("CARGO_PKG_VERSION"));

    let mut config = if cli.config == DEFAULT_CONFIG && !Path::new(DEFAULT_CONFIG).exists() {
        tracing::info!("No {} found, using built-in defaults", DEFAULT_CONFIG);
        Config::default()
    } else {
        tracing::info!("Loading configuration from: {}", cli.config);
        config::load_config(&cli.config).map_err(|e| {
            tracing::error!("Failed to load config from '{}': {}", cli.config, e);
            Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
        })?
    };
    if let Some(angle) = cli.initial_angle {
        config.initial_angle = angle;
    }

    tracing::info!("Initial angle: {:.1} deg", config.initial_angle);
    tracing::info!(
        "Velocity {:.2}..{:.2}, settle {} ms, filter depth {}",
        config.control.min_velocity,
        config.control.max_velocity,
        config.control.settle_ms,
        config.control.filter_depth
    );

    let (_rig, devices) = hardware::simulated_devices(&config.simulator);
    let platform = match Platform::start(config.clone(), devices.motor, devices.accelerometer).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to start platform: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>);
        }
    };

    let handle = platform.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            handle.request_termination();
        }
    });

    let monitor = config.monitor.is_enabled().then(|| {
        let watched = config.monitor.watched_workloads();
        tracing::info!("Watching workloads: {}", watched.join(", "));
        ActivationMonitor::new(&config.monitor, Box::new(ProcessTable::new(watched)))
    });

    platform.run(monitor).await?;
    tracing::info!("All done");
    Ok(())
}
