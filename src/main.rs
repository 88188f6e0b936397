//! CLI Entry Point for icotest
//!
//! Provides command-line access to the Simplicity Commander operations:
//! - Uploading firmware (enables debug mode and unlocks the chip first)
//! - Unlocking the chip and enabling debug mode separately
//! - Measuring the power usage of the attached hardware
//! - Opening or printing the configuration
//!
//! # Usage
//!
//! Flash the bootloader and the application:
//! ```bash
//! icotest flash firmware/bootloader.s37 firmware/sth.hex
//! ```
//!
//! Check the power usage against the configured limits:
//! ```bash
//! icotest --log info power --seconds 2 --check
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use icotest::commander::Commander;
use icotest::config::{self, Settings};
use icotest::logging::{self, LoggingConfig};
use icotest::measurement_types::{MeasurementSample, Unit};
use icotest::verification::ToleranceCheck;

#[derive(Parser)]
#[command(name = "icotest")]
#[command(about = "Flash and check ICOtronic hardware", long_about = None)]
struct Cli {
    /// Minimum level of shown log messages (default: configured level)
    #[arg(
        long,
        global = true,
        value_parser = ["debug", "info", "warning", "error", "critical"]
    )]
    log: Option<String>,

    /// Additional configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload firmware images in the given order
    Flash {
        /// Chip identifier (default: configured chip)
        #[arg(long)]
        chip: Option<String>,

        /// Firmware images
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Unlock the chip (erases the flash memory)
    Unlock {
        /// Chip identifier (default: configured chip)
        #[arg(long)]
        chip: Option<String>,
    },

    /// Route the debug interface of the programming board to the target
    DebugMode,

    /// Measure the power usage of the attached hardware
    Power {
        /// Length of the measurement window (default: configured window)
        #[arg(long)]
        seconds: Option<f64>,

        /// Fail if the power usage is outside of the configured limits
        #[arg(long)]
        check: bool,
    },

    /// Open the user configuration file
    Config {
        /// Print the effective configuration instead
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Works without a loadable configuration, so broken files can be fixed
    if let Commands::Config { show: false } = cli.command {
        let path = config::open_user_config()?;
        println!("Opened configuration file “{}”", path.display());
        return Ok(());
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Unable to load configuration")?;

    let mut logging_config = LoggingConfig::from_settings(&settings)?;
    if let Some(level) = &cli.log {
        logging_config.level = logging::parse_log_level(level)?;
    }
    logging::init(logging_config)?;
    debug!("Loaded configuration: {settings:?}");

    match cli.command {
        Commands::Flash { chip, images } => {
            let chip = chip.unwrap_or_else(|| settings.commander.chip.clone());
            with_commander(&settings, move |commander| {
                commander.upload_flash(&chip, images.as_slice())?;
                println!("Uploaded {} firmware image(s)", images.len());
                Ok(())
            })
            .await
        }
        Commands::Unlock { chip } => {
            let chip = chip.unwrap_or_else(|| settings.commander.chip.clone());
            with_commander(&settings, move |commander| {
                commander.unlock_device(&chip)?;
                println!("Unlocked chip {chip}");
                Ok(())
            })
            .await
        }
        Commands::DebugMode => {
            with_commander(&settings, |commander| {
                commander.enable_debug_mode()?;
                println!("Enabled debug mode");
                Ok(())
            })
            .await
        }
        Commands::Power { seconds, check } => {
            let seconds = seconds.unwrap_or(settings.power.window_seconds);
            let milliwatts =
                with_commander(&settings, move |commander| commander.read_power_usage(seconds))
                    .await?;
            let sample = MeasurementSample::over(
                milliwatts,
                Unit::Milliwatts,
                Duration::from_secs_f64(seconds),
            );
            println!("Power usage: {sample}");

            if check {
                ToleranceCheck::new(
                    "Power usage",
                    Unit::Milliwatts,
                    settings.power.expected_milliwatts,
                    settings.power.tolerance_milliwatts,
                )
                .check_sample(&sample)?;
            }
            Ok(())
        }
        Commands::Config { show } => {
            if show {
                print!("{}", settings.to_toml()?);
            }
            Ok(())
        }
    }
}

/// Run a blocking Simplicity Commander operation off the async runtime
async fn with_commander<T, F>(settings: &Settings, operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Commander) -> icotest::IcotestResult<T> + Send + 'static,
{
    let commander = Commander::from_settings(&settings.commander)?;
    let result = tokio::task::spawn_blocking(move || operation(&commander)).await?;
    Ok(result?)
}
