//! ONTAP Driver Common
//!
//! Loads an ONTAP backend definition, applies the driver's defaults and
//! prints the effective configuration without credentials. With
//! `--check-endpoints` the management LIF must also resolve.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ontap_driver_common::driver::resolve_management_lif;
use ontap_driver_common::{BackendConfig, DriverContext, DriverKind, Result, SystemResolver};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Validate an ONTAP backend definition and show its effective configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend definition (JSON)
    #[arg(long, short = 'c', env = "ONTAP_BACKEND_CONFIG")]
    config: PathBuf,

    /// Storage driver; defaults to the definition's storageDriverName
    #[arg(long, env = "ONTAP_DRIVER")]
    driver: Option<DriverKind>,

    /// Orchestrator context (docker, kubernetes)
    #[arg(long, env = "DRIVER_CONTEXT", default_value = "kubernetes")]
    context: DriverContext,

    /// Check that the management LIF resolves
    #[arg(long)]
    check_endpoints: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("{} {}", ontap_driver_common::NAME, ontap_driver_common::VERSION);

    let mut config = BackendConfig::load(&args.config, args.context)?;

    let driver = match args.driver {
        Some(driver) => driver,
        None if config.storage_driver_name.is_empty() => DriverKind::OntapNas,
        None => config
            .storage_driver_name
            .parse()
            .map_err(ontap_driver_common::Error::Config)?,
    };
    info!("  Driver: {}", driver);
    info!("  Context: {}", args.context);

    config.populate_defaults(driver)?;

    if args.check_endpoints {
        let addresses = resolve_management_lif(&config, &SystemResolver).await?;
        info!("  Management LIF {} resolves to {:?}", config.management_lif, addresses);
    }

    println!("{}", serde_json::to_string_pretty(&config.external())?);

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the config report
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
