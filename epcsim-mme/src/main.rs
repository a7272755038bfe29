//! epcsim MME (Mobility Management Entity) simulator
//!
//! Main binary for the MME NAS layer. It implements:
//! - CLI argument parsing
//! - Configuration loading and validation
//! - EMM task spawning
//! - Graceful shutdown handling
//!
//! # Usage
//!
//! ```bash
//! epc-mme -c config/mme.yaml
//! epc-mme --log-level debug
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use epcsim_common::{init_logging, LogLevel, MmeConfig};
use epcsim_mme::tasks::spawn_emm_task;

/// epcsim MME - EPS Mobility Management Entity Simulator
#[derive(Parser, Debug)]
#[command(name = "epc-mme")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the MME configuration file (YAML); defaults apply if omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("MME failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config_file {
        Some(path) => MmeConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => MmeConfig::default(),
    };
    info!("Starting {config}");

    let (emm_tx, mut sap_rx, emm_join) = spawn_emm_task(config);

    // Drain the SAP output; the access-stratum side is not wired up in this
    // binary, so primitives are only logged.
    let sap_drain = tokio::spawn(async move {
        while let Some(primitive) = sap_rx.recv().await {
            info!("EMM-SAP - {primitive:?}");
        }
    });

    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    emm_tx
        .shutdown()
        .await
        .map_err(|_| anyhow::anyhow!("EMM task already stopped"))?;
    emm_join.await.context("EMM task panicked")?;
    drop(sap_drain);

    info!("MME stopped");
    Ok(())
}
