//! Foreground LCI Builder
//!
//! Batch entry point: converts the configured BOM sources into a JSON-LD
//! process archive and a process summary table.

use anyhow::{Context, Result};
use tracing::{error, info};

use lci_utils::{init_logging, AppConfig};

mod service;

use service::ForegroundService;

fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;
    info!("Starting Foreground LCI Builder");

    let service = ForegroundService::new(config);
    match service.run() {
        Ok(report) => {
            info!(
                records = report.records,
                processes = report.totals.processes,
                cutoffs = report.totals.cutoffs,
                hierarchy_issues = report.hierarchy_issues,
                archive = %report.archive_path.display(),
                summary = %report.summary_path.display(),
                "Foreground build complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Foreground build failed");
            Err(e)
        }
    }
}
