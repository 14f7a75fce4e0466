//! Ingest command - download, transform and record remote source files.

use tigerlayer::ingest::{BatchReport, IngestionPipeline, OutcomeStatus};
use tigerlayer::transport::FtpTransport;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the ingest command.
pub struct IngestArgs {
    /// Layers to process; empty means every remote layer
    pub layers: Vec<String>,
    pub dry_run: bool,
}

/// Run the ingest command.
pub async fn run(runner: &CliRunner, args: IngestArgs) -> Result<(), CliError> {
    runner.log_startup("ingest");
    let config = runner.config();

    let pipeline = IngestionPipeline::from_config(config)?;
    let catalog = FtpTransport::new(&config.servers.primary_host, &config.servers.base_path);

    if args.layers.is_empty() {
        println!("Listing layers on {}...", config.servers.primary_host);
    } else {
        println!("Layers: {}", args.layers.join(", "));
    }

    let report = if args.dry_run {
        pipeline.plan_batch(&catalog, &args.layers).await
    } else {
        pipeline.run_batch(&catalog, &args.layers).await
    };

    print_report(&report, args.dry_run);

    let summary = pipeline.ledger_summary();
    info!(
        entries = summary.entries,
        processed = summary.processed_files,
        "Ledger after run"
    );
    Ok(())
}

fn print_report(report: &BatchReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("[DRY RUN] No files downloaded.");
        println!("  Would process: {}", report.count(OutcomeStatus::Planned));
    } else {
        println!("  Succeeded:     {}", report.succeeded());
        println!("  Failed:        {}", report.failed());
    }
    println!(
        "  Already done:  {}",
        report.count(OutcomeStatus::SkippedAlreadyProcessed)
    );
    println!(
        "  Skip pattern:  {}",
        report.count(OutcomeStatus::SkippedPattern)
    );

    for (layer, reason) in &report.skipped_layers {
        println!("  Skipped layer {} ({})", layer, reason);
    }
    for (layer, error) in &report.listing_errors {
        println!("  Could not list {}: {}", layer, error);
    }

    let failures: Vec<_> = report.outcomes.iter().filter(|o| o.is_failure()).collect();
    if !failures.is_empty() {
        println!();
        println!("Failures (retried on the next run):");
        for outcome in failures {
            println!(
                "  {}/{} at {}: {}",
                outcome.directory,
                outcome.filename,
                outcome.stage,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
