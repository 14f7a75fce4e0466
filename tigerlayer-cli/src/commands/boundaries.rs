//! Boundary and manifest commands - post-process an ingested layer.

use tigerlayer::boundary::{generate_boundaries, generate_manifest};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Write `tile_boundaries.geojson` for a layer.
pub fn run_boundaries(runner: &CliRunner, layer: &str) -> Result<(), CliError> {
    runner.log_startup("boundaries");
    let layer_dir = runner.config().processing.layer_dir(layer);

    let report = generate_boundaries(&layer_dir)?;

    println!("Wrote {} tile boundaries to {}", report.written, report.output.display());
    if report.failed > 0 {
        println!("  {} artifact(s) skipped (unreadable or missing bbox)", report.failed);
    }
    Ok(())
}

/// Write `manifest.json` for a layer.
pub fn run_manifest(runner: &CliRunner, layer: &str) -> Result<(), CliError> {
    runner.log_startup("manifest");
    let layer_dir = runner.config().processing.layer_dir(layer);

    let names = generate_manifest(&layer_dir)?;

    println!(
        "Wrote manifest of {} artifact(s) to {}",
        names.len(),
        layer_dir.join(tigerlayer::artifact::MANIFEST_FILE).display()
    );
    Ok(())
}
