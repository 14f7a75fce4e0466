//! Batch driver: every file of every selected layer.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::outcome::{FileOutcome, FileStage, OutcomeStatus};
use super::pipeline::IngestionPipeline;
use crate::layer::LayerKind;
use crate::transport::Catalog;

/// Aggregated result of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Per-file outcomes, grouped by layer in processing order.
    pub outcomes: Vec<FileOutcome>,
    /// Layers skipped as a whole, with the reason.
    pub skipped_layers: Vec<(String, OutcomeStatus)>,
    /// Listings that failed: `(layer, error)`.
    pub listing_errors: Vec<(String, String)>,
}

impl BatchReport {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_skip()).count()
    }

    fn merge(&mut self, other: BatchReport) {
        self.outcomes.extend(other.outcomes);
        self.skipped_layers.extend(other.skipped_layers);
        self.listing_errors.extend(other.listing_errors);
    }
}

const ROOT_LISTING: &str = "<root>";
const ARCHIVE_SUFFIX: &str = ".zip";

impl IngestionPipeline {
    /// Process every archive of `layers` (all remote layers when empty).
    ///
    /// Files within a layer run one at a time; up to `parallel_downloads`
    /// layers run concurrently. Failures never stop the batch.
    pub async fn run_batch(&self, catalog: &dyn Catalog, layers: &[String]) -> BatchReport {
        self.batch(catalog, layers, false).await
    }

    /// Like [`run_batch`](Self::run_batch) but only reports what would happen.
    pub async fn plan_batch(&self, catalog: &dyn Catalog, layers: &[String]) -> BatchReport {
        self.batch(catalog, layers, true).await
    }

    async fn batch(&self, catalog: &dyn Catalog, requested: &[String], dry_run: bool) -> BatchReport {
        let mut report = BatchReport::default();

        let layers = if requested.is_empty() {
            match catalog.list_layers().await {
                Ok(layers) => layers,
                Err(e) => {
                    warn!(error = %e, "Failed to list remote layers");
                    report
                        .listing_errors
                        .push((ROOT_LISTING.to_string(), e.to_string()));
                    return report;
                }
            }
        } else {
            requested.to_vec()
        };

        info!(layers = layers.len(), parallel = self.parallel_layers, dry_run, "Starting batch");

        let mut layer_reports: Vec<BatchReport> = stream::iter(layers)
            .map(|layer| self.process_layer(catalog, layer, dry_run))
            .buffer_unordered(self.parallel_layers)
            .collect()
            .await;
        layer_reports.sort_by(|a, b| layer_key(a).cmp(layer_key(b)));

        for layer_report in layer_reports {
            report.merge(layer_report);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Batch complete"
        );
        report
    }

    async fn process_layer(&self, catalog: &dyn Catalog, layer: String, dry_run: bool) -> BatchReport {
        let mut report = BatchReport::default();

        let Some(descriptor) = self.layers().get(&layer).filter(|l| l.enabled).cloned() else {
            info!(layer = %layer, "Layer disabled, skipping");
            report.skipped_layers.push((layer, OutcomeStatus::SkippedDisabled));
            return report;
        };
        if descriptor.kind == LayerKind::Relationship {
            info!(layer = %layer, "Relationship layer, skipping");
            report
                .skipped_layers
                .push((layer, OutcomeStatus::SkippedRelationship));
            return report;
        }

        let files = match catalog.list_files(&layer).await {
            Ok(files) => files,
            Err(e) => {
                warn!(layer = %layer, error = %e, "Failed to list layer");
                report.listing_errors.push((layer, e.to_string()));
                return report;
            }
        };
        info!(layer = %layer, files = files.len(), "Processing layer");

        for filename in files
            .iter()
            .filter(|f| f.to_lowercase().ends_with(ARCHIVE_SUFFIX))
        {
            if let Some(pattern) = descriptor.skip_match(filename) {
                info!(layer = %layer, filename = %filename, pattern, "Skipping file matching pattern");
                report.outcomes.push(FileOutcome::new(
                    &layer,
                    filename,
                    OutcomeStatus::SkippedPattern,
                    FileStage::CheckPattern,
                ));
                continue;
            }

            let outcome = if dry_run {
                match self.precheck(&layer, filename) {
                    Some((status, stage)) => FileOutcome::new(&layer, filename, status, stage),
                    None => FileOutcome::new(&layer, filename, OutcomeStatus::Planned, FileStage::CheckKind),
                }
            } else {
                self.process_one(&layer, filename).await
            };
            report.outcomes.push(outcome);
        }

        report
    }
}

/// Layer a per-layer report belongs to, for stable ordering.
fn layer_key(report: &BatchReport) -> &str {
    report
        .outcomes
        .first()
        .map(|o| o.directory.as_str())
        .or_else(|| report.skipped_layers.first().map(|(l, _)| l.as_str()))
        .or_else(|| report.listing_errors.first().map(|(l, _)| l.as_str()))
        .unwrap_or("")
}
