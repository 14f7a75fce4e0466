//! Per-file ingestion state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::outcome::{FileOutcome, FileStage, OutcomeStatus};
use super::IngestError;
use crate::artifact::{artifact_filename, base_name};
use crate::config::ConfigFile;
use crate::download::{DownloadError, Downloader, RetryPolicy};
use crate::engine::{GeometryEngine, ShapefileEngine, TransformRequest};
use crate::geohash;
use crate::layer::{LayerKind, LayerRegistry, DEFAULT_TOLERANCE};
use crate::ledger::{Ledger, LedgerStatus, LedgerSummary};
use crate::transport::{FtpTransport, HttpsTransport, Transport};
use crate::workspace::{self, Workspace};

/// Default number of layers processed concurrently by a batch.
pub const DEFAULT_PARALLEL_LAYERS: usize = 4;

/// Failure inside [`IngestionPipeline::process_one`], before it becomes an outcome.
struct StageFailure {
    stage: FileStage,
    message: String,
    protocol: Option<String>,
}

impl StageFailure {
    fn new(stage: FileStage, message: impl ToString) -> Self {
        Self {
            stage,
            message: message.to_string(),
            protocol: None,
        }
    }

    fn with_protocol(mut self, protocol: Option<String>) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Downloads, transforms and records remote source files.
pub struct IngestionPipeline {
    layers: Arc<LayerRegistry>,
    downloader: Downloader,
    engine: Arc<dyn GeometryEngine>,
    ledger: Arc<Mutex<Ledger>>,
    output_dir: PathBuf,
    base_tolerance: Option<f64>,
    pub(super) parallel_layers: usize,
}

impl IngestionPipeline {
    pub fn new(
        layers: LayerRegistry,
        downloader: Downloader,
        engine: Arc<dyn GeometryEngine>,
        ledger: Ledger,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            layers: Arc::new(layers),
            downloader,
            engine,
            ledger: Arc::new(Mutex::new(ledger)),
            output_dir: output_dir.into(),
            base_tolerance: None,
            parallel_layers: DEFAULT_PARALLEL_LAYERS,
        }
    }

    /// Pipeline wired to the configured FTP and HTTPS hosts, the shapefile
    /// engine and the ledger in the output directory.
    pub fn from_config(config: &ConfigFile) -> Result<Self, IngestError> {
        let processing = &config.processing;
        let servers = &config.servers;

        let primary: Arc<dyn Transport> =
            Arc::new(FtpTransport::new(&servers.primary_host, &servers.base_path));
        let secondary: Arc<dyn Transport> = Arc::new(HttpsTransport::new(
            &servers.secondary_host,
            &servers.base_path,
            processing.attempt_timeout(),
        )?);
        let downloader =
            Downloader::new(primary, RetryPolicy::from_settings(processing)).with_fallback(secondary);
        let ledger = Ledger::open(processing.ledger_path())?;

        Ok(Self::new(
            config.layers.clone(),
            downloader,
            Arc::new(ShapefileEngine::new()),
            ledger,
            &processing.output_dir,
        )
        .with_base_tolerance(processing.base_tolerance)
        .with_parallel_layers(processing.parallel_downloads))
    }

    pub fn with_base_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.base_tolerance = tolerance;
        self
    }

    pub fn with_parallel_layers(mut self, parallel: usize) -> Self {
        self.parallel_layers = parallel.max(1);
        self
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn layer_dir(&self, layer: &str) -> PathBuf {
        self.output_dir.join(layer)
    }

    pub fn is_processed(&self, directory: &str, filename: &str) -> bool {
        self.ledger.lock().is_processed(directory, filename)
    }

    pub fn ledger_summary(&self) -> LedgerSummary {
        self.ledger.lock().summary()
    }

    /// Skip status for a file, or `None` if it would be processed.
    pub fn precheck(&self, directory: &str, filename: &str) -> Option<(OutcomeStatus, FileStage)> {
        let Some(layer) = self.layers.get(directory).filter(|l| l.enabled) else {
            return Some((OutcomeStatus::SkippedDisabled, FileStage::CheckEnabled));
        };
        if self.is_processed(directory, filename) {
            return Some((OutcomeStatus::SkippedAlreadyProcessed, FileStage::CheckLedger));
        }
        if layer.kind == LayerKind::Relationship {
            return Some((OutcomeStatus::SkippedRelationship, FileStage::CheckKind));
        }
        None
    }

    /// Process one remote file end to end.
    ///
    /// Never fails: every error is logged, appended to the ledger as
    /// `error:<detail>` and returned as a [`OutcomeStatus::Failed`] outcome.
    #[instrument(skip(self))]
    pub async fn process_one(&self, directory: &str, filename: &str) -> FileOutcome {
        if let Some((status, stage)) = self.precheck(directory, filename) {
            debug!(filename, %status, "Skipping file");
            return FileOutcome::new(directory, filename, status, stage);
        }

        match self.run(directory, filename).await {
            Ok((artifact_path, protocol)) => {
                info!(filename, artifact = %artifact_path.display(), protocol = %protocol, "Processed file");
                let mut outcome =
                    FileOutcome::new(directory, filename, OutcomeStatus::Success, FileStage::Done);
                outcome.artifact_path = Some(artifact_path);
                outcome.protocol = Some(protocol);
                outcome
            }
            Err(failure) => {
                warn!(filename, stage = %failure.stage, error = %failure.message, "Failed to process file");
                if failure.stage != FileStage::LedgerCommit {
                    let protocol = failure.protocol.as_deref().unwrap_or("none");
                    let status = LedgerStatus::error(&failure.message);
                    if let Err(e) = self.ledger.lock().record(directory, filename, &status, protocol) {
                        error!(filename, error = %e, "Failed to record failure in ledger");
                    }
                }
                let mut outcome =
                    FileOutcome::new(directory, filename, OutcomeStatus::Failed, failure.stage);
                outcome.protocol = failure.protocol;
                outcome.error = Some(failure.message);
                outcome
            }
        }
    }

    /// The happy path; the workspace lives until this returns.
    async fn run(&self, directory: &str, filename: &str) -> Result<(PathBuf, String), StageFailure> {
        let layer_dir = self.layer_dir(directory);
        let workspace = Workspace::create(&layer_dir)
            .map_err(|e| StageFailure::new(FileStage::Downloading, e))?;

        let fetched = self.downloader.fetch(directory, filename).await.map_err(|e| {
            let protocol = self.failed_protocol(&e);
            StageFailure::new(FileStage::Downloading, e).with_protocol(Some(protocol))
        })?;
        let protocol = fetched.protocol;
        let with_protocol = |f: StageFailure| f.with_protocol(Some(protocol.clone()));

        let dir = workspace.path().to_path_buf();
        let bytes = fetched.bytes;
        tokio::task::spawn_blocking(move || workspace::extract_zip(&dir, &bytes))
            .await
            .map_err(|e| StageFailure::new(FileStage::Extracting, e))?
            .map_err(|e| with_protocol(StageFailure::new(FileStage::Extracting, e)))?;

        let request = self.transform_request(directory, filename, workspace.path());
        let engine = Arc::clone(&self.engine);
        let artifact = tokio::task::spawn_blocking(move || engine.transform(&request))
            .await
            .map_err(|e| StageFailure::new(FileStage::Transforming, e))?
            .map_err(|e| with_protocol(StageFailure::new(FileStage::Transforming, e)))?;

        let code = geohash::encode_center(&artifact.bounds)
            .map_err(|e| with_protocol(StageFailure::new(FileStage::Naming, e)))?;
        let artifact_path = layer_dir.join(artifact_filename(filename, &code, self.engine.extension()));

        let dest = artifact_path.clone();
        tokio::task::spawn_blocking(move || workspace::persist_atomic(&dest, &artifact.bytes))
            .await
            .map_err(|e| StageFailure::new(FileStage::Persisting, e))?
            .map_err(|e| with_protocol(StageFailure::new(FileStage::Persisting, e)))?;
        drop(workspace);

        self.ledger
            .lock()
            .record(directory, filename, &LedgerStatus::Success, &protocol)
            .map_err(|e| with_protocol(StageFailure::new(FileStage::LedgerCommit, e)))?;

        Ok((artifact_path, protocol))
    }

    fn transform_request(&self, directory: &str, filename: &str, source_dir: &Path) -> TransformRequest {
        let layer = self.layers.get(directory);
        let tolerance = layer
            .map(|l| l.resolve_tolerance(self.base_tolerance))
            .unwrap_or(DEFAULT_TOLERANCE);

        TransformRequest {
            source_dir: source_dir.to_path_buf(),
            base_name: base_name(filename).to_string(),
            layer: directory.to_string(),
            geometry: layer.and_then(|l| l.geometry),
            tolerance,
        }
    }

    /// Protocol of the last transport a failed download tried.
    fn failed_protocol(&self, error: &DownloadError) -> String {
        self.downloader.failed_protocol(error).to_string()
    }
}
