//! Resilient ingestion: download, extract, transform, persist, record.
//!
//! [`IngestionPipeline::process_one`] walks one file through
//! `CHECK_ENABLED → CHECK_LEDGER → DOWNLOADING → EXTRACTING → TRANSFORMING →
//! NAMING → PERSISTING → LEDGER_COMMIT → DONE` and always returns a
//! [`FileOutcome`]. The batch driver lists the remote catalog and feeds
//! files through it.

mod batch;
mod outcome;
mod pipeline;

pub use batch::BatchReport;
pub use outcome::{FileOutcome, FileStage, OutcomeStatus};
pub use pipeline::{IngestionPipeline, DEFAULT_PARALLEL_LAYERS};

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::transport::TransportError;

/// Errors building a pipeline. Per-file failures never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to open ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to set up transport: {0}")]
    Transport(#[from] TransportError),
}
