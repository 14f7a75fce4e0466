//! Per-file results of the ingestion pipeline.

use std::fmt;
use std::path::PathBuf;

/// Step of the per-file state machine an outcome stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStage {
    CheckEnabled,
    CheckPattern,
    CheckLedger,
    CheckKind,
    Downloading,
    Extracting,
    Transforming,
    Naming,
    Persisting,
    LedgerCommit,
    Done,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::CheckEnabled => "check_enabled",
            FileStage::CheckPattern => "check_pattern",
            FileStage::CheckLedger => "check_ledger",
            FileStage::CheckKind => "check_kind",
            FileStage::Downloading => "downloading",
            FileStage::Extracting => "extracting",
            FileStage::Transforming => "transforming",
            FileStage::Naming => "naming",
            FileStage::Persisting => "persisting",
            FileStage::LedgerCommit => "ledger_commit",
            FileStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Success,
    SkippedDisabled,
    SkippedAlreadyProcessed,
    /// Relationship layers are accepted but not processed.
    SkippedRelationship,
    /// Matched a layer skip pattern; never downloaded or ledgered.
    SkippedPattern,
    /// Dry run: would have been processed.
    Planned,
    Failed,
}

impl OutcomeStatus {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::SkippedDisabled
                | OutcomeStatus::SkippedAlreadyProcessed
                | OutcomeStatus::SkippedRelationship
                | OutcomeStatus::SkippedPattern
        )
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::SkippedDisabled => "skipped (layer disabled)",
            OutcomeStatus::SkippedAlreadyProcessed => "skipped (already processed)",
            OutcomeStatus::SkippedRelationship => "skipped (relationship layer)",
            OutcomeStatus::SkippedPattern => "skipped (matched skip pattern)",
            OutcomeStatus::Planned => "planned",
            OutcomeStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened to one `(directory, filename)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub directory: String,
    pub filename: String,
    pub status: OutcomeStatus,
    pub stage: FileStage,
    pub artifact_path: Option<PathBuf>,
    /// Protocol that delivered (or last failed to deliver) the source.
    pub protocol: Option<String>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub(crate) fn new(directory: &str, filename: &str, status: OutcomeStatus, stage: FileStage) -> Self {
        Self {
            directory: directory.to_string(),
            filename: filename.to_string(),
            status,
            stage,
            artifact_path: None,
            protocol: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}
