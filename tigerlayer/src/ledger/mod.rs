//! Append-only processing ledger.
//!
//! One CSV row per ingestion attempt: `directory,filename,status,timestamp,protocol`.
//! The set of `(directory, filename)` pairs whose latest-or-any status is
//! `success` forms the skip-set consulted before downloading.
//!
//! A ledger that cannot be parsed is moved aside to `<path>.bak.<unix-seconds>`
//! and replaced by a fresh one. That recovery is logged and never fatal.

mod status;

pub use status::LedgerStatus;

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Column names, in order.
pub const HEADER: [&str; 5] = ["directory", "filename", "status", "timestamp", "protocol"];

/// Format of the timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that escape the ledger.
///
/// Corruption is not among them: it is recovered locally.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write ledger entry: {0}")]
    Write(#[from] csv::Error),
}

impl LedgerError {
    fn io(path: &Path, source: io::Error) -> Self {
        LedgerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Counts over every row of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    /// Total rows (attempts)
    pub entries: usize,
    pub successes: usize,
    pub errors: usize,
    /// Distinct `(directory, filename)` pairs marked successful
    pub processed_files: usize,
}

/// The durable record of ingestion attempts.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    processed: HashSet<(String, String)>,
    summary: LedgerSummary,
    recovered_backup: Option<PathBuf>,
}

impl Ledger {
    /// Open the ledger at `path`, creating or recovering it as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
            }
        }

        let mut ledger = Self {
            path,
            processed: HashSet::new(),
            summary: LedgerSummary::default(),
            recovered_backup: None,
        };

        let data = match fs::read(&ledger.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(LedgerError::io(&ledger.path, e)),
        };

        if data.is_empty() {
            ledger.write_header()?;
            debug!(path = %ledger.path.display(), "Created ledger");
            return Ok(ledger);
        }

        match parse_rows(&data) {
            Ok(rows) => {
                for row in rows {
                    ledger.apply(&row.directory, &row.filename, &row.status);
                }
                info!(
                    path = %ledger.path.display(),
                    entries = ledger.summary.entries,
                    processed = ledger.processed.len(),
                    "Loaded ledger"
                );
            }
            Err(reason) => {
                let backup = ledger.move_aside()?;
                warn!(
                    path = %ledger.path.display(),
                    backup = %backup.display(),
                    reason = %reason,
                    "Ledger corrupted, preserved backup and started a fresh ledger"
                );
                ledger.write_header()?;
                ledger.recovered_backup = Some(backup);
            }
        }

        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup created when a corrupted ledger was recovered on open.
    pub fn recovered_backup(&self) -> Option<&Path> {
        self.recovered_backup.as_deref()
    }

    /// Whether `(directory, filename)` has a successful entry.
    pub fn is_processed(&self, directory: &str, filename: &str) -> bool {
        self.processed
            .contains(&(directory.to_string(), filename.to_string()))
    }

    /// Append one entry and update the skip-set.
    pub fn record(
        &mut self,
        directory: &str,
        filename: &str,
        status: &LedgerStatus,
        protocol: &str,
    ) -> Result<(), LedgerError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| LedgerError::io(&self.path, e))?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let status_text = status.to_string();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([
            directory,
            filename,
            status_text.as_str(),
            timestamp.as_str(),
            protocol,
        ])?;
        writer.flush().map_err(|e| LedgerError::io(&self.path, e))?;

        self.apply(directory, filename, status);
        debug!(directory, filename, status = %status_text, protocol, "Ledger entry appended");
        Ok(())
    }

    /// Operator reset: move the current ledger to a backup and start empty.
    ///
    /// Returns the backup path.
    pub fn reset(&mut self) -> Result<PathBuf, LedgerError> {
        let backup = self.move_aside()?;
        self.write_header()?;
        self.processed.clear();
        self.summary = LedgerSummary::default();
        info!(
            path = %self.path.display(),
            backup = %backup.display(),
            "Ledger reset"
        );
        Ok(backup)
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            processed_files: self.processed.len(),
            ..self.summary
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    fn apply(&mut self, directory: &str, filename: &str, status: &LedgerStatus) {
        self.summary.entries += 1;
        if status.is_success() {
            self.summary.successes += 1;
            self.processed
                .insert((directory.to_string(), filename.to_string()));
        } else {
            self.summary.errors += 1;
        }
    }

    fn write_header(&self) -> Result<(), LedgerError> {
        let file = File::create(&self.path).map_err(|e| LedgerError::io(&self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| LedgerError::io(&self.path, e))?;
        Ok(())
    }

    /// Rename the ledger file to a timestamped backup.
    fn move_aside(&self) -> Result<PathBuf, LedgerError> {
        let backup = backup_path(&self.path);
        fs::rename(&self.path, &backup).map_err(|e| LedgerError::io(&self.path, e))?;
        Ok(backup)
    }
}

struct Row {
    directory: String,
    filename: String,
    status: LedgerStatus,
}

/// Parse the whole ledger, or describe why it is corrupt.
fn parse_rows(data: &[u8]) -> Result<Vec<Row>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let headers = reader.headers().map_err(|e| e.to_string())?;
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(format!(
            "unexpected header '{}'",
            headers.iter().collect::<Vec<_>>().join(",")
        ));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(Row {
            directory: record[0].to_string(),
            filename: record[1].to_string(),
            status: LedgerStatus::parse(&record[2]),
        });
    }
    Ok(rows)
}

/// `<path>.bak.<unix-seconds>`, with a numeric suffix if that already exists.
fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().timestamp();
    let base = format!("{}.bak.{}", path.display(), stamp);
    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger_path(dir: &TempDir) -> PathBuf {
        dir.path().join("processed_files.csv")
    }

    fn backups(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".bak."))
            .collect()
    }

    #[test]
    fn test_creates_header_when_missing() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(ledger_path(&dir)).unwrap();

        let content = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content.trim_end(), "directory,filename,status,timestamp,protocol");
        assert!(ledger.recovered_backup().is_none());
    }

    #[test]
    fn test_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);

        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger
                .record("COUNTY", "a.zip", &LedgerStatus::Success, "ftp")
                .unwrap();
            ledger
                .record("COUNTY", "b.zip", &LedgerStatus::error("boom, twice"), "https")
                .unwrap();
            assert!(ledger.is_processed("COUNTY", "a.zip"));
            assert!(!ledger.is_processed("COUNTY", "b.zip"));
        }

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.is_processed("COUNTY", "a.zip"));
        assert!(!ledger.is_processed("COUNTY", "b.zip"));
        assert!(!ledger.is_processed("STATE", "a.zip"));
        assert_eq!(
            ledger.summary(),
            LedgerSummary {
                entries: 2,
                successes: 1,
                errors: 1,
                processed_files: 1,
            }
        );
    }

    #[test]
    fn test_log_is_append_only() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);
        let mut ledger = Ledger::open(&path).unwrap();

        ledger
            .record("STATE", "s.zip", &LedgerStatus::error("timeout"), "ftp")
            .unwrap();
        let before = fs::read_to_string(&path).unwrap();
        ledger
            .record("STATE", "s.zip", &LedgerStatus::Success, "ftp")
            .unwrap();
        let after = fs::read_to_string(&path).unwrap();

        assert!(after.starts_with(&before));
        assert_eq!(after.lines().count(), 3);
        assert!(after.lines().nth(1).unwrap().contains(",error:timeout,"));
    }

    #[test]
    fn test_ragged_rows_trigger_recovery() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);
        let corrupt = "directory,filename,status,timestamp,protocol\nCOUNTY,a.zip\n";
        fs::write(&path, corrupt).unwrap();

        let ledger = Ledger::open(&path).unwrap();

        let backup = ledger.recovered_backup().unwrap().to_path_buf();
        assert_eq!(fs::read_to_string(&backup).unwrap(), corrupt);
        assert_eq!(backups(&dir), vec![backup]);
        assert_eq!(ledger.processed_count(), 0);
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            HEADER.join(",")
        );
    }

    #[test]
    fn test_wrong_header_triggers_recovery() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);
        fs::write(&path, "a,b,c,d,e\n1,2,3,4,5\n").unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.recovered_backup().is_some());
    }

    #[test]
    fn test_invalid_utf8_triggers_recovery() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);
        let mut data = b"directory,filename,status,timestamp,protocol\n".to_vec();
        data.extend_from_slice(b"COUNTY,\xff\xfe.zip,success,2023-01-01 00:00:00,ftp\n");
        fs::write(&path, &data).unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.recovered_backup().is_some());
        assert_eq!(fs::read(ledger.recovered_backup().unwrap()).unwrap(), data);
    }

    #[test]
    fn test_reset_preserves_backup() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(ledger_path(&dir)).unwrap();
        ledger
            .record("PLACE", "p.zip", &LedgerStatus::Success, "ftp")
            .unwrap();

        let backup = ledger.reset().unwrap();

        assert!(fs::read_to_string(&backup).unwrap().contains("p.zip"));
        assert!(!ledger.is_processed("PLACE", "p.zip"));
        assert_eq!(ledger.summary(), LedgerSummary::default());
    }

    #[test]
    fn test_backup_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(&dir);
        let mut ledger = Ledger::open(&path).unwrap();

        let first = ledger.reset().unwrap();
        let second = ledger.reset().unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }
}
