//! Ledger status values.

use std::fmt;

const SUCCESS: &str = "success";
const ERROR_PREFIX: &str = "error:";

/// Outcome of one ingestion attempt as written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    Success,
    /// Failure with a single-line detail message.
    Error(String),
}

impl LedgerStatus {
    /// Error status with newlines flattened so each entry stays on one line.
    pub fn error(detail: impl AsRef<str>) -> Self {
        let detail = detail
            .as_ref()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        LedgerStatus::Error(detail)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LedgerStatus::Success)
    }

    /// Interpret a stored status column. Anything but `success` is an error.
    pub fn parse(raw: &str) -> Self {
        if raw == SUCCESS {
            return LedgerStatus::Success;
        }
        let detail = raw.strip_prefix(ERROR_PREFIX).unwrap_or(raw);
        LedgerStatus::Error(detail.trim_start().to_string())
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStatus::Success => write!(f, "{}", SUCCESS),
            LedgerStatus::Error(detail) => write!(f, "{}{}", ERROR_PREFIX, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(LedgerStatus::Success.to_string(), "success");
        assert_eq!(
            LedgerStatus::error("timed out").to_string(),
            "error:timed out"
        );
    }

    #[test]
    fn test_error_is_single_line() {
        let status = LedgerStatus::error("first\n  second\n\nthird");
        assert_eq!(status, LedgerStatus::Error("first second third".to_string()));
    }

    #[test]
    fn test_parse() {
        assert_eq!(LedgerStatus::parse("success"), LedgerStatus::Success);
        assert_eq!(
            LedgerStatus::parse("error:bad zip"),
            LedgerStatus::Error("bad zip".to_string())
        );
        assert_eq!(
            LedgerStatus::parse("error: spaced"),
            LedgerStatus::Error("spaced".to_string())
        );
        assert!(!LedgerStatus::parse("SUCCESS").is_success());
    }
}
