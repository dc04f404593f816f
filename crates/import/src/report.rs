//! Result aggregation and diagnostic exports.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use ledgerly_db::bulk::RowError;

use crate::precheck::UnresolvedRow;

// ---------------------------------------------------------------------------
// ImportResult
// ---------------------------------------------------------------------------

/// Summary of one import invocation. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// Whether every row landed. Row-level failures flip this to `false`
    /// but never abort the run.
    pub success: bool,
    /// Rows successfully written (duplicates within one file collapse
    /// onto their surviving upsert and still count).
    pub count: usize,
    /// Rows rejected.
    pub failed: usize,
    /// Human-readable per-row and per-phase diagnostics.
    pub errors: Vec<String>,
    /// Path of the skipped-rows CSV, when one was produced.
    pub failed_rows_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Accumulates failures and skipped references while an orchestrator runs.
#[derive(Debug, Default)]
pub struct ResultReporter {
    errors: Vec<String>,
    failed: usize,
    skipped: Vec<UnresolvedRow>,
}

impl ResultReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row that failed validation or normalization.
    pub fn row_failed(&mut self, row_number: usize, reason: impl std::fmt::Display) {
        self.failed += 1;
        self.errors.push(format!("row {row_number}: {reason}"));
    }

    /// Record one row skipped by the referential precheck.
    pub fn reference_skipped(&mut self, row: UnresolvedRow) {
        self.failed += 1;
        self.errors.push(format!(
            "row {}: unresolved {} '{}' ({})",
            row.row_number, row.label, row.reference, row.reason
        ));
        self.skipped.push(row);
    }

    /// Absorb the exact per-row errors reported by the bulk executor's
    /// row-level fallback.
    pub fn absorb_row_errors(&mut self, errors: &[RowError]) {
        for err in errors {
            self.row_failed(err.source_row, &err.message);
        }
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Write the skipped-reference CSV, if rows were skipped and a
    /// directory is configured. Returns the file path on success; write
    /// failures are logged and swallowed (the export is a convenience,
    /// not part of the result contract).
    pub fn export_skipped(&self, dir: Option<&Path>, entity: &str) -> Option<String> {
        let dir = dir?;
        if self.skipped.is_empty() {
            return None;
        }
        let path = dir.join(format!(
            "{entity}-skipped-{}.csv",
            Utc::now().format("%Y%m%d%H%M%S")
        ));
        match write_skipped_csv(&path, &self.skipped) {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to write skipped-rows export");
                None
            }
        }
    }

    /// Seal the reporter into the immutable result.
    pub fn finish(self, written: usize, failed_rows_path: Option<String>) -> ImportResult {
        ImportResult {
            success: self.failed == 0,
            count: written,
            failed: self.failed,
            errors: self.errors,
            failed_rows_path,
        }
    }
}

fn write_skipped_csv(path: &Path, rows: &[UnresolvedRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["row_number", "reference_id", "reference_label", "reason"])?;
    for row in rows {
        let row_number = row.row_number.to_string();
        writer.write_record([row_number.as_str(), &row.reference, &row.label, &row.reason])?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped_row(n: usize) -> UnresolvedRow {
        UnresolvedRow {
            row_number: n,
            reference: "Ghost Item".to_string(),
            label: "product".to_string(),
            reason: "not found".to_string(),
        }
    }

    #[test]
    fn clean_run_is_success() {
        let reporter = ResultReporter::new();
        let result = reporter.finish(5, None);
        assert!(result.success);
        assert_eq!(result.count, 5);
        assert_eq!(result.failed, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn failures_accumulate() {
        let mut reporter = ResultReporter::new();
        reporter.row_failed(3, "no numeric amount");
        reporter.reference_skipped(skipped_row(7));
        let result = reporter.finish(8, None);
        assert!(!result.success);
        assert_eq!(result.failed, 2);
        assert_eq!(result.count, 8);
        assert!(result.errors[0].contains("row 3"));
        assert!(result.errors[1].contains("Ghost Item"));
    }

    #[test]
    fn export_requires_directory_and_rows() {
        let mut reporter = ResultReporter::new();
        assert!(reporter.export_skipped(None, "sales").is_none());
        reporter.reference_skipped(skipped_row(1));
        assert!(reporter.export_skipped(None, "sales").is_none());
    }

    #[test]
    fn export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = ResultReporter::new();
        reporter.reference_skipped(skipped_row(4));
        let path = reporter
            .export_skipped(Some(dir.path()), "sales")
            .expect("export path");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("row_number,reference_id,reference_label,reason"));
        assert!(contents.contains("4,Ghost Item,product,not found"));
    }
}
