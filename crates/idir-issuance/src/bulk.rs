//! Two-phase bulk import.
//!
//! Phase one reads and validates the whole batch. If any row is invalid the
//! batch is rejected with every problem listed and nothing is issued. Phase two
//! issues the validated rows one at a time, each in its own transaction, and
//! keeps going past individual failures.
//!
//! ```rust,no_run
//! use idir_issuance::bulk::{self, ImportOptions};
//! use idir_issuance::IssuanceService;
//! use idir_store::{Store, StoreConfig};
//! use std::path::Path;
//!
//! let service = IssuanceService::new(Store::open(&StoreConfig::default())?);
//! let rows = bulk::read_csv_path(Path::new("completions.csv"))?;
//! let batch = bulk::validate(rows, &ImportOptions::default())?;
//! let report = batch.issue_all(&service);
//! println!("{} issued, {} failed", report.succeeded(), report.failed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use idir_canonical::{normalize_email, HexDigest, ValidationError};
use idir_core::{id_prefix, normalize_date, require_text, validate_email, Actor, CertificateId, DateInput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::error::ErrorCategory;
use crate::input::IssueInput;
use crate::service::IssuanceService;

/// Columns every import file must have.
pub const REQUIRED_COLUMNS: [&str; 4] = ["student_name", "student_email", "course_title", "completed_at"];
/// Optional column.
pub const OPTIONAL_COLUMNS: [&str; 1] = ["course_id"];

/// One CSV data row as read, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    /// CSV line number of the row (the header is line 1).
    #[serde(skip)]
    pub line: u64,
    /// Student name.
    pub student_name: String,
    /// Student email.
    pub student_email: String,
    /// Course title.
    pub course_title: String,
    /// Completion date.
    pub completed_at: String,
    /// Optional course identifier.
    #[serde(default)]
    pub course_id: Option<String>,
}

/// A validation problem on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// CSV line number.
    pub line: u64,
    /// Offending field.
    pub field: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.field, self.message)
    }
}

impl RowError {
    fn from_validation(line: u64, err: &ValidationError) -> Self {
        Self {
            line,
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors that reject a batch before anything is issued.
#[derive(Error, Debug)]
pub enum BulkError {
    /// The file could not be opened.
    #[error("failed to open {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The CSV could not be parsed.
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Required columns are absent from the header.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// The file has a header but no data rows.
    #[error("no rows to import")]
    Empty,
    /// One or more rows failed validation.
    #[error("{} row error(s); nothing was issued", .0.len())]
    Invalid(Vec<RowError>),
}

/// Batch-wide settings.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Actor recorded on every issued certificate.
    pub actor: Actor,
}

/// Reads an import file.
pub fn read_csv_path(path: &Path) -> Result<Vec<ImportRow>, BulkError> {
    let file = File::open(path).map_err(|source| BulkError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv(file)
}

/// Reads import rows from CSV text.
///
/// The header is checked for the required columns before any row is read.
/// Header names are trimmed; unknown columns are ignored.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ImportRow>, BulkError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(BulkError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let mut row: ImportRow = record.deserialize(Some(&headers))?;
        row.line = line;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(BulkError::Empty);
    }
    Ok(rows)
}

/// A row that passed validation.
#[derive(Debug, Clone)]
pub struct PlannedRow {
    /// CSV line number.
    pub line: u64,
    /// Issuance input built from the row.
    pub input: IssueInput,
}

/// A fully validated batch, ready to issue.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    rows: Vec<PlannedRow>,
}

/// Validates every row and either returns the whole batch or every problem found.
///
/// Checks presence of name and title, email syntax, that the completion date
/// parses, and that no student/course pair (normalized email, case-folded
/// title) appears twice.
pub fn validate(rows: Vec<ImportRow>, options: &ImportOptions) -> Result<ValidatedBatch, BulkError> {
    let mut errors = Vec::new();
    let mut planned = Vec::with_capacity(rows.len());
    let mut seen: HashMap<(String, String), u64> = HashMap::new();

    for row in rows {
        let line = row.line;
        let before = errors.len();

        let name = require_text(&row.student_name, "student_name")
            .map_err(|e| errors.push(RowError::from_validation(line, &e)))
            .ok();
        let email = validate_email(&row.student_email)
            .map_err(|e| errors.push(RowError::from_validation(line, &e)))
            .ok();
        let title = require_text(&row.course_title, "course_title")
            .map_err(|e| errors.push(RowError::from_validation(line, &e)))
            .ok();
        let completed_at = normalize_date(&DateInput::from(row.completed_at.trim()), "completed_at")
            .map_err(|e| errors.push(RowError::from_validation(line, &e)))
            .ok();

        if let (Some(email), Some(title)) = (&email, &title) {
            let key = (normalize_email(email), title.to_lowercase());
            if let Some(first) = seen.get(&key) {
                errors.push(RowError {
                    line,
                    field: "student_email".to_string(),
                    message: format!("duplicate of line {first} for the same course"),
                });
            } else {
                seen.insert(key, line);
            }
        }

        if errors.len() > before {
            continue;
        }
        if let (Some(name), Some(email), Some(title), Some(completed_at)) = (name, email, title, completed_at) {
            let mut input = IssueInput::new(name, email, title, completed_at.as_str())
                .with_actor(options.actor.clone());
            input.course_id = row
                .course_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty());
            planned.push(PlannedRow { line, input });
        }
    }

    if !errors.is_empty() {
        tracing::warn!(errors = errors.len(), "bulk import rejected during validation");
        return Err(BulkError::Invalid(errors));
    }
    Ok(ValidatedBatch { rows: planned })
}

/// One line of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// CSV line number.
    pub line: u64,
    /// Student name.
    pub student_full_name: String,
    /// Course title.
    pub course_title: String,
    /// Course identifier, when given.
    pub course_id: Option<String>,
    /// Certificate-ID prefix the row would receive.
    pub id_prefix: String,
}

/// What a batch would issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPlan {
    /// One entry per row.
    pub entries: Vec<PlanEntry>,
}

/// Issuance outcome of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RowResult {
    /// Certificate issued.
    Issued {
        /// Minted ID.
        certificate_id: CertificateId,
        /// Payload hash.
        payload_hash: HexDigest,
    },
    /// Issuance failed; later rows were still attempted.
    Failed {
        /// Error category.
        category: ErrorCategory,
        /// Error message.
        message: String,
    },
}

/// Report line for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    /// CSV line number.
    pub line: u64,
    /// Student name.
    pub student_full_name: String,
    /// Course title.
    pub course_title: String,
    /// What happened.
    #[serde(flatten)]
    pub result: RowResult,
}

/// Per-row results of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Outcomes in input order.
    pub rows: Vec<RowOutcome>,
}

impl ImportReport {
    /// Rows that were issued.
    pub fn succeeded(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.result, RowResult::Issued { .. }))
            .count()
    }

    /// Rows that failed.
    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    /// Returns true if any row failed.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

impl ValidatedBatch {
    /// Validated rows in input order.
    pub fn rows(&self) -> &[PlannedRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The would-be issuance plan. Touches no storage.
    pub fn plan(&self) -> ImportPlan {
        ImportPlan {
            entries: self
                .rows
                .iter()
                .map(|row| PlanEntry {
                    line: row.line,
                    student_full_name: row.input.student_full_name.clone(),
                    course_title: row.input.course_title.clone(),
                    course_id: row.input.course_id.clone(),
                    id_prefix: id_prefix(&row.input.course_title, &row.input.segments),
                })
                .collect(),
        }
    }

    /// Issues every row sequentially, one transaction per row.
    pub fn issue_all(&self, service: &IssuanceService) -> ImportReport {
        let mut report = ImportReport::default();
        for row in &self.rows {
            let result = match service.issue(&row.input) {
                Ok(issued) => {
                    tracing::info!(row = row.line, certificate_id = %issued.certificate_id, "row issued");
                    RowResult::Issued {
                        certificate_id: issued.certificate_id,
                        payload_hash: issued.payload_hash,
                    }
                }
                Err(err) => {
                    tracing::warn!(row = row.line, category = %err.category(), error = %err, "row failed");
                    RowResult::Failed {
                        category: err.category(),
                        message: err.to_string(),
                    }
                }
            };
            report.rows.push(RowOutcome {
                line: row.line,
                student_full_name: row.input.student_full_name.clone(),
                course_title: row.input.course_title.clone(),
                result,
            });
        }
        tracing::info!(
            issued = report.succeeded(),
            failed = report.failed(),
            "bulk import finished"
        );
        report
    }
}
