//! Accumulating validation report.
//!
//! Every structural anomaly found while reconciling a package is appended
//! here instead of being thrown: the pipeline always returns a (possibly
//! partial) model plus this report. Entries are ordered, append-only, and
//! severity-leveled; overall validity is simply the absence of ERROR entries.
//!
//! Appends go through a lock so the report can be written through shared
//! references, and remains a valid sink if sibling representations are ever
//! resolved concurrently.

use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a validation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One recorded anomaly (or confirmation) with its context.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationEntry {
    severity: Severity,
    /// Stable message code, one of [`codes`].
    code: &'static str,
    message: String,
    /// Short description of the related source object, when one exists.
    related: Option<String>,
    /// Filesystem context, typically the package base path and the offending file.
    paths: Vec<PathBuf>,
    /// Underlying cause, flattened to text.
    cause: Option<String>,
}

impl ValidationEntry {
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            related: None,
            paths: Vec::new(),
            cause: None,
        }
    }

    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warn(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, code, message)
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Attach a filesystem path for context. May be called more than once.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Attach a short description of the related source object.
    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related = Some(related.into());
        self
    }

    /// Attach the underlying cause, flattened to text.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn related(&self) -> Option<&str> {
        self.related.as_deref()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

/// Ordered, append-only sequence of validation entries.
///
/// Owned by the package it describes; shared by reference across one pipeline
/// invocation. No entry is ever removed.
#[derive(Debug, Default)]
pub struct ValidationReport {
    entries: Mutex<Vec<ValidationEntry>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn add(&self, entry: ValidationEntry) {
        self.entries.lock().push(entry);
    }

    /// Whether no ERROR entry has been recorded.
    pub fn is_valid(&self) -> bool {
        !self
            .entries
            .lock()
            .iter()
            .any(|e| e.severity() == Severity::Error)
    }

    /// Snapshot of all entries, in append order.
    pub fn entries(&self) -> Vec<ValidationEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity() == severity)
            .count()
    }

    /// Whether an entry with this code was recorded.
    pub fn has_code(&self, code: &str) -> bool {
        self.entries.lock().iter().any(|e| e.code() == code)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.lock().serialize(serializer)
    }
}

/// Stable message codes used across the pipeline.
pub mod codes {
    pub const MAIN_DOC_FOUND: &str = "MAIN_DOC_FOUND";
    pub const MAIN_DOC_NOT_FOUND: &str = "MAIN_DOC_NOT_FOUND";
    pub const MAIN_DOC_IS_VALID: &str = "MAIN_DOC_IS_VALID";
    pub const MAIN_DOC_NOT_VALID: &str = "MAIN_DOC_NOT_VALID";
    pub const STRUCT_MAP_FOUND: &str = "STRUCT_MAP_FOUND";
    pub const STRUCT_MAP_NOT_FOUND: &str = "STRUCT_MAP_NOT_FOUND";

    pub const REPRESENTATION_DOC_FOUND: &str = "REPRESENTATION_DOC_FOUND";
    pub const REPRESENTATION_DOC_NOT_FOUND: &str = "REPRESENTATION_DOC_NOT_FOUND";
    pub const REPRESENTATION_DOC_NOT_VALID: &str = "REPRESENTATION_DOC_NOT_VALID";
    pub const REPRESENTATION_TYPE_NOT_VALID: &str = "REPRESENTATION_TYPE_NOT_VALID";
    pub const REPRESENTATION_FILE_FOUND: &str = "REPRESENTATION_FILE_FOUND";
    pub const REPRESENTATION_FILE_NOT_FOUND: &str = "REPRESENTATION_FILE_NOT_FOUND";
    pub const REPRESENTATION_FILE_HAS_NO_LOCATION: &str = "REPRESENTATION_FILE_HAS_NO_LOCATION";
    pub const REPRESENTATION_HAS_NO_FILES: &str = "REPRESENTATION_HAS_NO_FILES";
    pub const REPRESENTATION_HAS_NO_METADATA: &str = "REPRESENTATION_HAS_NO_METADATA";
    pub const DUPLICATE_REPRESENTATION_ID: &str = "DUPLICATE_REPRESENTATION_ID";
    pub const NO_REPRESENTATIONS_FOUND: &str = "NO_REPRESENTATIONS_FOUND";

    pub const METADATA_FILE_FOUND: &str = "METADATA_FILE_FOUND";
    pub const METADATA_FILE_NOT_FOUND: &str = "METADATA_FILE_NOT_FOUND";
    pub const METADATA_POINTERS_NOT_FOUND: &str = "METADATA_POINTERS_NOT_FOUND";
    pub const UNKNOWN_DESCRIPTIVE_METADATA_TYPE: &str = "UNKNOWN_DESCRIPTIVE_METADATA_TYPE";
    pub const LEGACY_EXPEDIENT_FALLBACK: &str = "LEGACY_EXPEDIENT_FALLBACK";
    pub const LEGACY_METADATA_UNCLASSIFIED: &str = "LEGACY_METADATA_UNCLASSIFIED";
    pub const INLINE_METADATA_NOT_MATERIALIZED: &str = "INLINE_METADATA_NOT_MATERIALIZED";

    pub const SCHEMA_FILE_FOUND: &str = "SCHEMA_FILE_FOUND";
    pub const SCHEMA_FILE_NOT_FOUND: &str = "SCHEMA_FILE_NOT_FOUND";
    pub const DOCUMENTATION_FILE_FOUND: &str = "DOCUMENTATION_FILE_FOUND";
    pub const DOCUMENTATION_FILE_NOT_FOUND: &str = "DOCUMENTATION_FILE_NOT_FOUND";
    pub const SUBMISSION_FILE_FOUND: &str = "SUBMISSION_FILE_FOUND";
    pub const SUBMISSION_FILE_NOT_FOUND: &str = "SUBMISSION_FILE_NOT_FOUND";
    pub const SUBMISSION_IGNORED_FOR_ROLE: &str = "SUBMISSION_IGNORED_FOR_ROLE";

    pub const CHECKSUM_MISMATCH: &str = "CHECKSUM_MISMATCH";
    pub const CHECKSUM_ALGORITHM_UNKNOWN: &str = "CHECKSUM_ALGORITHM_UNKNOWN";
    pub const CHECKSUM_NOT_COMPUTABLE: &str = "CHECKSUM_NOT_COMPUTABLE";
}

/// `(found, missing)` code pair for a zone name, so the same resolution step
/// can run for metadata, schemas, documentation and submission zones.
pub fn zone_file_codes(zone: &str) -> (&'static str, &'static str) {
    match zone {
        z if z.eq_ignore_ascii_case("schemas") => {
            (codes::SCHEMA_FILE_FOUND, codes::SCHEMA_FILE_NOT_FOUND)
        }
        z if z.eq_ignore_ascii_case("documentation") => (
            codes::DOCUMENTATION_FILE_FOUND,
            codes::DOCUMENTATION_FILE_NOT_FOUND,
        ),
        z if z.eq_ignore_ascii_case("submission") => (
            codes::SUBMISSION_FILE_FOUND,
            codes::SUBMISSION_FILE_NOT_FOUND,
        ),
        _ => (codes::METADATA_FILE_FOUND, codes::METADATA_FILE_NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.is_empty());
    }

    #[test]
    fn test_warn_entries_keep_report_valid() {
        let report = ValidationReport::new();
        report.add(ValidationEntry::warn(
            codes::REPRESENTATION_HAS_NO_FILES,
            "representation has no files",
        ));
        assert!(report.is_valid());
        assert_eq!(report.count(Severity::Warn), 1);
    }

    #[test]
    fn test_error_entry_invalidates_report() {
        let report = ValidationReport::new();
        report.add(ValidationEntry::info(codes::MAIN_DOC_FOUND, "found"));
        report.add(
            ValidationEntry::error(codes::CHECKSUM_MISMATCH, "digest mismatch")
                .with_path("/tmp/ip/data/a.bin")
                .with_related("file a.bin"),
        );
        assert!(!report.is_valid());
        assert_eq!(report.len(), 2);
        // order preserved
        let entries = report.entries();
        assert_eq!(entries[0].code(), codes::MAIN_DOC_FOUND);
        assert_eq!(entries[1].code(), codes::CHECKSUM_MISMATCH);
        assert_eq!(entries[1].paths().len(), 1);
    }

    #[test]
    fn test_appends_through_shared_reference() {
        let report = ValidationReport::new();
        let r = &report;
        r.add(ValidationEntry::info(codes::MAIN_DOC_FOUND, "a"));
        r.add(ValidationEntry::info(codes::STRUCT_MAP_FOUND, "b"));
        assert_eq!(report.len(), 2);
    }
}
