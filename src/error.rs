//! Unified error types for the earkive library.
//!
//! Anticipated structural anomalies inside a package (dangling references,
//! checksum mismatches, unknown metadata types) never surface here; they are
//! recorded in the [`ValidationReport`](crate::report::ValidationReport) and
//! the pipeline carries on. This type covers the conditions that genuinely
//! abort an operation: environment-level I/O failures, unusable destinations,
//! and cooperative cancellation.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for earkive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error unrelated to the package's own structure (e.g. disk full)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A description document is structurally unusable (no root element,
    /// truncated element tree)
    #[error("Description document error: {0}")]
    DescriptionDocument(String),

    /// XML reading/writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// The operation was cancelled through its [`CancelToken`](crate::cancel::CancelToken).
    ///
    /// Distinct from every structural outcome: the caller must discard any
    /// partial parse or build output.
    #[error("Operation cancelled")]
    Cancelled,

    /// A build was asked to produce an unsupported combination
    /// (e.g. building a package in the legacy import-only profile)
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Destination problems when promoting a staged container
    #[error("Container destination not usable: {}", .0.display())]
    Destination(PathBuf),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        Error::Xml(e.to_string())
    }
}

/// Result type for earkive operations.
pub type Result<T> = std::result::Result<T, Error>;
