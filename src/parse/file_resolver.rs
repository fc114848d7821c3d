//! Turns declared file references into verified [`IPFile`] handles.
//!
//! Absence and integrity failures never propagate as errors; they surface as
//! report entries and an empty result, so one bad file costs exactly one
//! model entry and nothing else.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::checksum::{self, IntegrityError};
use crate::mets::HrefEncoding;
use crate::model::file::{relative_folders, IPFile};
use crate::report::{codes, ValidationEntry, ValidationReport};

/// What a description document claims about one file.
#[derive(Debug, Clone, Default)]
pub struct DeclaredFile<'a> {
    pub href: &'a str,
    pub checksum: Option<&'a str>,
    pub checksum_type: Option<&'a str>,
    pub mimetype: Option<&'a str>,
    pub size: Option<u64>,
    pub created: Option<&'a str>,
    /// Identifier of the declaring element, for report context.
    pub id: Option<&'a str>,
}

/// Report codes for one resolution: (found INFO, not-found ERROR).
pub type FileCodes = (&'static str, &'static str);

/// Resolve one declared file against `base_path`.
///
/// `zone_root` anchors the relative-folder computation that preserves
/// subfolder layout across a rebuild. Missing file and checksum failure both
/// emit ERROR and yield `None`; success emits the INFO code and the populated
/// handle.
pub fn resolve(
    base_path: &Path,
    zone_root: &Path,
    declared: &DeclaredFile<'_>,
    encoding: HrefEncoding,
    report: &ValidationReport,
    (found_code, not_found_code): FileCodes,
) -> Option<IPFile> {
    let relative = encoding.decode(declared.href);
    let path = base_path.join(relative.as_ref());

    if !path.is_file() {
        let mut entry = ValidationEntry::error(not_found_code, "referenced file does not exist")
            .with_path(base_path)
            .with_path(&path);
        if let Some(id) = declared.id {
            entry = entry.with_related(id);
        }
        report.add(entry);
        return None;
    }

    if let Some(declared_digest) = declared.checksum {
        let algorithm = declared.checksum_type.unwrap_or_default();
        match checksum::verify(&path, algorithm, declared_digest) {
            Ok(()) => {}
            Err(err) => {
                report.add(integrity_entry(&err, &path, declared.id));
                return None;
            }
        }
    }

    let mut file = IPFile::new(&path)
        .with_relative_folders(relative_folders(zone_root, &path));
    if let (Some(algorithm), Some(digest)) = (declared.checksum_type, declared.checksum) {
        file = file.with_checksum(algorithm, digest);
    }
    if let Some(mimetype) = declared.mimetype {
        file = file.with_mimetype(mimetype);
    }
    if let Some(size) = declared.size {
        file = file.with_size(size);
    }
    if let Some(created) = declared.created.and_then(parse_timestamp) {
        file = file.with_created(created);
    }

    report.add(
        ValidationEntry::info(found_code, "file found and verified")
            .with_path(base_path)
            .with_path(&path),
    );
    Some(file)
}

fn integrity_entry(err: &IntegrityError, path: &Path, id: Option<&str>) -> ValidationEntry {
    let code = match err {
        IntegrityError::UnknownAlgorithm(_) => codes::CHECKSUM_ALGORITHM_UNKNOWN,
        IntegrityError::Mismatch { .. } => codes::CHECKSUM_MISMATCH,
        IntegrityError::Io(_) => codes::CHECKSUM_NOT_COMPUTABLE,
    };
    let mut entry = ValidationEntry::error(code, "file integrity verification failed")
        .with_path(path)
        .with_cause(err);
    if let Some(id) = id {
        entry = entry.with_related(id);
    }
    entry
}

/// Lenient timestamp parse for declared creation dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
