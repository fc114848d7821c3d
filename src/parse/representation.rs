//! Representation reconciliation.
//!
//! The common profile keeps one nested description document per
//! representation, pointed at from the package structural map. The legacy
//! profile keeps everything in the main document and yields exactly one
//! representation, so both paths converge on the same model type.

use std::path::Path;

use crate::mets::{reader, Div, FileEntry, FileRef, HrefEncoding, Mets, MAIN_DOCUMENT_NAME};
use crate::model::content_type::split_representation_type;
use crate::model::{InformationPackage, Representation, RepresentationStatus};
use crate::parse::file_resolver::{self, DeclaredFile, FileCodes};
use crate::parse::metadata_resolver;
use crate::parse::walker::{self, ZoneMap};
use crate::parse::ParseOptions;
use crate::profile::{zone, Profile};
use crate::report::{codes, zone_file_codes, ValidationEntry, ValidationReport};
use crate::Result;

/// Reconcile every representation declared in the representations zone of
/// the main document.
///
/// Only cancellation propagates as an error. Every structural defect of an
/// individual representation costs report entries and at most that one
/// representation.
pub fn process_representations(
    zones: &ZoneMap<'_>,
    package: &mut InformationPackage,
    base_path: &Path,
    options: &ParseOptions,
    report: &ValidationReport,
) -> Result<()> {
    let Some(reps_div) = zones.representations else {
        return Ok(());
    };

    for (index, rep_div) in reps_div.children.iter().enumerate() {
        options.cancel.check()?;

        let rep_id = rep_div
            .label
            .clone()
            .unwrap_or_else(|| format!("rep{}", index + 1));
        if package.has_representation(&rep_id) {
            report.add(
                ValidationEntry::warn(
                    codes::DUPLICATE_REPRESENTATION_ID,
                    format!("representation identifier is not unique: {rep_id}"),
                )
                .with_path(base_path),
            );
        }
        let representation =
            process_one_representation(&rep_id, rep_div, base_path, options, report)?;
        package.add_representation(representation);
    }

    Ok(())
}

fn process_one_representation(
    rep_id: &str,
    rep_div: &Div,
    base_path: &Path,
    options: &ParseOptions,
    report: &ValidationReport,
) -> Result<Representation> {
    let mut representation = Representation::new(rep_id);

    // The nested document is located by the mptr; packages written without
    // one fall back to the conventional location.
    let doc_path = match rep_div.doc_pointers.first() {
        Some(href) => base_path.join(options.href_encoding.decode(href).as_ref()),
        None => base_path
            .join(zone::REPRESENTATIONS)
            .join(rep_id)
            .join(MAIN_DOCUMENT_NAME),
    };
    if !doc_path.is_file() {
        report.add(
            ValidationEntry::error(
                codes::REPRESENTATION_DOC_NOT_FOUND,
                "representation description document does not exist",
            )
            .with_related(rep_id)
            .with_path(&doc_path),
        );
        return Ok(representation);
    }

    let rep_mets = match reader::parse_file(&doc_path) {
        Ok(mets) => {
            report.add(
                ValidationEntry::info(
                    codes::REPRESENTATION_DOC_FOUND,
                    "representation description document found",
                )
                .with_related(rep_id)
                .with_path(&doc_path),
            );
            mets
        }
        Err(err) => {
            report.add(
                ValidationEntry::error(
                    codes::REPRESENTATION_DOC_NOT_VALID,
                    "representation description document could not be parsed",
                )
                .with_related(rep_id)
                .with_path(&doc_path)
                .with_cause(&err),
            );
            return Ok(representation);
        }
    };
    let rep_base = doc_path.parent().unwrap_or(base_path).to_path_buf();

    if let Some(attr) = rep_mets.type_attr.as_deref() {
        match split_representation_type(attr) {
            Ok(Some(content_type)) => representation.set_content_type(content_type),
            Ok(None) => {}
            Err(reason) => {
                report.add(
                    ValidationEntry::warn(codes::REPRESENTATION_TYPE_NOT_VALID, reason)
                        .with_related(rep_id)
                        .with_path(&doc_path),
                );
            }
        }
    }

    if let Some(header) = &rep_mets.header {
        for agent in &header.agents {
            representation.add_agent(crate::parse::convert_agent(agent));
        }
    }

    let rep_zones = walker::classify(&rep_mets, Profile::CommonSpec, report, &doc_path);
    if let Some(main) = rep_zones.main {
        representation.set_status(RepresentationStatus::parse(main.type_attr.as_deref()));
        if let Some(id) = &main.id {
            representation.set_object_id(id);
        }
    }

    let metadata = metadata_resolver::collect_metadata(
        &rep_mets,
        &rep_zones,
        &rep_base,
        options.href_encoding,
        &options.cancel,
        report,
    )?;
    for item in metadata.descriptive {
        representation.add_descriptive_metadata(item);
    }
    for item in metadata.preservation {
        representation.add_preservation_metadata(item);
    }
    for item in metadata.other {
        representation.add_other_metadata(item);
    }
    if representation.descriptive_metadata().is_empty()
        && representation.preservation_metadata().is_empty()
        && representation.other_metadata().is_empty()
    {
        report.add(
            ValidationEntry::warn(
                codes::REPRESENTATION_HAS_NO_METADATA,
                "representation carries no metadata of any kind",
            )
            .with_related(rep_id)
            .with_path(&doc_path),
        );
    }

    if let Some(data_div) = rep_zones.data {
        let files = resolve_file_pointers(
            &rep_mets,
            &data_div.all_file_pointers(),
            &rep_base,
            &rep_base.join(zone::DATA),
            options,
            report,
            (
                codes::REPRESENTATION_FILE_FOUND,
                codes::REPRESENTATION_FILE_NOT_FOUND,
            ),
        )?;
        for file in files {
            representation.add_file(file);
        }
    }
    if let Some(schemas_div) = rep_zones.schemas {
        let files = resolve_file_pointers(
            &rep_mets,
            &schemas_div.all_file_pointers(),
            &rep_base,
            &rep_base.join(zone::SCHEMAS),
            options,
            report,
            zone_file_codes(zone::SCHEMAS),
        )?;
        for file in files {
            representation.add_schema(file);
        }
    }
    if let Some(doc_div) = rep_zones.documentation {
        let files = resolve_file_pointers(
            &rep_mets,
            &doc_div.all_file_pointers(),
            &rep_base,
            &rep_base.join(zone::DOCUMENTATION),
            options,
            report,
            zone_file_codes(zone::DOCUMENTATION),
        )?;
        for file in files {
            representation.add_documentation(file);
        }
    }

    if representation.data().is_empty() {
        report.add(
            ValidationEntry::warn(
                codes::REPRESENTATION_HAS_NO_FILES,
                "representation has no data files",
            )
            .with_related(rep_id)
            .with_path(&doc_path),
        );
    }

    Ok(representation)
}

/// Reconcile the single representation of a legacy package.
///
/// Legacy documents keep all metadata inline in the main document; the
/// division's `DMDID` references carry its descriptive metadata and its file
/// pointers carry the payload, resolved against the package root without a
/// payload folder.
pub fn process_legacy_representation(
    mets: &Mets,
    zones: &ZoneMap<'_>,
    package: &mut InformationPackage,
    base_path: &Path,
    options: &ParseOptions,
    report: &ValidationReport,
) -> Result<()> {
    let Some(rep_div) = zones.representations else {
        return Ok(());
    };
    options.cancel.check()?;

    let rep_id = rep_div.label.clone().unwrap_or_else(|| "rep1".to_string());
    let mut representation = Representation::new(&rep_id);

    for dmd_id in &rep_div.dmd_ids {
        options.cancel.check()?;
        match mets.find_md_section(dmd_id) {
            Some(section) => {
                if let Some(metadata) = metadata_resolver::resolve_legacy_section(
                    section,
                    base_path,
                    options.href_encoding,
                    report,
                ) {
                    representation.add_descriptive_metadata(metadata);
                }
            }
            None => {
                report.add(
                    ValidationEntry::error(
                        codes::METADATA_FILE_NOT_FOUND,
                        "division references no known metadata section",
                    )
                    .with_related(dmd_id)
                    .with_path(base_path),
                );
            }
        }
    }

    let pointers = legacy_file_pointers(rep_div);
    let files = resolve_file_pointers(
        mets,
        &pointers,
        base_path,
        base_path,
        options,
        report,
        (
            codes::REPRESENTATION_FILE_FOUND,
            codes::REPRESENTATION_FILE_NOT_FOUND,
        ),
    )?;
    for file in files {
        representation.add_file(file);
    }

    if representation.data().is_empty() {
        report.add(
            ValidationEntry::warn(
                codes::REPRESENTATION_HAS_NO_FILES,
                "representation has no data files",
            )
            .with_related(rep_id.as_str())
            .with_path(base_path),
        );
    }

    package.add_representation(representation);
    Ok(())
}

/// The division's own pointers win; otherwise its children supply them.
fn legacy_file_pointers(div: &Div) -> Vec<&str> {
    if !div.file_pointers.is_empty() {
        return div.file_pointers.iter().map(String::as_str).collect();
    }
    div.children
        .iter()
        .flat_map(|child| child.file_pointers.iter().map(String::as_str))
        .collect()
}

/// Resolve structural-map file pointers into verified files.
///
/// A pointer may target a single file entry or a whole file group; both
/// shapes flatten into the same list. Entries without a location and
/// pointers that resolve to nothing each cost one ERROR.
pub(crate) fn resolve_file_pointers(
    mets: &Mets,
    pointers: &[&str],
    base_path: &Path,
    zone_root: &Path,
    options: &ParseOptions,
    report: &ValidationReport,
    codes_pair: FileCodes,
) -> Result<Vec<crate::model::IPFile>> {
    let mut files = Vec::new();
    for id in pointers {
        options.cancel.check()?;
        match mets.resolve_file_ref(id) {
            Some(FileRef::Single(entry)) => {
                if let Some(file) =
                    resolve_entry(entry, base_path, zone_root, options.href_encoding, report, codes_pair)
                {
                    files.push(file);
                }
            }
            Some(FileRef::Group(group)) => {
                for entry in group.all_files() {
                    options.cancel.check()?;
                    if let Some(file) = resolve_entry(
                        entry,
                        base_path,
                        zone_root,
                        options.href_encoding,
                        report,
                        codes_pair,
                    ) {
                        files.push(file);
                    }
                }
            }
            Some(FileRef::Metadata(_)) | None => {
                report.add(
                    ValidationEntry::error(
                        codes_pair.1,
                        "file pointer references no known file entry",
                    )
                    .with_related(*id)
                    .with_path(base_path),
                );
            }
        }
    }
    Ok(files)
}

fn resolve_entry(
    entry: &FileEntry,
    base_path: &Path,
    zone_root: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
    codes_pair: FileCodes,
) -> Option<crate::model::IPFile> {
    let Some(href) = entry.href() else {
        report.add(
            ValidationEntry::error(
                codes::REPRESENTATION_FILE_HAS_NO_LOCATION,
                "file entry declares no location",
            )
            .with_related(entry.id.clone().unwrap_or_default())
            .with_path(base_path),
        );
        return None;
    };
    let declared = DeclaredFile {
        href,
        checksum: entry.checksum.as_deref(),
        checksum_type: entry.checksum_type.as_deref(),
        mimetype: entry.mimetype.as_deref(),
        size: entry.size,
        created: entry.created.as_deref(),
        id: entry.id.as_deref(),
    };
    file_resolver::resolve(base_path, zone_root, &declared, encoding, report, codes_pair)
}
