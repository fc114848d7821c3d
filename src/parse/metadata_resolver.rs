//! Turns metadata sections into classified, dated metadata records.
//!
//! Direct references resolve through the file resolver. Inline sections (the
//! legacy profile embeds metadata bodies in the document itself) are first
//! materialized to a standalone file under the metadata zone, then resolved
//! through the same path as everything else.

use std::fs;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::mets::{Div, HrefEncoding, MdRef, MdSection, MdWrap, Mets};
use crate::model::metadata::{DescriptiveMetadata, MetadataRecord};
use crate::model::metadata_type::{MetadataCategory, MetadataType};
use crate::parse::file_resolver::{self, DeclaredFile};
use crate::parse::walker::ZoneMap;
use crate::profile::{self, zone};
use crate::report::{codes, ValidationEntry, ValidationReport};
use crate::Result;

/// Which metadata zone a record belongs to, with its on-disk folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataZone {
    Descriptive,
    Preservation,
    Other,
}

impl MetadataZone {
    pub fn folder(&self) -> &'static str {
        match self {
            MetadataZone::Descriptive => zone::DESCRIPTIVE,
            MetadataZone::Preservation => zone::PRESERVATION,
            MetadataZone::Other => zone::OTHER,
        }
    }
}

/// Resolve a descriptive metadata reference into a record.
pub fn resolve_descriptive(
    md_ref: &MdRef,
    base_path: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
) -> Option<DescriptiveMetadata> {
    let file = resolve_referenced_file(md_ref, MetadataZone::Descriptive, base_path, encoding, report)?;
    let metadata_type = declared_type(md_ref.md_type.as_deref(), md_ref.other_md_type.as_deref());
    if metadata_type.category() == MetadataCategory::Other {
        report.add(
            ValidationEntry::warn(
                codes::UNKNOWN_DESCRIPTIVE_METADATA_TYPE,
                format!("unrecognized descriptive metadata type: {metadata_type}"),
            )
            .with_path(base_path),
        );
    }

    let mut metadata =
        DescriptiveMetadata::new(file, metadata_type, md_ref.md_type_version.clone());
    if let Some(id) = &md_ref.id {
        metadata = metadata.with_id(id);
    }
    if let Some(created) = md_ref
        .created
        .as_deref()
        .and_then(file_resolver::parse_timestamp)
    {
        metadata = metadata.with_created(created);
    }
    Some(metadata)
}

/// Resolve a preservation/other metadata reference into a record.
pub fn resolve_record(
    md_ref: &MdRef,
    metadata_zone: MetadataZone,
    base_path: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
) -> Option<MetadataRecord> {
    let file = resolve_referenced_file(md_ref, metadata_zone, base_path, encoding, report)?;
    let metadata_type = declared_type(md_ref.md_type.as_deref(), md_ref.other_md_type.as_deref());

    let mut record = MetadataRecord::new(file, metadata_type);
    if let Some(id) = &md_ref.id {
        record = record.with_id(id);
    }
    if let Some(created) = md_ref
        .created
        .as_deref()
        .and_then(file_resolver::parse_timestamp)
    {
        record = record.with_created(created);
    }
    Some(record)
}

fn resolve_referenced_file(
    md_ref: &MdRef,
    metadata_zone: MetadataZone,
    base_path: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
) -> Option<crate::model::file::IPFile> {
    let href = md_ref.href.as_deref()?;
    let zone_root = base_path.join(zone::METADATA).join(metadata_zone.folder());
    let declared = DeclaredFile {
        href,
        checksum: md_ref.checksum.as_deref(),
        checksum_type: md_ref.checksum_type.as_deref(),
        mimetype: md_ref.mimetype.as_deref(),
        size: md_ref.size,
        created: md_ref.created.as_deref(),
        id: md_ref.id.as_deref(),
    };
    file_resolver::resolve(
        base_path,
        &zone_root,
        &declared,
        encoding,
        report,
        (codes::METADATA_FILE_FOUND, codes::METADATA_FILE_NOT_FOUND),
    )
}

fn declared_type(md_type: Option<&str>, other_md_type: Option<&str>) -> MetadataType {
    let mut metadata_type = MetadataType::parse(md_type.unwrap_or_default());
    if let Some(other) = other_md_type.map(str::trim).filter(|s| !s.is_empty()) {
        // an OTHER-typed section's secondary type may itself be recognizable
        if metadata_type.category() == MetadataCategory::Other {
            let refined = MetadataType::parse(other);
            if refined.category() != MetadataCategory::Other {
                return refined;
            }
        }
        metadata_type = metadata_type.with_other_type(other);
    }
    metadata_type
}

/// Materialize an inline metadata body to a standalone file under the
/// metadata zone, and hand back the reference the resolver pipeline expects.
///
/// The reference is returned even when nothing could be written, so the
/// ordinary resolution step reports the absence with full context.
pub fn externalize_inline(
    section: &MdSection,
    wrap: &MdWrap,
    metadata_zone: MetadataZone,
    base_path: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
) -> MdRef {
    let id = section
        .id
        .as_deref()
        .or(wrap.id.as_deref())
        .unwrap_or("inline");
    let extension = extension_for(wrap.mimetype.as_deref());
    let mut file_name = id.to_string();
    if !file_name.to_ascii_lowercase().ends_with(&extension) {
        file_name.push_str(&extension);
    }

    let relative = format!(
        "{}/{}/{}",
        zone::METADATA,
        metadata_zone.folder(),
        file_name
    );
    let target = base_path.join(&relative);

    if wrap.xml_data.trim().is_empty() {
        report.add(
            ValidationEntry::warn(
                codes::INLINE_METADATA_NOT_MATERIALIZED,
                "inline metadata section has no content to materialize",
            )
            .with_related(id)
            .with_path(&target),
        );
    } else if let Err(err) = write_inline(&target, &wrap.xml_data) {
        report.add(
            ValidationEntry::warn(
                codes::INLINE_METADATA_NOT_MATERIALIZED,
                "inline metadata could not be written to a standalone file",
            )
            .with_related(id)
            .with_path(&target)
            .with_cause(err),
        );
    }

    let size = fs::metadata(&target).ok().map(|m| m.len());
    MdRef {
        id: Some(id.to_string()),
        href: Some(encoding.encode(&relative)),
        loctype: Some("URL".to_string()),
        md_type: wrap.md_type.clone(),
        other_md_type: wrap.other_md_type.clone(),
        md_type_version: wrap.md_type_version.clone(),
        mimetype: wrap.mimetype.clone(),
        created: wrap.created.clone(),
        size,
        checksum: None,
        checksum_type: None,
    }
}

/// Metadata collected from one document's metadata zones.
#[derive(Debug, Default)]
pub struct ZoneMetadata {
    pub descriptive: Vec<DescriptiveMetadata>,
    pub preservation: Vec<MetadataRecord>,
    pub other: Vec<MetadataRecord>,
}

/// Resolve every metadata pointer in the classified metadata zones of one
/// document. Pointers reference metadata sections by id; a zone division
/// with no pointers at all is an error, an absent division is not.
///
/// The token is consulted before each metadata item, so a cancelled parse
/// stops here even when the package has nothing else to process.
pub fn collect_metadata(
    mets: &Mets,
    zones: &ZoneMap<'_>,
    base_path: &Path,
    encoding: HrefEncoding,
    cancel: &CancelToken,
    report: &ValidationReport,
) -> Result<ZoneMetadata> {
    let mut collected = ZoneMetadata::default();

    if let Some(div) = zones.descriptive {
        for md_ref in zone_references(
            mets,
            div,
            MetadataZone::Descriptive,
            base_path,
            encoding,
            cancel,
            report,
        )? {
            cancel.check()?;
            if let Some(metadata) = resolve_descriptive(&md_ref, base_path, encoding, report) {
                collected.descriptive.push(metadata);
            }
        }
    }
    if let Some(div) = zones.preservation {
        for md_ref in zone_references(
            mets,
            div,
            MetadataZone::Preservation,
            base_path,
            encoding,
            cancel,
            report,
        )? {
            cancel.check()?;
            if let Some(record) =
                resolve_record(&md_ref, MetadataZone::Preservation, base_path, encoding, report)
            {
                collected.preservation.push(record);
            }
        }
    }
    if let Some(div) = zones.other {
        for md_ref in zone_references(
            mets,
            div,
            MetadataZone::Other,
            base_path,
            encoding,
            cancel,
            report,
        )? {
            cancel.check()?;
            if let Some(record) =
                resolve_record(&md_ref, MetadataZone::Other, base_path, encoding, report)
            {
                collected.other.push(record);
            }
        }
    }

    Ok(collected)
}

/// Look up the metadata sections a zone division points at and reduce each
/// to a resolvable reference, externalizing inline bodies on the way.
fn zone_references(
    mets: &Mets,
    div: &Div,
    metadata_zone: MetadataZone,
    base_path: &Path,
    encoding: HrefEncoding,
    cancel: &CancelToken,
    report: &ValidationReport,
) -> Result<Vec<MdRef>> {
    let pointers = div.all_file_pointers();
    if pointers.is_empty() {
        report.add(
            ValidationEntry::error(
                codes::METADATA_POINTERS_NOT_FOUND,
                format!(
                    "{} metadata division carries no metadata pointers",
                    metadata_zone.folder()
                ),
            )
            .with_path(base_path),
        );
        return Ok(Vec::new());
    }

    let mut references = Vec::new();
    for id in pointers {
        cancel.check()?;
        match mets.find_md_section(id) {
            Some(section) => {
                if let Some(md_ref) = &section.md_ref {
                    references.push(md_ref.clone());
                } else if let Some(wrap) = &section.md_wrap {
                    references.push(externalize_inline(
                        section,
                        wrap,
                        metadata_zone,
                        base_path,
                        encoding,
                        report,
                    ));
                }
            }
            None => {
                report.add(
                    ValidationEntry::error(
                        codes::METADATA_FILE_NOT_FOUND,
                        "metadata pointer references no known section",
                    )
                    .with_related(id)
                    .with_path(base_path),
                );
            }
        }
    }
    Ok(references)
}

/// Resolve one legacy metadata section: classify it as document or dossier
/// from its declared type pair, materialize the inline body, and normalize
/// the stored type while keeping the original in the other-type slot.
///
/// `None` means the section stayed unclassified (reported as WARN) or its
/// materialized file failed resolution (reported as ERROR).
pub fn resolve_legacy_section(
    mets_section: &MdSection,
    base_path: &Path,
    encoding: HrefEncoding,
    report: &ValidationReport,
) -> Option<DescriptiveMetadata> {
    let declared_type = mets_section.md_type();
    let declared_other = mets_section.other_md_type();
    let class = profile::classify_legacy_section(declared_type, declared_other);

    match class {
        profile::LegacyClass::Unknown => {
            report.add(
                ValidationEntry::warn(
                    codes::LEGACY_METADATA_UNCLASSIFIED,
                    format!(
                        "metadata section could not be classified (type: {}, other type: {})",
                        declared_type.unwrap_or("-"),
                        declared_other.unwrap_or("-"),
                    ),
                )
                .with_related(mets_section.id.clone().unwrap_or_default())
                .with_path(base_path),
            );
            return None;
        }
        profile::LegacyClass::Expedient { confident: false } => {
            report.add(
                ValidationEntry::warn(
                    codes::LEGACY_EXPEDIENT_FALLBACK,
                    format!(
                        "metadata section classified as dossier by fallback from unrecognized type: {}",
                        declared_other.unwrap_or("-"),
                    ),
                )
                .with_related(mets_section.id.clone().unwrap_or_default())
                .with_path(base_path),
            );
        }
        _ => {}
    }

    let md_ref = match (&mets_section.md_ref, &mets_section.md_wrap) {
        (Some(md_ref), _) => md_ref.clone(),
        (None, Some(wrap)) => externalize_inline(
            mets_section,
            wrap,
            MetadataZone::Descriptive,
            base_path,
            encoding,
            report,
        ),
        (None, None) => return None,
    };

    let normalized = profile::legacy_normalized_type(class, declared_other)?;
    let file = resolve_referenced_file(
        &md_ref,
        MetadataZone::Descriptive,
        base_path,
        encoding,
        report,
    )?;

    let mut metadata = DescriptiveMetadata::new(file, normalized, md_ref.md_type_version.clone());
    if let Some(id) = &md_ref.id {
        metadata = metadata.with_id(id);
    }
    if let Some(created) = md_ref
        .created
        .as_deref()
        .and_then(file_resolver::parse_timestamp)
    {
        metadata = metadata.with_created(created);
    }
    Some(metadata)
}

fn write_inline(target: &Path, xml_data: &str) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, xml_data)
}

/// File extension implied by a declared mimetype, defaulting to `.xml`.
fn extension_for(mimetype: Option<&str>) -> String {
    if let Some(mimetype) = mimetype {
        if let Some(suffix) = mimetype.rsplit('/').next() {
            let suffix = suffix.trim();
            if suffix.len() > 2 {
                return format!(".{}", suffix.to_ascii_lowercase());
            }
        }
    }
    ".xml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mets::MdSectionKind;
    use std::fs;

    fn dc_ref(href: &str) -> MdRef {
        MdRef {
            id: Some("DMD1".into()),
            href: Some(href.into()),
            md_type: Some("DC".into()),
            md_type_version: Some("2002-12-12".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolves_descriptive_reference() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata/descriptive")).unwrap();
        fs::write(dir.path().join("metadata/descriptive/dc.xml"), b"<dc/>").unwrap();

        let report = ValidationReport::new();
        let metadata = resolve_descriptive(
            &dc_ref("metadata/descriptive/dc.xml"),
            dir.path(),
            HrefEncoding::Percent,
            &report,
        )
        .expect("resolves");

        assert_eq!(metadata.metadata_type().category(), MetadataCategory::Dc);
        assert_eq!(metadata.metadata_version(), Some("2002-12-12"));
        assert!(report.is_valid());
        assert!(!report.has_code(codes::UNKNOWN_DESCRIPTIVE_METADATA_TYPE));
    }

    #[test]
    fn test_unknown_descriptive_type_warns_but_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata/descriptive")).unwrap();
        fs::write(dir.path().join("metadata/descriptive/x.xml"), b"<x/>").unwrap();

        let mut md_ref = dc_ref("metadata/descriptive/x.xml");
        md_ref.md_type = Some("HOMEGROWN".into());

        let report = ValidationReport::new();
        let metadata =
            resolve_descriptive(&md_ref, dir.path(), HrefEncoding::Percent, &report).unwrap();
        assert_eq!(metadata.metadata_type().category(), MetadataCategory::Other);
        assert_eq!(metadata.metadata_type().as_str(), "HOMEGROWN");
        assert!(report.has_code(codes::UNKNOWN_DESCRIPTIVE_METADATA_TYPE));
        assert!(report.is_valid());
    }

    #[test]
    fn test_secondary_type_refines_other_sections() {
        let ty = declared_type(Some("OTHER"), Some("Voc_expedient"));
        assert_eq!(ty.category(), MetadataCategory::VocExpedient);

        let kept = declared_type(Some("DC"), Some("local-profile"));
        assert_eq!(kept.category(), MetadataCategory::Dc);
        assert_eq!(kept.other_type(), Some("local-profile"));
    }

    #[test]
    fn test_externalize_inline_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let section = MdSection {
            id: Some("DOC_1".into()),
            ..MdSection::new(MdSectionKind::Descriptive)
        };
        let wrap = MdWrap {
            md_type: Some("OTHER".into()),
            other_md_type: Some("Voc_expedient".into()),
            mimetype: Some("text/xml".into()),
            xml_data: "<voc:exp xmlns:voc=\"urn:x\">v</voc:exp>".into(),
            ..Default::default()
        };

        let report = ValidationReport::new();
        let md_ref = externalize_inline(
            &section,
            &wrap,
            MetadataZone::Descriptive,
            dir.path(),
            HrefEncoding::Percent,
            &report,
        );

        assert_eq!(
            md_ref.href.as_deref(),
            Some("metadata/descriptive/DOC_1.xml")
        );
        let written = fs::read_to_string(dir.path().join("metadata/descriptive/DOC_1.xml")).unwrap();
        assert!(written.contains("voc:exp"));
        assert!(md_ref.size.is_some());
        assert!(report.is_valid());
    }

    #[test]
    fn test_externalize_empty_body_warns() {
        let dir = tempfile::tempdir().unwrap();
        let section = MdSection {
            id: Some("DOC_2".into()),
            ..MdSection::new(MdSectionKind::Descriptive)
        };
        let wrap = MdWrap::default();

        let report = ValidationReport::new();
        let md_ref = externalize_inline(
            &section,
            &wrap,
            MetadataZone::Descriptive,
            dir.path(),
            HrefEncoding::Percent,
            &report,
        );
        assert!(report.has_code(codes::INLINE_METADATA_NOT_MATERIALIZED));
        assert!(md_ref.size.is_none());
    }

    #[test]
    fn test_cancelled_collection_stops_before_resolving() {
        let dir = tempfile::tempdir().unwrap();
        let section = MdSection {
            id: Some("DMD1".into()),
            md_ref: Some(dc_ref("metadata/descriptive/dc.xml")),
            ..MdSection::new(MdSectionKind::Descriptive)
        };
        let mets = Mets {
            md_sections: vec![section],
            ..Default::default()
        };
        let div = Div {
            label: Some("descriptive".into()),
            file_pointers: vec!["DMD1".into()],
            ..Default::default()
        };
        let zones = ZoneMap {
            descriptive: Some(&div),
            ..Default::default()
        };

        let cancel = CancelToken::new();
        cancel.cancel();
        let report = ValidationReport::new();
        let err = collect_metadata(
            &mets,
            &zones,
            dir.path(),
            HrefEncoding::Percent,
            &cancel,
            &report,
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Cancelled));
    }

    #[test]
    fn test_legacy_section_materializes_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let section = MdSection {
            id: Some("EXP_1".into()),
            md_wrap: Some(MdWrap {
                md_type: Some("OTHER".into()),
                other_md_type: Some("Voc_partner_private".into()),
                mimetype: Some("text/xml".into()),
                xml_data: "<exp>x</exp>".into(),
                ..Default::default()
            }),
            ..MdSection::new(MdSectionKind::Descriptive)
        };

        let report = ValidationReport::new();
        let metadata =
            resolve_legacy_section(&section, dir.path(), HrefEncoding::Percent, &report)
                .expect("classified and resolved");

        assert_eq!(
            metadata.metadata_type().category(),
            MetadataCategory::VocExpedient
        );
        assert_eq!(
            metadata.metadata_type().other_type(),
            Some("Voc_partner_private")
        );
        assert!(dir.path().join("metadata/descriptive/EXP_1.xml").is_file());
        assert!(report.has_code(codes::LEGACY_EXPEDIENT_FALLBACK));
        assert!(report.is_valid());
    }

    #[test]
    fn test_unclassifiable_legacy_section_dropped_with_warn() {
        let dir = tempfile::tempdir().unwrap();
        let section = MdSection {
            id: Some("MYSTERY".into()),
            md_wrap: Some(MdWrap {
                md_type: Some("OTHER".into()),
                ..Default::default()
            }),
            ..MdSection::new(MdSectionKind::Descriptive)
        };

        let report = ValidationReport::new();
        let metadata =
            resolve_legacy_section(&section, dir.path(), HrefEncoding::Percent, &report);
        assert!(metadata.is_none());
        assert!(report.has_code(codes::LEGACY_METADATA_UNCLASSIFIED));
        assert!(report.is_valid());
    }

    #[test]
    fn test_extension_follows_mimetype() {
        assert_eq!(extension_for(Some("text/xml")), ".xml");
        assert_eq!(extension_for(Some("application/json")), ".json");
        assert_eq!(extension_for(Some("x/ab")), ".xml");
        assert_eq!(extension_for(None), ".xml");
    }
}
