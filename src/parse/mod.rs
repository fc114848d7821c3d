//! Reading packages from disk into the object model.
//!
//! Reconciliation never aborts on a structural defect. Everything wrong with
//! a package accumulates in its validation report; the only hard failures
//! are cancellation and I/O outside the package's own content.

pub mod file_resolver;
pub mod metadata_resolver;
pub mod representation;
pub mod walker;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cancel::CancelToken;
use crate::mets::{reader, AgentEntry, HrefEncoding, Mets, MAIN_DOCUMENT_NAME};
use crate::model::content_type::split_package_type;
use crate::model::{
    AgentType, ContentType, ContentTypeKind, IPAgent, IPStatus, IPType, InformationPackage,
};
use crate::profile::{zone, Profile};
use crate::report::{codes, zone_file_codes, ValidationEntry, ValidationReport};
use crate::Result;

/// Label of the structural map carrying ancestor package pointers.
const ANCESTORS_LABEL: &str = "Ancestors";

/// Knobs for one parse invocation.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub profile: Profile,
    pub href_encoding: HrefEncoding,
    /// When set, a main document declaring a different package role is a
    /// structural error (an AIP ingest refuses `SIP:*` roots and vice versa).
    pub expected_role: Option<IPType>,
    pub cancel: CancelToken,
}

/// Read the package rooted at `path` into an [`InformationPackage`].
///
/// Always returns a package unless cancelled; a package whose main document
/// is missing or unreadable comes back minimal, with the failure recorded in
/// its validation report. Check [`InformationPackage::validation_report`]
/// before trusting the result.
pub fn parse_package(path: &Path, options: &ParseOptions) -> Result<InformationPackage> {
    options.cancel.check()?;
    let report = ValidationReport::new();
    debug!(path = %path.display(), profile = ?options.profile, "parsing package");

    let Some(doc_path) = locate_main_document(path) else {
        report.add(
            ValidationEntry::error(
                codes::MAIN_DOC_NOT_FOUND,
                "package has no main description document",
            )
            .with_path(path),
        );
        return Ok(minimal_package(path, options.profile, report));
    };

    let mets = match reader::parse_file(&doc_path) {
        Ok(mets) => {
            report.add(
                ValidationEntry::info(codes::MAIN_DOC_FOUND, "main description document found")
                    .with_path(&doc_path),
            );
            mets
        }
        Err(err) => {
            report.add(
                ValidationEntry::error(
                    codes::MAIN_DOC_NOT_VALID,
                    "main description document could not be parsed",
                )
                .with_path(&doc_path)
                .with_cause(&err),
            );
            return Ok(minimal_package(path, options.profile, report));
        }
    };

    let (ip_type, content_type) = match package_type(&mets, options.profile) {
        Ok(split) => split,
        Err(reason) => {
            report.add(
                ValidationEntry::error(codes::MAIN_DOC_NOT_VALID, reason).with_path(&doc_path),
            );
            return Ok(minimal_package(path, options.profile, report));
        }
    };

    if let Some(expected) = options.expected_role {
        if ip_type != expected {
            report.add(
                ValidationEntry::error(
                    codes::MAIN_DOC_NOT_VALID,
                    format!(
                        "main document declares role {ip_type} where {expected} was expected"
                    ),
                )
                .with_path(&doc_path),
            );
            return Ok(minimal_package(path, options.profile, report));
        }
    }

    let ids = package_ids(&mets, path);
    let mut package = InformationPackage::new(ip_type, &ids[0], content_type);
    package.set_ids(ids);
    package.set_base_path(path);
    if let Some(label) = &mets.label {
        package.set_description(label);
    }

    if let Some(header) = &mets.header {
        if let Some(created) = header
            .create_date
            .as_deref()
            .and_then(file_resolver::parse_timestamp)
        {
            package.set_create_date(Some(created));
        }
        if let Some(modified) = header
            .last_mod_date
            .as_deref()
            .and_then(file_resolver::parse_timestamp)
        {
            package.set_modification_date(Some(modified));
        }
        package.set_status(IPStatus::parse(header.record_status.as_deref()));
        for agent in &header.agents {
            package.add_agent(convert_agent(agent));
        }
    }

    package.set_ancestors(ancestors(&mets, options.href_encoding));

    let zones = walker::classify(&mets, options.profile, &report, &doc_path);

    match options.profile {
        Profile::CommonSpec => {
            let metadata = metadata_resolver::collect_metadata(
                &mets,
                &zones,
                path,
                options.href_encoding,
                &options.cancel,
                &report,
            )?;
            for item in metadata.descriptive {
                package.add_descriptive_metadata(item);
            }
            for item in metadata.preservation {
                package.add_preservation_metadata(item);
            }
            for item in metadata.other {
                package.add_other_metadata(item);
            }

            representation::process_representations(&zones, &mut package, path, options, &report)?;

            if let Some(div) = zones.schemas {
                for file in representation::resolve_file_pointers(
                    &mets,
                    &div.all_file_pointers(),
                    path,
                    &path.join(zone::SCHEMAS),
                    options,
                    &report,
                    zone_file_codes(zone::SCHEMAS),
                )? {
                    package.add_schema(file);
                }
            }
            if let Some(div) = zones.documentation {
                for file in representation::resolve_file_pointers(
                    &mets,
                    &div.all_file_pointers(),
                    path,
                    &path.join(zone::DOCUMENTATION),
                    options,
                    &report,
                    zone_file_codes(zone::DOCUMENTATION),
                )? {
                    package.add_documentation(file);
                }
            }
            if let Some(div) = zones.submission {
                if package.ip_type() == IPType::Aip {
                    for file in representation::resolve_file_pointers(
                        &mets,
                        &div.all_file_pointers(),
                        path,
                        &path.join(zone::SUBMISSION),
                        options,
                        &report,
                        zone_file_codes(zone::SUBMISSION),
                    )? {
                        package.add_submission(file);
                    }
                } else {
                    report.add(
                        ValidationEntry::warn(
                            codes::SUBMISSION_IGNORED_FOR_ROLE,
                            "submission zone is only meaningful for the archival role",
                        )
                        .with_path(&doc_path),
                    );
                }
            }
        }
        Profile::Legacy => {
            if let Some(main) = zones.main {
                for dmd_id in &main.dmd_ids {
                    options.cancel.check()?;
                    match mets.find_md_section(dmd_id) {
                        Some(section) => {
                            if let Some(metadata) = metadata_resolver::resolve_legacy_section(
                                section,
                                path,
                                options.href_encoding,
                                &report,
                            ) {
                                package.add_descriptive_metadata(metadata);
                            }
                        }
                        None => {
                            report.add(
                                ValidationEntry::error(
                                    codes::METADATA_FILE_NOT_FOUND,
                                    "division references no known metadata section",
                                )
                                .with_related(dmd_id.as_str())
                                .with_path(&doc_path),
                            );
                        }
                    }
                }
            }
            representation::process_legacy_representation(
                &mets,
                &zones,
                &mut package,
                path,
                options,
                &report,
            )?;
        }
    }

    if package.representations().is_empty() {
        report.add(
            ValidationEntry::warn(codes::NO_REPRESENTATIONS_FOUND, "package has no representations")
                .with_path(&doc_path),
        );
    }

    let error_count = report.count(crate::report::Severity::Error);
    if error_count == 0 {
        report.add(
            ValidationEntry::info(
                codes::MAIN_DOC_IS_VALID,
                "package reconciled without structural errors",
            )
            .with_path(&doc_path),
        );
    } else {
        report.add(
            ValidationEntry::error(
                codes::MAIN_DOC_NOT_VALID,
                format!("package reconciled with {error_count} structural errors"),
            )
            .with_path(&doc_path),
        );
    }

    package.set_validation_report(report);
    Ok(package)
}

/// The main document sits at the package root. The canonical name is matched
/// first; a case-insensitive scan covers packages written by tools that
/// disagree about casing.
fn locate_main_document(base_path: &Path) -> Option<PathBuf> {
    let canonical = base_path.join(MAIN_DOCUMENT_NAME);
    if canonical.is_file() {
        return Some(canonical);
    }
    let entries = fs::read_dir(base_path).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name
            .to_str()
            .is_some_and(|n| n.eq_ignore_ascii_case(MAIN_DOCUMENT_NAME))
            && entry.path().is_file()
        {
            return Some(entry.path());
        }
    }
    None
}

fn package_type(mets: &Mets, profile: Profile) -> std::result::Result<(IPType, ContentType), String> {
    match profile {
        Profile::CommonSpec => {
            let attr = mets
                .type_attr
                .as_deref()
                .ok_or_else(|| "main document declares no 'TYPE' attribute".to_string())?;
            split_package_type(attr)
        }
        // Legacy documents carry a template URN; its last segment names the
        // template and the role is always submission.
        Profile::Legacy => {
            let content = match mets.type_attr.as_deref() {
                Some(attr) => {
                    let template = attr.rsplit(':').next().unwrap_or(attr);
                    ContentType::parse_or(template, ContentTypeKind::PlExpedient)
                }
                None => ContentType::from_kind(ContentTypeKind::PlExpedient),
            };
            Ok((IPType::Sip, content))
        }
    }
}

fn package_ids(mets: &Mets, base_path: &Path) -> Vec<String> {
    let from_objid: Vec<String> = mets
        .objid
        .as_deref()
        .map(|objid| objid.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    if !from_objid.is_empty() {
        return from_objid;
    }
    vec![directory_name(base_path)]
}

fn directory_name(base_path: &Path) -> String {
    base_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}

fn minimal_package(
    base_path: &Path,
    profile: Profile,
    report: ValidationReport,
) -> InformationPackage {
    let content_type = match profile {
        Profile::CommonSpec => ContentType::mixed(),
        Profile::Legacy => ContentType::from_kind(ContentTypeKind::PlExpedient),
    };
    let mut package = InformationPackage::new(IPType::Sip, directory_name(base_path), content_type);
    package.set_base_path(base_path);
    package.set_validation_report(report);
    package
}

pub(crate) fn convert_agent(entry: &AgentEntry) -> IPAgent {
    let mut agent = IPAgent::new(
        entry.name.clone().unwrap_or_default(),
        AgentType::parse(entry.agent_type.as_deref()),
    );
    if let Some(role) = &entry.role {
        agent = agent.with_role(role);
    }
    if let Some(other_role) = &entry.other_role {
        agent = agent.with_other_role(other_role);
    }
    if let Some(other_type) = &entry.other_type {
        agent = agent.with_other_type(other_type);
    }
    if let Some(note) = entry.notes.first() {
        agent = agent.with_note(note);
    }
    agent
}

/// Ancestor packages are carried as document pointers in a dedicated
/// structural map.
fn ancestors(mets: &Mets, encoding: HrefEncoding) -> Vec<String> {
    mets.struct_map_by_labels(&[ANCESTORS_LABEL])
        .and_then(|map| map.root.as_ref())
        .map(|root| {
            root.doc_pointers
                .iter()
                .map(|href| encoding.decode(href).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_main_document_yields_minimal_package() {
        let dir = tempfile::tempdir().unwrap();
        let package = parse_package(dir.path(), &ParseOptions::default()).unwrap();
        assert!(!package.validation_report().is_valid());
        assert!(package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_FOUND));
        assert!(package.representations().is_empty());
        assert_eq!(package.id(), directory_name(dir.path()));
    }

    #[test]
    fn test_unparsable_main_document_yields_minimal_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("METS.xml"), b"this is not xml at all").unwrap();
        let package = parse_package(dir.path(), &ParseOptions::default()).unwrap();
        assert!(package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_VALID));
    }

    #[test]
    fn test_main_document_name_matched_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mets.xml"), b"<broken").unwrap();
        let package = parse_package(dir.path(), &ParseOptions::default()).unwrap();
        // found (so NOT_FOUND is absent) but unparsable
        assert!(!package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_FOUND));
        assert!(package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_VALID));
    }

    #[test]
    fn test_malformed_type_attribute_is_structural_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("METS.xml"),
            br#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" OBJID="P1" TYPE="NOT_A_ROLE"/>"#,
        )
        .unwrap();
        let package = parse_package(dir.path(), &ParseOptions::default()).unwrap();
        assert!(package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_VALID));
        assert!(package.representations().is_empty());
    }

    #[test]
    fn test_role_mismatch_is_structural_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("METS.xml"),
            br#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" OBJID="P1" TYPE="AIP:MIXED"/>"#,
        )
        .unwrap();
        let options = ParseOptions {
            expected_role: Some(IPType::Sip),
            ..Default::default()
        };
        let package = parse_package(dir.path(), &options).unwrap();
        assert!(package
            .validation_report()
            .has_code(codes::MAIN_DOC_NOT_VALID));
        assert!(package.representations().is_empty());
    }

    #[test]
    fn test_legacy_type_from_template_urn() {
        let mets = Mets {
            type_attr: Some("urn:iarxiu:2.0:templates:cesca:PL_expedient".to_string()),
            ..Default::default()
        };
        let (ip_type, content) = package_type(&mets, Profile::Legacy).unwrap();
        assert_eq!(ip_type, IPType::Sip);
        assert_eq!(content.kind(), ContentTypeKind::PlExpedient);
    }

    #[test]
    fn test_objid_splits_into_multiple_ids() {
        let mets = Mets {
            objid: Some("ID1 ID2".to_string()),
            ..Default::default()
        };
        let ids = package_ids(&mets, Path::new("/tmp/pkg"));
        assert_eq!(ids, vec!["ID1".to_string(), "ID2".to_string()]);
    }

    mod round_trip {
        use super::*;
        use crate::build::{build_package, BuildOptions};
        use crate::model::metadata::DescriptiveMetadata;
        use crate::model::metadata_type::{MetadataCategory, MetadataType};
        use crate::model::{ContentType, IPFile, Representation};

        fn sample_package(source: &Path) -> InformationPackage {
            fs::create_dir_all(source.join("sub")).unwrap();
            fs::write(source.join("a.txt"), b"alpha").unwrap();
            fs::write(source.join("sub/b.txt"), b"beta").unwrap();
            fs::write(source.join("dc.xml"), b"<dc:title xmlns:dc=\"x\">t</dc:title>").unwrap();

            let mut package =
                InformationPackage::new(IPType::Sip, "SIP_RT", ContentType::mixed());
            let mut rep1 = Representation::new("rep1");
            rep1.add_file(IPFile::new(source.join("a.txt")));
            rep1.add_file(
                IPFile::new(source.join("sub/b.txt"))
                    .with_relative_folders(vec!["sub".to_string()]),
            );
            rep1.add_descriptive_metadata(DescriptiveMetadata::new(
                IPFile::new(source.join("dc.xml")),
                MetadataType::parse("DC"),
                Some("2002".to_string()),
            ));
            package.add_representation(rep1);
            let mut rep2 = Representation::new("rep2");
            rep2.add_file(IPFile::new(source.join("a.txt")));
            package.add_representation(rep2);
            package
        }

        fn build_sample(root: &Path) -> PathBuf {
            let source = root.join("src");
            fs::create_dir(&source).unwrap();
            let package = sample_package(&source);
            build_package(&package, &root.join("out"), &BuildOptions::default()).unwrap()
        }

        #[test]
        fn test_built_package_parses_back_clean() {
            let root = tempfile::tempdir().unwrap();
            let built = build_sample(root.path());

            let parsed = parse_package(&built, &ParseOptions::default()).unwrap();
            assert!(parsed.validation_report().is_valid());
            assert!(parsed
                .validation_report()
                .has_code(codes::MAIN_DOC_IS_VALID));
            assert_eq!(parsed.id(), "SIP_RT");
            assert_eq!(parsed.representations().len(), 2);

            let rep1 = &parsed.representations()[0];
            assert_eq!(rep1.representation_id(), "rep1");
            assert_eq!(rep1.data().len(), 2);
            let nested = rep1
                .data()
                .iter()
                .find(|f| f.file_name() == "b.txt")
                .unwrap();
            assert_eq!(nested.relative_folders(), ["sub".to_string()]);

            assert_eq!(rep1.descriptive_metadata().len(), 1);
            assert_eq!(
                rep1.descriptive_metadata()[0].metadata_type().category(),
                MetadataCategory::Dc
            );
            assert_eq!(
                rep1.descriptive_metadata()[0].metadata_version(),
                Some("2002")
            );

            // second representation has files but no metadata: exactly one
            // WARN, validity untouched
            let rep2 = &parsed.representations()[1];
            assert_eq!(rep2.data().len(), 1);
            assert!(rep2.descriptive_metadata().is_empty());
            assert!(parsed
                .validation_report()
                .has_code(codes::REPRESENTATION_HAS_NO_METADATA));
            assert_eq!(
                parsed
                    .validation_report()
                    .count(crate::report::Severity::Warn),
                1
            );
        }

        #[test]
        fn test_missing_payload_excluded_but_package_returned() {
            let root = tempfile::tempdir().unwrap();
            let built = build_sample(root.path());
            fs::remove_file(built.join("representations/rep1/data/a.txt")).unwrap();

            let parsed = parse_package(&built, &ParseOptions::default()).unwrap();
            assert!(!parsed.validation_report().is_valid());
            assert!(parsed
                .validation_report()
                .has_code(codes::REPRESENTATION_FILE_NOT_FOUND));
            let rep1 = &parsed.representations()[0];
            assert_eq!(rep1.data().len(), 1);
            assert_eq!(rep1.data()[0].file_name(), "b.txt");
        }

        #[test]
        fn test_tampered_payload_fails_integrity() {
            let root = tempfile::tempdir().unwrap();
            let built = build_sample(root.path());
            fs::write(built.join("representations/rep1/data/a.txt"), b"changed").unwrap();

            let parsed = parse_package(&built, &ParseOptions::default()).unwrap();
            assert!(parsed
                .validation_report()
                .has_code(codes::CHECKSUM_MISMATCH));
            assert_eq!(parsed.representations()[0].data().len(), 1);
        }

        #[test]
        fn test_cancelled_parse_returns_no_package() {
            let root = tempfile::tempdir().unwrap();
            let built = build_sample(root.path());

            let options = ParseOptions::default();
            options.cancel.cancel();
            assert!(matches!(
                parse_package(&built, &options),
                Err(crate::Error::Cancelled)
            ));
        }
    }
}
