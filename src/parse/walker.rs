//! Structural-map discovery and zone classification.
//!
//! One walker serves both profiles; everything profile-specific comes from
//! [`crate::profile`]. The common profile matches a fixed zone vocabulary by
//! label. The legacy profile has no zone vocabulary, so its content is found
//! by a recursive file-pointer search instead.

use std::path::Path;

use crate::mets::{Div, Mets, StructMap};
use crate::profile::{self, zone, Profile};
use crate::report::{codes, ValidationEntry, ValidationReport};

/// The semantic zones of one description document, as subtrees of its
/// structural map. Absent zones are simply `None`; only a missing structural
/// map altogether is an error.
#[derive(Debug, Default)]
pub struct ZoneMap<'a> {
    pub main: Option<&'a Div>,
    pub descriptive: Option<&'a Div>,
    pub preservation: Option<&'a Div>,
    pub other: Option<&'a Div>,
    pub representations: Option<&'a Div>,
    pub data: Option<&'a Div>,
    pub schemas: Option<&'a Div>,
    pub documentation: Option<&'a Div>,
    pub submission: Option<&'a Div>,
}

/// Classify the recognized structural map of `mets` into zones.
///
/// A document without a recognized structural map yields an ERROR and an
/// empty map; the caller continues with empty collections.
pub fn classify<'a>(
    mets: &'a Mets,
    profile: Profile,
    report: &ValidationReport,
    doc_path: &Path,
) -> ZoneMap<'a> {
    let struct_map = match discover_struct_map(mets, profile) {
        Some(map) => {
            report.add(
                ValidationEntry::info(codes::STRUCT_MAP_FOUND, "structural map found")
                    .with_path(doc_path),
            );
            map
        }
        None => {
            report.add(
                ValidationEntry::error(
                    codes::STRUCT_MAP_NOT_FOUND,
                    "document has no recognized structural map",
                )
                .with_path(doc_path),
            );
            return ZoneMap::default();
        }
    };

    let Some(root) = struct_map.root.as_ref() else {
        return ZoneMap::default();
    };

    match profile {
        Profile::CommonSpec => classify_common(root),
        Profile::Legacy => classify_legacy(root),
    }
}

fn discover_struct_map(mets: &Mets, profile: Profile) -> Option<&StructMap> {
    match profile {
        Profile::CommonSpec => mets.struct_map_by_labels(profile::COMMON_STRUCT_MAP_LABELS),
        Profile::Legacy => mets
            .struct_maps
            .iter()
            .find(|m| {
                m.id.as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(profile::LEGACY_STRUCT_MAP_ID))
            }),
    }
}

fn classify_common(root: &Div) -> ZoneMap<'_> {
    let mut zones = ZoneMap {
        main: Some(root),
        ..Default::default()
    };
    for first_level in &root.children {
        let Some(label) = first_level.label.as_deref() else {
            continue;
        };
        if label.eq_ignore_ascii_case(zone::METADATA) {
            for second_level in &first_level.children {
                let Some(sub) = second_level.label.as_deref() else {
                    continue;
                };
                if sub.eq_ignore_ascii_case(zone::DESCRIPTIVE) {
                    zones.descriptive = Some(second_level);
                } else if sub.eq_ignore_ascii_case(zone::PRESERVATION) {
                    zones.preservation = Some(second_level);
                } else if sub.eq_ignore_ascii_case(zone::OTHER) {
                    zones.other = Some(second_level);
                }
            }
        } else if label.eq_ignore_ascii_case(zone::REPRESENTATIONS) {
            zones.representations = Some(first_level);
        } else if label.eq_ignore_ascii_case(zone::DATA) {
            zones.data = Some(first_level);
        } else if label.eq_ignore_ascii_case(zone::SCHEMAS) {
            zones.schemas = Some(first_level);
        } else if label.eq_ignore_ascii_case(zone::DOCUMENTATION) {
            zones.documentation = Some(first_level);
        } else if label.eq_ignore_ascii_case(zone::SUBMISSION) {
            zones.submission = Some(first_level);
        }
    }
    zones
}

/// The legacy profile marks no zones. Its single representation zone is the
/// first first-level division that carries file pointers, either directly or
/// in a same-labeled child.
fn classify_legacy(root: &Div) -> ZoneMap<'_> {
    let mut zones = ZoneMap {
        main: Some(root),
        ..Default::default()
    };
    zones.representations = root
        .children
        .iter()
        .find(|first_level| has_file_content(first_level));
    zones
}

fn has_file_content(div: &Div) -> bool {
    if !div.file_pointers.is_empty() {
        return true;
    }
    let parent_label = div.label.as_deref();
    div.children.iter().any(|child| {
        !child.file_pointers.is_empty()
            && match (parent_label, child.label.as_deref()) {
                (Some(parent), Some(child_label)) => parent.eq_ignore_ascii_case(child_label),
                (None, _) => true,
                _ => false,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mets::StructMap;

    fn div(label: &str) -> Div {
        Div {
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    fn mets_with_map(map: StructMap) -> Mets {
        Mets {
            struct_maps: vec![map],
            ..Default::default()
        }
    }

    #[test]
    fn test_common_zone_vocabulary() {
        let mut root = div("SIP_1");
        let mut metadata = div("Metadata");
        metadata.children.push(div("Descriptive"));
        metadata.children.push(div("preservation"));
        root.children.push(metadata);
        root.children.push(div("representations"));
        root.children.push(div("schemas"));
        let mets = mets_with_map(StructMap {
            label: Some("E-ARK structural map".into()),
            root: Some(root),
            ..Default::default()
        });

        let report = ValidationReport::new();
        let zones = classify(&mets, Profile::CommonSpec, &report, Path::new("METS.xml"));
        assert!(zones.descriptive.is_some());
        assert!(zones.preservation.is_some());
        assert!(zones.other.is_none());
        assert!(zones.representations.is_some());
        assert!(zones.schemas.is_some());
        assert!(report.has_code(codes::STRUCT_MAP_FOUND));
    }

    #[test]
    fn test_missing_struct_map_is_error_not_abort() {
        let mets = mets_with_map(StructMap {
            label: Some("something else".into()),
            ..Default::default()
        });
        let report = ValidationReport::new();
        let zones = classify(&mets, Profile::CommonSpec, &report, Path::new("METS.xml"));
        assert!(zones.main.is_none());
        assert!(!report.is_valid());
        assert!(report.has_code(codes::STRUCT_MAP_NOT_FOUND));
    }

    #[test]
    fn test_legacy_finds_zone_by_file_pointers() {
        let mut root = div("pkg");
        let empty = div("index.xml");
        let mut carrier = div("expedient.xml");
        let mut inner = div("expedient.xml");
        inner.file_pointers.push("BIN_1_GRP".into());
        carrier.children.push(inner);
        root.children.push(empty);
        root.children.push(carrier);

        let mets = mets_with_map(StructMap {
            id: Some("CSIP".into()),
            root: Some(root),
            ..Default::default()
        });
        let report = ValidationReport::new();
        let zones = classify(&mets, Profile::Legacy, &report, Path::new("METS.xml"));
        let found = zones.representations.expect("zone discovered");
        assert_eq!(found.label.as_deref(), Some("expedient.xml"));
    }

    #[test]
    fn test_legacy_ignores_differently_labeled_children() {
        let mut root = div("pkg");
        let mut carrier = div("index.xml");
        let mut unrelated = div("other.xml");
        unrelated.file_pointers.push("BIN_1_GRP".into());
        carrier.children.push(unrelated);
        root.children.push(carrier);

        let mets = mets_with_map(StructMap {
            id: Some("CSIP".into()),
            root: Some(root),
            ..Default::default()
        });
        let report = ValidationReport::new();
        let zones = classify(&mets, Profile::Legacy, &report, Path::new("METS.xml"));
        assert!(zones.representations.is_none());
    }
}
