//! Description-document profiles.
//!
//! Two profiles share one parsing pipeline. The common structural profile
//! uses a fixed zone vocabulary under a labeled structural map. The legacy
//! profile (one partner ingestion pipeline) reuses a generic section kind for
//! semantically distinct metadata, distinguished only by a secondary type
//! attribute, and locates content by recursive file-pointer search instead of
//! zone labels. Everything profile-specific lives here; the walker and the
//! resolvers are parameterized by this module and carry no profile branches
//! of their own.

use crate::model::metadata_type::{match_category, MetadataCategory, MetadataType};

/// Which description-document dialect a parse or build run follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    CommonSpec,
    /// Import-only. Builds are rejected for this profile.
    Legacy,
}

/// Structural-map labels recognized for the common profile.
pub const COMMON_STRUCT_MAP_LABELS: &[&str] =
    &["Common Specification structural map", "E-ARK structural map"];

/// Structural-map id recognized for the legacy profile.
pub const LEGACY_STRUCT_MAP_ID: &str = "CSIP";

/// Zone labels, shared between structural-map divisions and on-disk folder
/// names.
pub mod zone {
    pub const METADATA: &str = "metadata";
    pub const DESCRIPTIVE: &str = "descriptive";
    pub const PRESERVATION: &str = "preservation";
    pub const OTHER: &str = "other";
    pub const REPRESENTATIONS: &str = "representations";
    pub const DATA: &str = "data";
    pub const SCHEMAS: &str = "schemas";
    pub const DOCUMENTATION: &str = "documentation";
    pub const SUBMISSION: &str = "submission";
}

/// Outcome of classifying one legacy metadata section.
///
/// The legacy profile marks standalone documents and dossiers
/// ("expedients") with the same generic section kind; only the declared
/// type pair tells them apart. `confident` records whether the decision
/// came from a recognized vocabulary or from the informative-but-unknown
/// fallback, so the caller can WARN on the latter instead of guessing
/// silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyClass {
    Document,
    Expedient { confident: bool },
    Unknown,
}

/// Classify a legacy metadata section from its declared type pair.
///
/// Pure function of the two attributes; emits nothing.
pub fn classify_legacy_section(
    declared_type: Option<&str>,
    declared_other_type: Option<&str>,
) -> LegacyClass {
    let declared = declared_type.and_then(match_category);
    let other = declared_other_type.and_then(match_category);

    if matches!(declared, Some(MetadataCategory::Dc))
        || matches!(
            other,
            Some(
                MetadataCategory::Dc
                    | MetadataCategory::VocDocument
                    | MetadataCategory::VocDocumentExp
            )
        )
    {
        return LegacyClass::Document;
    }

    if matches!(
        other,
        Some(MetadataCategory::VocExpedient | MetadataCategory::VocUpf)
    ) {
        return LegacyClass::Expedient { confident: true };
    }

    // An informative secondary type that matched no vocabulary still marks a
    // dossier in practice, but the caller must surface the guess.
    match declared_other_type.map(str::trim) {
        Some(s) if !s.is_empty() => LegacyClass::Expedient { confident: false },
        _ => LegacyClass::Unknown,
    }
}

/// Normalize a classified legacy section's type tag, keeping the original
/// declared secondary type in the other-type slot whenever it was
/// informative.
pub fn legacy_normalized_type(
    class: LegacyClass,
    declared_other_type: Option<&str>,
) -> Option<MetadataType> {
    let category = match class {
        LegacyClass::Document => MetadataCategory::VocDocument,
        LegacyClass::Expedient { .. } => MetadataCategory::VocExpedient,
        LegacyClass::Unknown => return None,
    };
    let mut normalized = MetadataType::from_category(category);
    if let Some(original) = declared_other_type.map(str::trim).filter(|s| !s.is_empty()) {
        // drop the secondary type when it is what the normalization already says
        if !original.eq_ignore_ascii_case(normalized.as_str()) {
            normalized = normalized.with_other_type(original);
        }
    }
    Some(normalized)
}
