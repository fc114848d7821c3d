//! Metadata type registry.
//!
//! Declared metadata-type strings come from many generations of tooling:
//! canonical vocabulary names, case variants, legacy vendor URNs. Resolution
//! is layered (exact canonical name, then case-insensitive display form,
//! then alias table) and always total: anything unrecognized becomes `Other` with the
//! original string preserved verbatim, so writing the type back emits exactly
//! what was read.

use std::fmt;

use serde::Serialize;

/// Canonical metadata-type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetadataCategory {
    Marc,
    Mods,
    Ead,
    /// Dublin Core
    Dc,
    NisoImg,
    LcAv,
    Vra,
    TeiHdr,
    Ddi,
    Fgdc,
    Lom,
    Premis,
    PremisObject,
    PremisAgent,
    PremisRights,
    PremisEvent,
    TextMd,
    MetsRights,
    Iso19115,
    Nap,
    EacCpf,
    Lido,
    /// Legacy vocabulary: standalone document
    VocDocument,
    /// Legacy vocabulary: document within a dossier
    VocDocumentExp,
    /// Legacy vocabulary: institution-specific dossier
    VocUpf,
    /// Legacy vocabulary: dossier ("expedient")
    VocExpedient,
    Other,
}

impl MetadataCategory {
    /// Display form as written into description documents.
    pub fn name(&self) -> &'static str {
        match self {
            MetadataCategory::Marc => "MARC",
            MetadataCategory::Mods => "MODS",
            MetadataCategory::Ead => "EAD",
            MetadataCategory::Dc => "DC",
            MetadataCategory::NisoImg => "NISOIMG",
            MetadataCategory::LcAv => "LC-AV",
            MetadataCategory::Vra => "VRA",
            MetadataCategory::TeiHdr => "TEIHDR",
            MetadataCategory::Ddi => "DDI",
            MetadataCategory::Fgdc => "FGDC",
            MetadataCategory::Lom => "LOM",
            MetadataCategory::Premis => "PREMIS",
            MetadataCategory::PremisObject => "PREMIS:OBJECT",
            MetadataCategory::PremisAgent => "PREMIS:AGENT",
            MetadataCategory::PremisRights => "PREMIS:RIGHTS",
            MetadataCategory::PremisEvent => "PREMIS:EVENT",
            MetadataCategory::TextMd => "TEXTMD",
            MetadataCategory::MetsRights => "METSRIGHTS",
            MetadataCategory::Iso19115 => "ISO 19115:2003",
            MetadataCategory::Nap => "NAP",
            MetadataCategory::EacCpf => "EAC-CPF",
            MetadataCategory::Lido => "LIDO",
            MetadataCategory::VocDocument => "Voc_document",
            MetadataCategory::VocDocumentExp => "Voc_document_exp",
            MetadataCategory::VocUpf => "Voc_UPF",
            MetadataCategory::VocExpedient => "Voc_expedient",
            MetadataCategory::Other => "OTHER",
        }
    }
}

/// All canonical categories, for layered matching.
const ALL_CATEGORIES: &[MetadataCategory] = &[
    MetadataCategory::Marc,
    MetadataCategory::Mods,
    MetadataCategory::Ead,
    MetadataCategory::Dc,
    MetadataCategory::NisoImg,
    MetadataCategory::LcAv,
    MetadataCategory::Vra,
    MetadataCategory::TeiHdr,
    MetadataCategory::Ddi,
    MetadataCategory::Fgdc,
    MetadataCategory::Lom,
    MetadataCategory::Premis,
    MetadataCategory::PremisObject,
    MetadataCategory::PremisAgent,
    MetadataCategory::PremisRights,
    MetadataCategory::PremisEvent,
    MetadataCategory::TextMd,
    MetadataCategory::MetsRights,
    MetadataCategory::Iso19115,
    MetadataCategory::Nap,
    MetadataCategory::EacCpf,
    MetadataCategory::Lido,
    MetadataCategory::VocDocument,
    MetadataCategory::VocDocumentExp,
    MetadataCategory::VocUpf,
    MetadataCategory::VocExpedient,
    MetadataCategory::Other,
];

/// Known legacy and vendor spellings, keyed by uppercased input.
///
/// Covers the compact enum-identifier forms older tooling wrote, plus the
/// controlled-vocabulary URNs the legacy profile declares its section types
/// with.
static ALIASES: phf::Map<&'static str, MetadataCategory> = phf::phf_map! {
    "LCAV" => MetadataCategory::LcAv,
    "PREMISOBJECT" => MetadataCategory::PremisObject,
    "PREMISAGENT" => MetadataCategory::PremisAgent,
    "PREMISRIGHTS" => MetadataCategory::PremisRights,
    "PREMISEVENT" => MetadataCategory::PremisEvent,
    "ISO191152003" => MetadataCategory::Iso19115,
    "EACCPF" => MetadataCategory::EacCpf,
    "URN:IARXIU:2.0:VOCABULARIES:CESCA:VOC_DOCUMENT" => MetadataCategory::VocDocument,
    "URN:IARXIU:2.0:VOCABULARIES:CESCA:VOC_DOCUMENT_EXP" => MetadataCategory::VocDocumentExp,
    "URN:IARXIU:2.0:VOCABULARIES:CESCA:VOC_UPF" => MetadataCategory::VocUpf,
    "URN:IARXIU:2.0:VOCABULARIES:CESCA:VOC_EXPEDIENT" => MetadataCategory::VocExpedient,
};

/// A declared metadata type: a canonical category, or a verbatim string when
/// nothing matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataType {
    category: MetadataCategory,
    /// Original string when `category` is `Other`, or an informative
    /// secondary type carried alongside a canonical category.
    other: String,
}

impl MetadataType {
    /// Resolve a declared type string. Total and deterministic; resolution
    /// order is exact canonical name, case-insensitive display form, alias
    /// table, then verbatim `Other`.
    pub fn parse(raw: &str) -> Self {
        match match_category(raw) {
            Some(category) => Self {
                category,
                other: String::new(),
            },
            None => Self {
                category: MetadataCategory::Other,
                other: raw.to_string(),
            },
        }
    }

    pub fn from_category(category: MetadataCategory) -> Self {
        Self {
            category,
            other: String::new(),
        }
    }

    /// Carry a secondary "other type" string next to the category.
    pub fn with_other_type(mut self, other: impl Into<String>) -> Self {
        self.other = other.into();
        self
    }

    pub fn category(&self) -> MetadataCategory {
        self.category
    }

    pub fn other_type(&self) -> Option<&str> {
        if self.other.is_empty() {
            None
        } else {
            Some(&self.other)
        }
    }

    /// Canonical string form. An `Other` type with a retained original
    /// renders that original verbatim, which is what makes
    /// `MetadataType::parse(s).as_str() == s` hold for unrecognized `s`.
    pub fn as_str(&self) -> &str {
        if self.category == MetadataCategory::Other && !self.other.is_empty() {
            &self.other
        } else {
            self.category.name()
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type: {}", self.category.name())?;
        if !self.other.is_empty() {
            write!(f, "; othertype: {}", self.other)?;
        }
        Ok(())
    }
}

/// Layered category lookup; `None` means the caller falls back to `Other`.
pub fn match_category(raw: &str) -> Option<MetadataCategory> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    ALL_CATEGORIES
        .iter()
        .find(|c| c.name() == trimmed)
        .or_else(|| {
            ALL_CATEGORIES
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(trimmed))
        })
        .copied()
        .or_else(|| {
            ALIASES
                .get(trimmed.to_ascii_uppercase().as_str())
                .copied()
        })
}
