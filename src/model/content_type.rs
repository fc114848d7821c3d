//! Package and representation content types, and the role-qualified `TYPE`
//! attribute carried by description-document roots.

use std::fmt;

use serde::Serialize;

/// Role variant of an information package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IPType {
    /// Submission Information Package
    Sip,
    /// Archival Information Package
    Aip,
    /// Dissemination Information Package
    Dip,
}

impl IPType {
    pub fn name(&self) -> &'static str {
        match self {
            IPType::Sip => "SIP",
            IPType::Aip => "AIP",
            IPType::Dip => "DIP",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SIP" => Some(IPType::Sip),
            "AIP" => Some(IPType::Aip),
            "DIP" => Some(IPType::Dip),
            _ => None,
        }
    }
}

impl fmt::Display for IPType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle status recorded in the description-document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum IPStatus {
    #[default]
    New,
    Update,
}

impl IPStatus {
    pub fn name(&self) -> &'static str {
        match self {
            IPStatus::New => "NEW",
            IPStatus::Update => "UPDATE",
        }
    }

    /// Parse a header record status; anything unrecognized falls back to NEW.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            Some(s) if s == "UPDATE" => IPStatus::Update,
            _ => IPStatus::New,
        }
    }
}

/// Canonical content-type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentTypeKind {
    Sfsb,
    Rdb,
    Erms,
    Geodata,
    Mixed,
    /// Legacy dossier template
    PlExpedient,
    /// Legacy institution-specific dossier template
    PlExpUpf,
    /// Legacy standalone-document template
    PlDocument,
    Other,
}

impl ContentTypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContentTypeKind::Sfsb => "SFSB",
            ContentTypeKind::Rdb => "RDB",
            ContentTypeKind::Erms => "ERMS",
            ContentTypeKind::Geodata => "GEODATA",
            ContentTypeKind::Mixed => "MIXED",
            ContentTypeKind::PlExpedient => "PL_EXPEDIENT",
            ContentTypeKind::PlExpUpf => "PL_EXP_UPF",
            ContentTypeKind::PlDocument => "PL_DOCUMENT",
            ContentTypeKind::Other => "OTHER",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SFSB" => Some(ContentTypeKind::Sfsb),
            "RDB" => Some(ContentTypeKind::Rdb),
            "ERMS" => Some(ContentTypeKind::Erms),
            "GEODATA" => Some(ContentTypeKind::Geodata),
            "MIXED" => Some(ContentTypeKind::Mixed),
            "PL_EXPEDIENT" => Some(ContentTypeKind::PlExpedient),
            "PL_EXP_UPF" => Some(ContentTypeKind::PlExpUpf),
            "PL_DOCUMENT" => Some(ContentTypeKind::PlDocument),
            "OTHER" => Some(ContentTypeKind::Other),
            _ => None,
        }
    }
}

/// Content type of a package or representation: a canonical category, with
/// the free-text original retained when no category matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentType {
    kind: ContentTypeKind,
    other: String,
}

impl ContentType {
    /// Resolve a declared content type; unmatched values become the given
    /// default kind with the original retained as the other-type.
    pub fn parse_or(raw: &str, default: ContentTypeKind) -> Self {
        match ContentTypeKind::from_name(raw) {
            Some(kind) => Self {
                kind,
                other: String::new(),
            },
            None => Self {
                kind: default,
                other: raw.to_string(),
            },
        }
    }

    /// Resolve a declared content type, defaulting to `Other`.
    pub fn parse(raw: &str) -> Self {
        Self::parse_or(raw, ContentTypeKind::Other)
    }

    pub fn from_kind(kind: ContentTypeKind) -> Self {
        Self {
            kind,
            other: String::new(),
        }
    }

    pub fn mixed() -> Self {
        Self::from_kind(ContentTypeKind::Mixed)
    }

    pub fn kind(&self) -> ContentTypeKind {
        self.kind
    }

    pub fn other_type(&self) -> Option<&str> {
        if self.other.is_empty() {
            None
        } else {
            Some(&self.other)
        }
    }

    pub fn as_str(&self) -> &str {
        if self.kind == ContentTypeKind::Other && !self.other.is_empty() {
            &self.other
        } else {
            self.kind.name()
        }
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::mixed()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `TYPE` prefix used by representation-level description documents.
pub const REPRESENTATION_TYPE_PREFIX: &str = "representation";

/// Split a package-level `TYPE` attribute of the form `"<role>:<contentType>"`.
///
/// Both halves must be present and the role must be a recognized package
/// role; a malformed attribute is a structural problem for the caller.
pub fn split_package_type(attr: &str) -> Result<(IPType, ContentType), String> {
    let (role, content) = split_two_parts(attr)?;
    let ip_type = IPType::from_name(role)
        .ok_or_else(|| format!("'TYPE' attribute does not contain a valid package role: {attr}"))?;
    Ok((ip_type, ContentType::parse(content)))
}

/// Split a representation-level `TYPE` attribute of the form
/// `"representation:<contentType>"`.
///
/// A bare `"representation"` with no second part is tolerated and yields
/// `None`, matching documents produced before the two-part form existed.
pub fn split_representation_type(attr: &str) -> Result<Option<ContentType>, String> {
    let trimmed = attr.trim();
    if trimmed.is_empty() {
        return Err("'TYPE' attribute does not contain any value".to_string());
    }
    if trimmed.eq_ignore_ascii_case(REPRESENTATION_TYPE_PREFIX) {
        return Ok(None);
    }
    let (prefix, content) = split_two_parts(trimmed)?;
    if !prefix.eq_ignore_ascii_case(REPRESENTATION_TYPE_PREFIX) {
        return Err(format!(
            "'TYPE' attribute does not contain a valid representation value: {attr}"
        ));
    }
    Ok(Some(ContentType::parse(content)))
}

fn split_two_parts(attr: &str) -> Result<(&str, &str), String> {
    let trimmed = attr.trim();
    if trimmed.is_empty() {
        return Err("'TYPE' attribute does not contain any value".to_string());
    }
    match trimmed.split_once(':') {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            Ok((a.trim(), b.trim()))
        }
        _ => Err(format!(
            "'TYPE' attribute does not contain a valid value: {attr}"
        )),
    }
}
