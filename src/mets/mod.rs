//! Description-document (METS) object model, reader and writer.
//!
//! These structs mirror the on-disk XML shape one-to-one and carry no package
//! semantics. The parse pipeline interprets them; the build pipeline
//! assembles them. Cross-references inside a document (file pointers in the
//! structural map) are resolved once, at the reader boundary, into
//! [`FileRef`] values.

pub mod href;
pub mod reader;
pub mod writer;

pub use href::HrefEncoding;

/// Filename of the description document inside a package or representation
/// root.
pub const MAIN_DOCUMENT_NAME: &str = "METS.xml";

/// Namespace of the description-document vocabulary.
pub const METS_NS: &str = "http://www.loc.gov/METS/";
/// XLink namespace used by `href` attributes.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Kind of metadata section, by the wrapping element it was read from or
/// will be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdSectionKind {
    /// `dmdSec`
    Descriptive,
    /// `amdSec/digiprovMD`
    DigiProv,
    /// `amdSec/techMD`
    Tech,
    /// `amdSec/rightsMD`
    Rights,
    /// `amdSec/sourceMD`
    Source,
}

/// A reference to an external metadata file (`mdRef`).
#[derive(Debug, Clone, Default)]
pub struct MdRef {
    pub id: Option<String>,
    pub href: Option<String>,
    pub loctype: Option<String>,
    pub md_type: Option<String>,
    pub other_md_type: Option<String>,
    pub md_type_version: Option<String>,
    pub mimetype: Option<String>,
    pub created: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub checksum_type: Option<String>,
}

/// Inline metadata (`mdWrap`), with the wrapped `xmlData` body kept as raw
/// markup.
#[derive(Debug, Clone, Default)]
pub struct MdWrap {
    pub id: Option<String>,
    pub md_type: Option<String>,
    pub other_md_type: Option<String>,
    pub md_type_version: Option<String>,
    pub mimetype: Option<String>,
    pub created: Option<String>,
    pub xml_data: String,
}

/// One metadata section: a `dmdSec` or one child of an `amdSec`.
#[derive(Debug, Clone)]
pub struct MdSection {
    pub id: Option<String>,
    pub kind: MdSectionKind,
    pub created: Option<String>,
    pub md_ref: Option<MdRef>,
    pub md_wrap: Option<MdWrap>,
}

impl MdSection {
    pub fn new(kind: MdSectionKind) -> Self {
        Self {
            id: None,
            kind,
            created: None,
            md_ref: None,
            md_wrap: None,
        }
    }

    /// Declared metadata type, regardless of whether the section is a
    /// reference or inline.
    pub fn md_type(&self) -> Option<&str> {
        self.md_ref
            .as_ref()
            .and_then(|r| r.md_type.as_deref())
            .or_else(|| self.md_wrap.as_ref().and_then(|w| w.md_type.as_deref()))
    }

    pub fn other_md_type(&self) -> Option<&str> {
        self.md_ref
            .as_ref()
            .and_then(|r| r.other_md_type.as_deref())
            .or_else(|| {
                self.md_wrap
                    .as_ref()
                    .and_then(|w| w.other_md_type.as_deref())
            })
    }
}

/// A file location (`FLocat`).
#[derive(Debug, Clone, Default)]
pub struct FileLocation {
    pub href: Option<String>,
    pub loctype: Option<String>,
}

/// One `file` element.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub id: Option<String>,
    pub mimetype: Option<String>,
    pub size: Option<u64>,
    pub created: Option<String>,
    pub checksum: Option<String>,
    pub checksum_type: Option<String>,
    pub locations: Vec<FileLocation>,
}

impl FileEntry {
    /// First declared location href, which is where the payload lives.
    pub fn href(&self) -> Option<&str> {
        self.locations.iter().find_map(|l| l.href.as_deref())
    }
}

/// A `fileGrp`, possibly nested.
#[derive(Debug, Clone, Default)]
pub struct FileGrp {
    pub id: Option<String>,
    pub use_attr: Option<String>,
    pub files: Vec<FileEntry>,
    pub groups: Vec<FileGrp>,
}

impl FileGrp {
    /// Depth-first iteration over every file entry in this group and its
    /// nested groups.
    pub fn all_files(&self) -> Vec<&FileEntry> {
        let mut out: Vec<&FileEntry> = self.files.iter().collect();
        for group in &self.groups {
            out.extend(group.all_files());
        }
        out
    }

    fn find_file(&self, id: &str) -> Option<&FileEntry> {
        if let Some(f) = self.files.iter().find(|f| f.id.as_deref() == Some(id)) {
            return Some(f);
        }
        self.groups.iter().find_map(|g| g.find_file(id))
    }

    fn find_group(&self, id: &str) -> Option<&FileGrp> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.groups.iter().find_map(|g| g.find_group(id))
    }
}

/// A structural-map division (`div`), possibly nested.
#[derive(Debug, Clone, Default)]
pub struct Div {
    pub id: Option<String>,
    pub label: Option<String>,
    pub type_attr: Option<String>,
    /// `DMDID` references, whitespace separated in the document.
    pub dmd_ids: Vec<String>,
    /// `fptr` FILEID references.
    pub file_pointers: Vec<String>,
    /// `mptr` hrefs pointing at nested description documents.
    pub doc_pointers: Vec<String>,
    pub children: Vec<Div>,
}

impl Div {
    /// Direct child with the given label, compared case-insensitively.
    pub fn child_by_label(&self, label: &str) -> Option<&Div> {
        self.children.iter().find(|d| {
            d.label
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(label))
        })
    }

    /// Every file pointer in this division and all nested divisions.
    pub fn all_file_pointers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.file_pointers.iter().map(String::as_str).collect();
        for child in &self.children {
            out.extend(child.all_file_pointers());
        }
        out
    }
}

/// A `structMap`.
#[derive(Debug, Clone, Default)]
pub struct StructMap {
    pub id: Option<String>,
    pub label: Option<String>,
    pub type_attr: Option<String>,
    pub root: Option<Div>,
}

/// An agent entry from the header.
#[derive(Debug, Clone, Default)]
pub struct AgentEntry {
    pub role: Option<String>,
    pub other_role: Option<String>,
    pub agent_type: Option<String>,
    pub other_type: Option<String>,
    pub name: Option<String>,
    pub notes: Vec<String>,
}

/// The `metsHdr`.
#[derive(Debug, Clone, Default)]
pub struct MetsHeader {
    pub create_date: Option<String>,
    pub last_mod_date: Option<String>,
    pub record_status: Option<String>,
    pub agents: Vec<AgentEntry>,
}

/// What a structural-map file pointer resolved to.
///
/// Pointer targets live in three distinct id spaces and the distinction
/// matters to the walker, so resolution happens once here instead of being
/// re-derived downstream.
#[derive(Debug, Clone, Copy)]
pub enum FileRef<'a> {
    /// A single `file` entry.
    Single(&'a FileEntry),
    /// A whole `fileGrp`.
    Group(&'a FileGrp),
    /// A metadata section (metadata divisions point at `dmdSec`/`amdSec`
    /// children by id).
    Metadata(&'a MdSection),
}

/// A whole description document.
#[derive(Debug, Clone, Default)]
pub struct Mets {
    pub objid: Option<String>,
    pub type_attr: Option<String>,
    pub label: Option<String>,
    pub profile: Option<String>,
    pub header: Option<MetsHeader>,
    pub md_sections: Vec<MdSection>,
    pub file_grps: Vec<FileGrp>,
    pub struct_maps: Vec<StructMap>,
}

impl Mets {
    /// Resolve a structural-map file pointer against every id space of the
    /// document.
    pub fn resolve_file_ref(&self, id: &str) -> Option<FileRef<'_>> {
        for grp in &self.file_grps {
            if let Some(f) = grp.find_file(id) {
                return Some(FileRef::Single(f));
            }
        }
        for grp in &self.file_grps {
            if let Some(g) = grp.find_group(id) {
                return Some(FileRef::Group(g));
            }
        }
        self.find_md_section(id).map(FileRef::Metadata)
    }

    /// Metadata pointers reference either the section id or the id of the
    /// `mdRef` inside it, depending on the producing tool.
    pub fn find_md_section(&self, id: &str) -> Option<&MdSection> {
        self.md_sections.iter().find(|s| {
            s.id.as_deref() == Some(id)
                || s.md_ref
                    .as_ref()
                    .is_some_and(|r| r.id.as_deref() == Some(id))
        })
    }

    /// First structural map whose label matches one of the given labels,
    /// compared case-insensitively.
    pub fn struct_map_by_labels(&self, labels: &[&str]) -> Option<&StructMap> {
        self.struct_maps.iter().find(|m| {
            m.label.as_deref().is_some_and(|l| {
                labels.iter().any(|wanted| l.eq_ignore_ascii_case(wanted))
            })
        })
    }

    /// First structural map with the given id.
    pub fn struct_map_by_id(&self, id: &str) -> Option<&StructMap> {
        self.struct_maps
            .iter()
            .find(|m| m.id.as_deref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mets() -> Mets {
        let mut mets = Mets::default();
        mets.md_sections.push(MdSection {
            id: Some("DMD1".into()),
            ..MdSection::new(MdSectionKind::Descriptive)
        });
        mets.file_grps.push(FileGrp {
            id: Some("GRP1".into()),
            files: vec![FileEntry {
                id: Some("FILE1".into()),
                ..Default::default()
            }],
            groups: vec![FileGrp {
                id: Some("GRP2".into()),
                files: vec![FileEntry {
                    id: Some("FILE2".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        });
        mets
    }

    #[test]
    fn test_resolve_file_ref_spans_id_spaces() {
        let mets = sample_mets();
        assert!(matches!(
            mets.resolve_file_ref("FILE2"),
            Some(FileRef::Single(_))
        ));
        assert!(matches!(
            mets.resolve_file_ref("GRP2"),
            Some(FileRef::Group(_))
        ));
        assert!(matches!(
            mets.resolve_file_ref("DMD1"),
            Some(FileRef::Metadata(_))
        ));
        assert!(mets.resolve_file_ref("NOPE").is_none());
    }

    #[test]
    fn test_all_files_recurses_nested_groups() {
        let mets = sample_mets();
        let files = mets.file_grps[0].all_files();
        let ids: Vec<_> = files.iter().filter_map(|f| f.id.as_deref()).collect();
        assert_eq!(ids, vec!["FILE1", "FILE2"]);
    }

    #[test]
    fn test_struct_map_lookup_is_case_insensitive() {
        let mut mets = Mets::default();
        mets.struct_maps.push(StructMap {
            label: Some("Common Specification structural map".into()),
            ..Default::default()
        });
        assert!(mets
            .struct_map_by_labels(&["COMMON SPECIFICATION STRUCTURAL MAP"])
            .is_some());
        assert!(mets.struct_map_by_labels(&["other"]).is_none());
    }
}
