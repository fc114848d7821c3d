//! Description-document assembly for the build direction.
//!
//! [`DocumentBuilder`] accumulates metadata sections and file entries with
//! generated identifiers, then folds them into a [`Mets`] ready for the
//! writer. All staging, checksumming and path decisions stay with the
//! orchestrator; this module only shapes the document.

use crate::mets::{
    AgentEntry, Div, FileEntry, FileGrp, FileLocation, HrefEncoding, MdRef, MdSection,
    MdSectionKind, Mets, MetsHeader, StructMap,
};
use crate::model::metadata::{DescriptiveMetadata, MetadataRecord};
use crate::model::metadata_type::MetadataCategory;
use crate::model::IPAgent;
use crate::profile::COMMON_STRUCT_MAP_LABELS;

/// Facts about a staged file that belong in its declaring element.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    pub checksum: Option<String>,
    pub checksum_type: Option<String>,
    pub size: Option<u64>,
    pub mimetype: Option<String>,
    pub created: Option<String>,
}

/// Section and file identifiers collected while assembling one document,
/// consumed by the structural map.
#[derive(Debug, Default)]
pub struct StructMapZones {
    pub descriptive: Vec<String>,
    pub preservation: Vec<String>,
    pub other: Vec<String>,
    /// Representation id paired with the href of its nested document.
    pub representations: Vec<(String, String)>,
    pub data: Vec<String>,
    pub schemas: Vec<String>,
    pub documentation: Vec<String>,
    pub submission: Vec<String>,
}

pub struct DocumentBuilder {
    mets: Mets,
    encoding: HrefEncoding,
    dmd_seq: usize,
    amd_seq: usize,
    file_seq: usize,
}

impl DocumentBuilder {
    pub fn new(
        objid: impl Into<String>,
        type_attr: impl Into<String>,
        profile_url: impl Into<String>,
        encoding: HrefEncoding,
    ) -> Self {
        Self {
            mets: Mets {
                objid: Some(objid.into()),
                type_attr: Some(type_attr.into()),
                profile: Some(profile_url.into()),
                ..Default::default()
            },
            encoding,
            dmd_seq: 0,
            amd_seq: 0,
            file_seq: 0,
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.mets.label = Some(label.into());
    }

    pub fn set_header(
        &mut self,
        create_date: Option<String>,
        last_mod_date: Option<String>,
        record_status: Option<String>,
        agents: &[IPAgent],
    ) {
        self.mets.header = Some(MetsHeader {
            create_date,
            last_mod_date,
            record_status,
            agents: agents.iter().map(agent_entry).collect(),
        });
    }

    /// Add a descriptive metadata section referencing the staged file at
    /// `relative`, returning the section id.
    pub fn add_descriptive(
        &mut self,
        metadata: &DescriptiveMetadata,
        relative: &str,
        facts: &FileFacts,
    ) -> String {
        self.dmd_seq += 1;
        let id = format!("DMD{}", self.dmd_seq);
        let mut section = MdSection::new(MdSectionKind::Descriptive);
        section.id = Some(id.clone());
        let mut md_ref = self.md_ref(metadata.record(), relative, facts);
        md_ref.md_type_version = metadata.metadata_version().map(str::to_string);
        section.md_ref = Some(md_ref);
        self.mets.md_sections.push(section);
        id
    }

    /// Add an administrative metadata section of the given kind, returning
    /// the section id.
    pub fn add_administrative(
        &mut self,
        kind: MdSectionKind,
        record: &MetadataRecord,
        relative: &str,
        facts: &FileFacts,
    ) -> String {
        self.amd_seq += 1;
        let id = format!("AMD{}", self.amd_seq);
        let mut section = MdSection::new(kind);
        section.id = Some(id.clone());
        section.md_ref = Some(self.md_ref(record, relative, facts));
        self.mets.md_sections.push(section);
        id
    }

    fn md_ref(&self, record: &MetadataRecord, relative: &str, facts: &FileFacts) -> MdRef {
        let metadata_type = record.metadata_type();
        let md_type = match metadata_type.category() {
            MetadataCategory::Other => "OTHER".to_string(),
            category => category.name().to_string(),
        };
        MdRef {
            id: record.id().map(str::to_string),
            href: Some(self.encoding.encode(relative)),
            loctype: Some("URL".to_string()),
            md_type: Some(md_type),
            other_md_type: metadata_type.other_type().map(str::to_string),
            md_type_version: None,
            mimetype: facts.mimetype.clone(),
            created: facts.created.clone(),
            size: facts.size,
            checksum: facts.checksum.clone(),
            checksum_type: facts.checksum_type.clone(),
        }
    }

    /// Add one file entry to `group`, returning the entry id for the
    /// structural map.
    pub fn add_file_entry(
        &mut self,
        group: &mut FileGrp,
        relative: &str,
        facts: &FileFacts,
    ) -> String {
        self.file_seq += 1;
        let id = format!("FILE{}", self.file_seq);
        group.files.push(FileEntry {
            id: Some(id.clone()),
            mimetype: facts.mimetype.clone(),
            size: facts.size,
            created: facts.created.clone(),
            checksum: facts.checksum.clone(),
            checksum_type: facts.checksum_type.clone(),
            locations: vec![FileLocation {
                href: Some(self.encoding.encode(relative)),
                loctype: Some("URL".to_string()),
            }],
        });
        id
    }

    pub fn push_group(&mut self, group: FileGrp) {
        if !group.files.is_empty() || !group.groups.is_empty() {
            self.mets.file_grps.push(group);
        }
    }

    pub fn push_struct_map(&mut self, map: StructMap) {
        self.mets.struct_maps.push(map);
    }

    pub fn finish(self) -> Mets {
        self.mets
    }
}

pub fn group(use_attr: &str) -> FileGrp {
    FileGrp {
        id: Some(format!("GRP-{}", use_attr.to_ascii_lowercase())),
        use_attr: Some(use_attr.to_string()),
        ..Default::default()
    }
}

fn agent_entry(agent: &IPAgent) -> AgentEntry {
    AgentEntry {
        role: agent.role.clone(),
        other_role: agent.other_role.clone(),
        agent_type: Some(agent.agent_type.name().to_string()),
        other_type: agent.other_type.clone(),
        name: Some(agent.name.clone()),
        notes: agent.note.clone().into_iter().collect(),
    }
}

/// Assemble the recognized structural map from collected identifiers.
///
/// Divisions for empty zones are omitted entirely; a rebuilt package never
/// declares a zone it has no content for.
pub fn common_struct_map(
    root_label: &str,
    root_type: Option<&str>,
    zones: &StructMapZones,
) -> StructMap {
    let mut root = Div {
        label: Some(root_label.to_string()),
        type_attr: root_type.map(str::to_string),
        ..Default::default()
    };

    let metadata_children: Vec<Div> = [
        ("Descriptive", &zones.descriptive),
        ("Preservation", &zones.preservation),
        ("Other", &zones.other),
    ]
    .into_iter()
    .filter(|(_, ids)| !ids.is_empty())
    .map(|(label, ids)| Div {
        label: Some(label.to_string()),
        file_pointers: ids.clone(),
        ..Default::default()
    })
    .collect();
    if !metadata_children.is_empty() {
        root.children.push(Div {
            label: Some("Metadata".to_string()),
            children: metadata_children,
            ..Default::default()
        });
    }

    if !zones.representations.is_empty() {
        root.children.push(Div {
            label: Some("Representations".to_string()),
            children: zones
                .representations
                .iter()
                .map(|(rep_id, href)| Div {
                    label: Some(rep_id.clone()),
                    doc_pointers: vec![href.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });
    }

    for (label, ids) in [
        ("Data", &zones.data),
        ("Schemas", &zones.schemas),
        ("Documentation", &zones.documentation),
        ("Submission", &zones.submission),
    ] {
        if !ids.is_empty() {
            root.children.push(Div {
                label: Some(label.to_string()),
                file_pointers: ids.clone(),
                ..Default::default()
            });
        }
    }

    StructMap {
        id: Some("CSIP".to_string()),
        label: Some(COMMON_STRUCT_MAP_LABELS[0].to_string()),
        type_attr: Some("PHYSICAL".to_string()),
        root: Some(root),
    }
}

/// The structural map carrying ancestor package pointers.
pub fn ancestors_struct_map(root_label: &str, ancestors: &[String]) -> StructMap {
    StructMap {
        id: None,
        label: Some("Ancestors".to_string()),
        type_attr: Some("LOGICAL".to_string()),
        root: Some(Div {
            label: Some(root_label.to_string()),
            doc_pointers: ancestors.to_vec(),
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata_type::MetadataType;
    use crate::model::IPFile;

    #[test]
    fn test_section_ids_are_sequential() {
        let mut builder = DocumentBuilder::new("P1", "SIP:MIXED", "url", HrefEncoding::Percent);
        let file = IPFile::new("/tmp/dc.xml");
        let meta = DescriptiveMetadata::new(file, MetadataType::parse("DC"), None);
        let first = builder.add_descriptive(&meta, "metadata/descriptive/dc.xml", &FileFacts::default());
        let second =
            builder.add_descriptive(&meta, "metadata/descriptive/dc2.xml", &FileFacts::default());
        assert_eq!(first, "DMD1");
        assert_eq!(second, "DMD2");
    }

    #[test]
    fn test_other_category_writes_secondary_type() {
        let mut builder = DocumentBuilder::new("P1", "SIP:MIXED", "url", HrefEncoding::Percent);
        let file = IPFile::new("/tmp/custom.xml");
        let meta = DescriptiveMetadata::new(file, MetadataType::parse("MY_SCHEMA"), None);
        builder.add_descriptive(&meta, "metadata/descriptive/custom.xml", &FileFacts::default());
        let mets = builder.finish();
        let md_ref = mets.md_sections[0].md_ref.as_ref().unwrap();
        assert_eq!(md_ref.md_type.as_deref(), Some("OTHER"));
        assert_eq!(md_ref.other_md_type.as_deref(), Some("MY_SCHEMA"));
    }

    #[test]
    fn test_struct_map_omits_empty_zones() {
        let zones = StructMapZones {
            descriptive: vec!["DMD1".into()],
            representations: vec![("rep1".into(), "representations/rep1/METS.xml".into())],
            ..Default::default()
        };
        let map = common_struct_map("SIP_1", None, &zones);
        let root = map.root.unwrap();
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().any(|d| d.label.as_deref() == Some("Metadata")));
        assert!(root
            .children
            .iter()
            .all(|d| d.label.as_deref() != Some("Schemas")));
    }

    #[test]
    fn test_href_is_encoded() {
        let mut builder = DocumentBuilder::new("P1", "SIP:MIXED", "url", HrefEncoding::Percent);
        let mut grp = group("Data");
        builder.add_file_entry(&mut grp, "data/informe anual.pdf", &FileFacts::default());
        assert_eq!(
            grp.files[0].href(),
            Some("data/informe%20anual.pdf")
        );
    }
}
