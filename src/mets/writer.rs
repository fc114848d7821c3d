//! Description-document writer.
//!
//! Serializes a [`Mets`] assembled by the builder. The writer is shape-only:
//! it emits exactly what the struct holds and decides nothing about zone
//! paths or checksums.

use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;
use crate::mets::{
    AgentEntry, Div, FileEntry, FileGrp, MdRef, MdSection, MdSectionKind, Mets, MetsHeader,
    StructMap, METS_NS, XLINK_NS,
};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize a description document to a string.
pub fn write_string(mets: &Mets) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("mets");
    root.push_attribute(("xmlns", METS_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    push_opt(&mut root, "OBJID", mets.objid.as_deref());
    push_opt(&mut root, "TYPE", mets.type_attr.as_deref());
    push_opt(&mut root, "LABEL", mets.label.as_deref());
    push_opt(&mut root, "PROFILE", mets.profile.as_deref());
    writer.write_event(Event::Start(root))?;

    if let Some(header) = &mets.header {
        write_header(&mut writer, header)?;
    }

    for section in &mets.md_sections {
        if section.kind == MdSectionKind::Descriptive {
            write_md_section(&mut writer, section)?;
        }
    }
    let amd_sections: Vec<&MdSection> = mets
        .md_sections
        .iter()
        .filter(|s| s.kind != MdSectionKind::Descriptive)
        .collect();
    if !amd_sections.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("amdSec")))?;
        for section in amd_sections {
            write_md_section(&mut writer, section)?;
        }
        writer.write_event(Event::End(BytesEnd::new("amdSec")))?;
    }

    if !mets.file_grps.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("fileSec")))?;
        for grp in &mets.file_grps {
            write_file_grp(&mut writer, grp)?;
        }
        writer.write_event(Event::End(BytesEnd::new("fileSec")))?;
    }

    for map in &mets.struct_maps {
        write_struct_map(&mut writer, map)?;
    }

    writer.write_event(Event::End(BytesEnd::new("mets")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| crate::error::Error::Xml(e.to_string()))
}

/// Serialize a description document straight to a file.
pub fn write_file(mets: &Mets, path: &Path) -> Result<()> {
    let xml = write_string(mets)?;
    std::fs::write(path, xml)?;
    Ok(())
}

fn write_header(writer: &mut XmlWriter, header: &MetsHeader) -> Result<()> {
    let mut start = BytesStart::new("metsHdr");
    push_opt(&mut start, "CREATEDATE", header.create_date.as_deref());
    push_opt(&mut start, "LASTMODDATE", header.last_mod_date.as_deref());
    push_opt(&mut start, "RECORDSTATUS", header.record_status.as_deref());

    if header.agents.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for agent in &header.agents {
        write_agent(writer, agent)?;
    }
    writer.write_event(Event::End(BytesEnd::new("metsHdr")))?;
    Ok(())
}

fn write_agent(writer: &mut XmlWriter, agent: &AgentEntry) -> Result<()> {
    let mut start = BytesStart::new("agent");
    push_opt(&mut start, "ROLE", agent.role.as_deref());
    push_opt(&mut start, "OTHERROLE", agent.other_role.as_deref());
    push_opt(&mut start, "TYPE", agent.agent_type.as_deref());
    push_opt(&mut start, "OTHERTYPE", agent.other_type.as_deref());
    writer.write_event(Event::Start(start))?;

    if let Some(name) = &agent.name {
        write_text_element(writer, "name", name)?;
    }
    for note in &agent.notes {
        write_text_element(writer, "note", note)?;
    }

    writer.write_event(Event::End(BytesEnd::new("agent")))?;
    Ok(())
}

fn section_element_name(kind: MdSectionKind) -> &'static str {
    match kind {
        MdSectionKind::Descriptive => "dmdSec",
        MdSectionKind::DigiProv => "digiprovMD",
        MdSectionKind::Tech => "techMD",
        MdSectionKind::Rights => "rightsMD",
        MdSectionKind::Source => "sourceMD",
    }
}

fn write_md_section(writer: &mut XmlWriter, section: &MdSection) -> Result<()> {
    let name = section_element_name(section.kind);
    let mut start = BytesStart::new(name);
    push_opt(&mut start, "ID", section.id.as_deref());
    push_opt(&mut start, "CREATED", section.created.as_deref());
    writer.write_event(Event::Start(start))?;

    if let Some(md_ref) = &section.md_ref {
        write_md_ref(writer, md_ref)?;
    }
    if let Some(wrap) = &section.md_wrap {
        let mut wrap_start = BytesStart::new("mdWrap");
        push_opt(&mut wrap_start, "ID", wrap.id.as_deref());
        push_opt(&mut wrap_start, "MDTYPE", wrap.md_type.as_deref());
        push_opt(&mut wrap_start, "OTHERMDTYPE", wrap.other_md_type.as_deref());
        push_opt(
            &mut wrap_start,
            "MDTYPEVERSION",
            wrap.md_type_version.as_deref(),
        );
        push_opt(&mut wrap_start, "MIMETYPE", wrap.mimetype.as_deref());
        push_opt(&mut wrap_start, "CREATED", wrap.created.as_deref());
        writer.write_event(Event::Start(wrap_start))?;
        writer.write_event(Event::Start(BytesStart::new("xmlData")))?;
        // already markup, not text to escape
        writer.write_event(Event::Text(BytesText::from_escaped(&wrap.xml_data)))?;
        writer.write_event(Event::End(BytesEnd::new("xmlData")))?;
        writer.write_event(Event::End(BytesEnd::new("mdWrap")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_md_ref(writer: &mut XmlWriter, md_ref: &MdRef) -> Result<()> {
    let mut start = BytesStart::new("mdRef");
    push_opt(&mut start, "ID", md_ref.id.as_deref());
    push_opt(&mut start, "LOCTYPE", md_ref.loctype.as_deref());
    push_opt(&mut start, "MDTYPE", md_ref.md_type.as_deref());
    push_opt(&mut start, "OTHERMDTYPE", md_ref.other_md_type.as_deref());
    push_opt(
        &mut start,
        "MDTYPEVERSION",
        md_ref.md_type_version.as_deref(),
    );
    push_opt(&mut start, "MIMETYPE", md_ref.mimetype.as_deref());
    push_opt(&mut start, "CREATED", md_ref.created.as_deref());
    if let Some(size) = md_ref.size {
        start.push_attribute(("SIZE", size.to_string().as_str()));
    }
    push_opt(&mut start, "CHECKSUM", md_ref.checksum.as_deref());
    push_opt(&mut start, "CHECKSUMTYPE", md_ref.checksum_type.as_deref());
    push_opt(&mut start, "xlink:href", md_ref.href.as_deref());
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

fn write_file_grp(writer: &mut XmlWriter, grp: &FileGrp) -> Result<()> {
    let mut start = BytesStart::new("fileGrp");
    push_opt(&mut start, "ID", grp.id.as_deref());
    push_opt(&mut start, "USE", grp.use_attr.as_deref());
    writer.write_event(Event::Start(start))?;

    for file in &grp.files {
        write_file_entry(writer, file)?;
    }
    for nested in &grp.groups {
        write_file_grp(writer, nested)?;
    }

    writer.write_event(Event::End(BytesEnd::new("fileGrp")))?;
    Ok(())
}

fn write_file_entry(writer: &mut XmlWriter, file: &FileEntry) -> Result<()> {
    let mut start = BytesStart::new("file");
    push_opt(&mut start, "ID", file.id.as_deref());
    push_opt(&mut start, "MIMETYPE", file.mimetype.as_deref());
    if let Some(size) = file.size {
        start.push_attribute(("SIZE", size.to_string().as_str()));
    }
    push_opt(&mut start, "CREATED", file.created.as_deref());
    push_opt(&mut start, "CHECKSUM", file.checksum.as_deref());
    push_opt(&mut start, "CHECKSUMTYPE", file.checksum_type.as_deref());
    writer.write_event(Event::Start(start))?;

    for location in &file.locations {
        let mut flocat = BytesStart::new("FLocat");
        push_opt(&mut flocat, "LOCTYPE", location.loctype.as_deref());
        push_opt(&mut flocat, "xlink:href", location.href.as_deref());
        writer.write_event(Event::Empty(flocat))?;
    }

    writer.write_event(Event::End(BytesEnd::new("file")))?;
    Ok(())
}

fn write_struct_map(writer: &mut XmlWriter, map: &StructMap) -> Result<()> {
    let mut start = BytesStart::new("structMap");
    push_opt(&mut start, "ID", map.id.as_deref());
    push_opt(&mut start, "LABEL", map.label.as_deref());
    push_opt(&mut start, "TYPE", map.type_attr.as_deref());
    writer.write_event(Event::Start(start))?;

    if let Some(root) = &map.root {
        write_div(writer, root)?;
    }

    writer.write_event(Event::End(BytesEnd::new("structMap")))?;
    Ok(())
}

fn write_div(writer: &mut XmlWriter, div: &Div) -> Result<()> {
    let mut start = BytesStart::new("div");
    push_opt(&mut start, "ID", div.id.as_deref());
    push_opt(&mut start, "LABEL", div.label.as_deref());
    push_opt(&mut start, "TYPE", div.type_attr.as_deref());
    if !div.dmd_ids.is_empty() {
        start.push_attribute(("DMDID", div.dmd_ids.join(" ").as_str()));
    }

    if div.children.is_empty() && div.file_pointers.is_empty() && div.doc_pointers.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;

    for href in &div.doc_pointers {
        let mut mptr = BytesStart::new("mptr");
        mptr.push_attribute(("LOCTYPE", "URL"));
        mptr.push_attribute(("xlink:href", href.as_str()));
        writer.write_event(Event::Empty(mptr))?;
    }
    for file_id in &div.file_pointers {
        let mut fptr = BytesStart::new("fptr");
        fptr.push_attribute(("FILEID", file_id.as_str()));
        writer.write_event(Event::Empty(fptr))?;
    }
    for child in &div.children {
        write_div(writer, child)?;
    }

    writer.write_event(Event::End(BytesEnd::new("div")))?;
    Ok(())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn push_opt(start: &mut BytesStart<'_>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        start.push_attribute((key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mets::reader;
    use crate::mets::{FileLocation, MdWrap};

    fn sample_mets() -> Mets {
        let mut mets = Mets {
            objid: Some("SIP_7".into()),
            type_attr: Some("SIP:MIXED".into()),
            profile: Some("https://earkcsip.dilcis.eu/profile/E-ARK-SIP.xml".into()),
            ..Default::default()
        };
        mets.header = Some(MetsHeader {
            create_date: Some("2024-03-01T10:00:00Z".into()),
            record_status: Some("NEW".into()),
            agents: vec![AgentEntry {
                role: Some("CREATOR".into()),
                agent_type: Some("OTHER".into()),
                other_type: Some("SOFTWARE".into()),
                name: Some("earkive".into()),
                notes: vec!["0.1.0".into()],
                ..Default::default()
            }],
            ..Default::default()
        });
        mets.md_sections.push(MdSection {
            id: Some("DMD1".into()),
            md_ref: Some(MdRef {
                id: Some("REF1".into()),
                href: Some("metadata/descriptive/dc.xml".into()),
                loctype: Some("URL".into()),
                md_type: Some("DC".into()),
                checksum: Some("00ff".into()),
                checksum_type: Some("SHA-256".into()),
                ..Default::default()
            }),
            ..MdSection::new(MdSectionKind::Descriptive)
        });
        mets.md_sections.push(MdSection {
            id: Some("AMD1".into()),
            md_wrap: Some(MdWrap {
                md_type: Some("OTHER".into()),
                other_md_type: Some("Voc_expedient".into()),
                mimetype: Some("text/xml".into()),
                xml_data: "<voc:exp xmlns:voc=\"urn:example\">x</voc:exp>".into(),
                ..Default::default()
            }),
            ..MdSection::new(MdSectionKind::DigiProv)
        });
        mets.file_grps.push(FileGrp {
            id: Some("GRP1".into()),
            use_attr: Some("Data".into()),
            files: vec![FileEntry {
                id: Some("FILE1".into()),
                size: Some(10),
                checksum_type: Some("SHA-256".into()),
                locations: vec![FileLocation {
                    href: Some("representations/rep1/data/a.txt".into()),
                    loctype: Some("URL".into()),
                }],
                ..Default::default()
            }],
            ..Default::default()
        });
        mets.struct_maps.push(StructMap {
            id: Some("CSIP".into()),
            label: Some("Common Specification structural map".into()),
            root: Some(Div {
                label: Some("SIP_7".into()),
                children: vec![Div {
                    label: Some("representations".into()),
                    children: vec![Div {
                        label: Some("rep1".into()),
                        file_pointers: vec!["FILE1".into()],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        });
        mets
    }

    #[test]
    fn test_written_document_parses_back() {
        let mets = sample_mets();
        let xml = write_string(&mets).unwrap();

        let parsed = reader::parse_str(&xml).unwrap();
        assert_eq!(parsed.objid.as_deref(), Some("SIP_7"));
        assert_eq!(parsed.md_sections.len(), 2);
        assert_eq!(parsed.md_sections[1].kind, MdSectionKind::DigiProv);
        assert!(parsed.md_sections[1]
            .md_wrap
            .as_ref()
            .unwrap()
            .xml_data
            .contains("voc:exp"));
        assert_eq!(parsed.file_grps.len(), 1);
        assert_eq!(
            parsed.file_grps[0].files[0].href(),
            Some("representations/rep1/data/a.txt")
        );
        let root = parsed.struct_maps[0].root.as_ref().unwrap();
        let reps = root.child_by_label("representations").unwrap();
        assert_eq!(reps.children[0].file_pointers, vec!["FILE1".to_string()]);
    }

    #[test]
    fn test_amd_children_share_one_amd_sec() {
        let mets = sample_mets();
        let xml = write_string(&mets).unwrap();
        assert_eq!(xml.matches("<amdSec>").count(), 1);
        assert!(xml.contains("<digiprovMD"));
    }

    #[test]
    fn test_agent_text_is_escaped() {
        let mut mets = sample_mets();
        if let Some(header) = mets.header.as_mut() {
            header.agents[0].name = Some("Arxiu <Nacional> & Co".into());
        }
        let xml = write_string(&mets).unwrap();
        assert!(xml.contains("Arxiu &lt;Nacional&gt; &amp; Co"));
    }
}
