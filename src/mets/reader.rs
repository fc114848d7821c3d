//! Streaming description-document reader.
//!
//! One recursive-descent pass over the XML event stream; each element of
//! interest has a small reader function that consumes events up to its own
//! end tag. Namespace prefixes are ignored (matching is on local names), so
//! documents from tooling that prefixes the vocabulary differently all
//! parse the same. Inline `xmlData` bodies are captured verbatim by
//! re-serializing their event span, so the metadata resolver can later
//! materialize them to standalone files without this module understanding
//! their schema.

use std::io::{BufRead, Cursor};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::mets::{
    AgentEntry, Div, FileEntry, FileGrp, FileLocation, MdRef, MdSection, MdSectionKind, MdWrap,
    Mets, MetsHeader, StructMap,
};

/// Read a description document from a file.
pub fn parse_file(path: &Path) -> Result<Mets> {
    let mut reader = Reader::from_file(path)?;
    reader.config_mut().trim_text(true);
    parse_document(&mut reader)
}

/// Read a description document from an in-memory string.
pub fn parse_str(xml: &str) -> Result<Mets> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    parse_document(&mut reader)
}

fn parse_document<R: BufRead>(reader: &mut Reader<R>) -> Result<Mets> {
    let mut buf = Vec::new();
    let mut mets: Option<Mets> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"mets" => {
                let mut doc = Mets {
                    objid: attr(e, b"OBJID")?,
                    type_attr: attr(e, b"TYPE")?,
                    label: attr(e, b"LABEL")?,
                    profile: attr(e, b"PROFILE")?,
                    ..Default::default()
                };
                read_mets_children(reader, &mut doc)?;
                mets = Some(doc);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    mets.ok_or_else(|| Error::DescriptionDocument("document has no root element".to_string()))
}

fn read_mets_children<R: BufRead>(reader: &mut Reader<R>, mets: &mut Mets) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"metsHdr" => {
                    let header = read_header(reader, e)?;
                    mets.header = Some(header);
                }
                b"dmdSec" => {
                    let section = read_md_section(reader, e, MdSectionKind::Descriptive)?;
                    mets.md_sections.push(section);
                }
                b"amdSec" => read_amd_sec(reader, mets)?,
                b"fileSec" => read_file_sec(reader, mets)?,
                b"structMap" => {
                    let map = read_struct_map(reader, e)?;
                    mets.struct_maps.push(map);
                }
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(ref e) if e.local_name().as_ref() == b"mets" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unexpected end of document".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn read_header<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<MetsHeader> {
    let mut header = MetsHeader {
        create_date: attr(start, b"CREATEDATE")?,
        last_mod_date: attr(start, b"LASTMODDATE")?,
        record_status: attr(start, b"RECORDSTATUS")?,
        agents: Vec::new(),
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"agent" => {
                let agent = read_agent(reader, e)?;
                header.agents.push(agent);
            }
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"metsHdr" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated header".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(header)
}

fn read_agent<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<AgentEntry> {
    let mut agent = AgentEntry {
        role: attr(start, b"ROLE")?,
        other_role: attr(start, b"OTHERROLE")?,
        agent_type: attr(start, b"TYPE")?,
        other_type: attr(start, b"OTHERTYPE")?,
        name: None,
        notes: Vec::new(),
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"name" => {
                agent.name = Some(read_text(reader, b"name")?);
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"note" => {
                agent.notes.push(read_text(reader, b"note")?);
            }
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"agent" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument("unterminated agent".to_string()))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(agent)
}

/// `amdSec` is only a container; each child kind becomes its own section.
fn read_amd_sec<R: BufRead>(reader: &mut Reader<R>, mets: &mut Mets) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let kind = match e.local_name().as_ref() {
                    b"digiprovMD" => Some(MdSectionKind::DigiProv),
                    b"techMD" => Some(MdSectionKind::Tech),
                    b"rightsMD" => Some(MdSectionKind::Rights),
                    b"sourceMD" => Some(MdSectionKind::Source),
                    _ => None,
                };
                match kind {
                    Some(kind) => {
                        let section = read_md_section(reader, e, kind)?;
                        mets.md_sections.push(section);
                    }
                    None => {
                        let name = e.local_name().as_ref().to_vec();
                        skip_element(reader, &name)?;
                    }
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"amdSec" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated amdSec".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn section_end_name(kind: MdSectionKind) -> &'static [u8] {
    match kind {
        MdSectionKind::Descriptive => b"dmdSec",
        MdSectionKind::DigiProv => b"digiprovMD",
        MdSectionKind::Tech => b"techMD",
        MdSectionKind::Rights => b"rightsMD",
        MdSectionKind::Source => b"sourceMD",
    }
}

fn read_md_section<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    kind: MdSectionKind,
) -> Result<MdSection> {
    let mut section = MdSection::new(kind);
    section.id = attr(start, b"ID")?;
    section.created = attr(start, b"CREATED")?;

    let end_name = section_end_name(kind);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) if e.local_name().as_ref() == b"mdRef" => {
                section.md_ref = Some(read_md_ref(e)?);
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"mdRef" => {
                section.md_ref = Some(read_md_ref(e)?);
                skip_element(reader, b"mdRef")?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"mdWrap" => {
                section.md_wrap = Some(read_md_wrap(reader, e)?);
            }
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == end_name => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated metadata section".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(section)
}

fn read_md_ref(e: &BytesStart<'_>) -> Result<MdRef> {
    Ok(MdRef {
        id: attr(e, b"ID")?,
        href: attr(e, b"href")?,
        loctype: attr(e, b"LOCTYPE")?,
        md_type: attr(e, b"MDTYPE")?,
        other_md_type: attr(e, b"OTHERMDTYPE")?,
        md_type_version: attr(e, b"MDTYPEVERSION")?,
        mimetype: attr(e, b"MIMETYPE")?,
        created: attr(e, b"CREATED")?,
        size: attr(e, b"SIZE")?.and_then(|s| s.parse().ok()),
        checksum: attr(e, b"CHECKSUM")?,
        checksum_type: attr(e, b"CHECKSUMTYPE")?,
    })
}

fn read_md_wrap<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<MdWrap> {
    let mut wrap = MdWrap {
        id: attr(start, b"ID")?,
        md_type: attr(start, b"MDTYPE")?,
        other_md_type: attr(start, b"OTHERMDTYPE")?,
        md_type_version: attr(start, b"MDTYPEVERSION")?,
        mimetype: attr(start, b"MIMETYPE")?,
        created: attr(start, b"CREATED")?,
        xml_data: String::new(),
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"xmlData" => {
                wrap.xml_data = capture_raw_xml(reader, b"xmlData")?;
            }
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"mdWrap" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated mdWrap".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(wrap)
}

/// Re-serialize everything up to the matching end tag into a string,
/// preserving the markup byte-for-byte apart from formatting whitespace
/// trimmed by the reader configuration.
fn capture_raw_xml<R: BufRead>(reader: &mut Reader<R>, end_name: &[u8]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(_) => {
                depth += 1;
                writer.write_event(event)?;
            }
            Event::End(ref e) => {
                if depth == 0 && e.local_name().as_ref() == end_name {
                    break;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(event)?;
            }
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated inline metadata".to_string(),
                ))
            }
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

fn read_file_sec<R: BufRead>(reader: &mut Reader<R>, mets: &mut Mets) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"fileGrp" => {
                let grp = read_file_grp(reader, e)?;
                mets.file_grps.push(grp);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"fileSec" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated fileSec".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn read_file_grp<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<FileGrp> {
    let mut grp = FileGrp {
        id: attr(start, b"ID")?,
        use_attr: attr(start, b"USE")?,
        ..Default::default()
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"fileGrp" => {
                let nested = read_file_grp(reader, e)?;
                grp.groups.push(nested);
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"file" => {
                let file = read_file_entry(reader, e)?;
                grp.files.push(file);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"fileGrp" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated fileGrp".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(grp)
}

fn read_file_entry<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<FileEntry> {
    let mut file = FileEntry {
        id: attr(start, b"ID")?,
        mimetype: attr(start, b"MIMETYPE")?,
        size: attr(start, b"SIZE")?.and_then(|s| s.parse().ok()),
        created: attr(start, b"CREATED")?,
        checksum: attr(start, b"CHECKSUM")?,
        checksum_type: attr(start, b"CHECKSUMTYPE")?,
        locations: Vec::new(),
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"FLocat" => {
                file.locations.push(FileLocation {
                    href: attr(e, b"href")?,
                    loctype: attr(e, b"LOCTYPE")?,
                });
            }
            Event::End(ref e) if e.local_name().as_ref() == b"file" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument("unterminated file".to_string()))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(file)
}

fn read_struct_map<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<StructMap> {
    let mut map = StructMap {
        id: attr(start, b"ID")?,
        label: attr(start, b"LABEL")?,
        type_attr: attr(start, b"TYPE")?,
        root: None,
    };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"div" => {
                map.root = Some(read_div(reader, e)?);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"structMap" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated structMap".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

fn read_div<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<Div> {
    let mut div = div_from_attrs(start)?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"div" => {
                let child = read_div(reader, e)?;
                div.children.push(child);
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"div" => {
                div.children.push(div_from_attrs(e)?);
            }
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"fptr" => {
                if let Some(file_id) = attr(e, b"FILEID")? {
                    div.file_pointers.push(file_id);
                }
            }
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"mptr" => {
                if let Some(href) = attr(e, b"href")? {
                    div.doc_pointers.push(href);
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"div" => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument("unterminated div".to_string()))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(div)
}

fn div_from_attrs(e: &BytesStart<'_>) -> Result<Div> {
    Ok(Div {
        id: attr(e, b"ID")?,
        label: attr(e, b"LABEL")?,
        type_attr: attr(e, b"TYPE")?,
        dmd_ids: attr(e, b"DMDID")?
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        ..Default::default()
    })
}

/// Consume events until the end tag of an element we do not interpret.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<()> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == name => depth += 1,
            Event::End(ref e) if e.local_name().as_ref() == name => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unexpected end of document".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

fn read_text<R: BufRead>(reader: &mut Reader<R>, end_name: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(ref t) => {
                let text = reader.decoder().decode(t)?;
                out.push_str(&quick_xml::escape::unescape(&text)?);
            }
            Event::End(ref e) if e.local_name().as_ref() == end_name => break,
            Event::Eof => {
                return Err(Error::DescriptionDocument(
                    "unterminated text element".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Attribute lookup by local name, tolerating namespace prefixes such as
/// `xlink:href`.
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink"
      OBJID="SIP_1" TYPE="SIP:MIXED" LABEL="Sample package">
  <metsHdr CREATEDATE="2024-03-01T10:00:00Z" RECORDSTATUS="NEW">
    <agent ROLE="CREATOR" TYPE="OTHER" OTHERTYPE="SOFTWARE">
      <name>earkive</name>
      <note>version 0.1.0</note>
    </agent>
  </metsHdr>
  <dmdSec ID="DMD1" CREATED="2024-03-01T10:00:00Z">
    <mdRef ID="REF1" LOCTYPE="URL" MDTYPE="DC" MIMETYPE="text/xml"
           CHECKSUM="abcd" CHECKSUMTYPE="SHA-256" SIZE="120"
           xlink:href="metadata/descriptive/dc.xml"/>
  </dmdSec>
  <amdSec>
    <digiprovMD ID="AMD1">
      <mdWrap ID="W1" MDTYPE="OTHER" OTHERMDTYPE="Voc_expedient" MIMETYPE="text/xml">
        <xmlData><voc:expedient xmlns:voc="urn:example:voc"><voc:title>Exp 1 &amp; 2</voc:title></voc:expedient></xmlData>
      </mdWrap>
    </digiprovMD>
  </amdSec>
  <fileSec>
    <fileGrp ID="GRP_DATA" USE="Data">
      <file ID="FILE1" MIMETYPE="application/pdf" SIZE="1024" CHECKSUM="ff00" CHECKSUMTYPE="SHA-256">
        <FLocat LOCTYPE="URL" xlink:href="representations/rep1/data/report.pdf"/>
      </file>
    </fileGrp>
  </fileSec>
  <structMap ID="CSIP" LABEL="Common Specification structural map">
    <div LABEL="SIP_1">
      <div LABEL="metadata" DMDID="DMD1 AMD1">
        <div LABEL="descriptive"/>
      </div>
      <div LABEL="representations">
        <div LABEL="rep1">
          <fptr FILEID="FILE1"/>
          <mptr xlink:href="representations/rep1/METS.xml"/>
        </div>
      </div>
    </div>
  </structMap>
</mets>"#;

    #[test]
    fn test_parses_root_attributes_and_header() {
        let mets = parse_str(SAMPLE).unwrap();
        assert_eq!(mets.objid.as_deref(), Some("SIP_1"));
        assert_eq!(mets.type_attr.as_deref(), Some("SIP:MIXED"));
        let header = mets.header.unwrap();
        assert_eq!(header.record_status.as_deref(), Some("NEW"));
        assert_eq!(header.agents.len(), 1);
        assert_eq!(header.agents[0].name.as_deref(), Some("earkive"));
        assert_eq!(header.agents[0].notes, vec!["version 0.1.0".to_string()]);
    }

    #[test]
    fn test_parses_md_sections_of_both_shapes() {
        let mets = parse_str(SAMPLE).unwrap();
        assert_eq!(mets.md_sections.len(), 2);

        let dmd = &mets.md_sections[0];
        assert_eq!(dmd.kind, MdSectionKind::Descriptive);
        let md_ref = dmd.md_ref.as_ref().unwrap();
        assert_eq!(md_ref.href.as_deref(), Some("metadata/descriptive/dc.xml"));
        assert_eq!(md_ref.size, Some(120));

        let amd = &mets.md_sections[1];
        assert_eq!(amd.kind, MdSectionKind::DigiProv);
        let wrap = amd.md_wrap.as_ref().unwrap();
        assert_eq!(wrap.other_md_type.as_deref(), Some("Voc_expedient"));
        assert!(wrap.xml_data.contains("<voc:expedient"));
        assert!(wrap.xml_data.contains("Exp 1 &amp; 2"));
    }

    #[test]
    fn test_parses_file_sec_and_struct_map() {
        let mets = parse_str(SAMPLE).unwrap();
        assert_eq!(mets.file_grps.len(), 1);
        let file = &mets.file_grps[0].files[0];
        assert_eq!(
            file.href(),
            Some("representations/rep1/data/report.pdf")
        );

        let map = &mets.struct_maps[0];
        assert_eq!(map.id.as_deref(), Some("CSIP"));
        let root = map.root.as_ref().unwrap();
        let metadata = root.child_by_label("metadata").unwrap();
        assert_eq!(metadata.dmd_ids, vec!["DMD1".to_string(), "AMD1".to_string()]);
        let reps = root.child_by_label("representations").unwrap();
        let rep1 = &reps.children[0];
        assert_eq!(rep1.file_pointers, vec!["FILE1".to_string()]);
        assert_eq!(
            rep1.doc_pointers,
            vec!["representations/rep1/METS.xml".to_string()]
        );
    }

    #[test]
    fn test_text_content_is_unescaped() {
        let mets = parse_str(
            r#"<?xml version="1.0"?>
<mets xmlns="http://www.loc.gov/METS/">
  <metsHdr>
    <agent><name>Arxiu &amp; Co. &lt;dept&gt;</name></agent>
  </metsHdr>
</mets>"#,
        )
        .unwrap();
        let header = mets.header.unwrap();
        assert_eq!(
            header.agents[0].name.as_deref(),
            Some("Arxiu & Co. <dept>")
        );
    }

    #[test]
    fn test_rejects_non_document_input() {
        assert!(parse_str("not xml at all").is_err());
        assert!(parse_str("<unrelated/>").is_err());
    }
}
