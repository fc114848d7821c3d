//! Writing packages from the object model to disk.
//!
//! The build direction is the inverse of the parser: stage every payload and
//! metadata file into a fresh container, compute what the description
//! documents must declare, assemble and write those documents, and promote
//! the container in one move. A failed or cancelled build leaves nothing at
//! the destination.

pub mod document;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::checksum::{self, Algorithm};
use crate::container::{ContainerWriter, DirWriter};
use crate::error::{Error, Result};
use crate::mets::{writer, HrefEncoding, MdSectionKind, MAIN_DOCUMENT_NAME};
use crate::model::metadata::{DescriptiveMetadata, MetadataRecord};
use crate::model::{IPFile, IPType, InformationPackage, Representation};
use crate::profile::{zone, Profile};

use document::{DocumentBuilder, FileFacts, StructMapZones};

/// Checksum algorithm declared for staged files unless the model already
/// carries a digest.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Sha256;

/// Knobs for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub profile: Profile,
    pub href_encoding: HrefEncoding,
    pub checksum_algorithm: Algorithm,
    pub cancel: CancelToken,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            href_encoding: HrefEncoding::default(),
            checksum_algorithm: DEFAULT_ALGORITHM,
            cancel: CancelToken::default(),
        }
    }
}

/// Write `package` as a directory tree under `destination`, named by the
/// package's first identifier. Returns the path of the finished package.
pub fn build_package(
    package: &InformationPackage,
    destination: &Path,
    options: &BuildOptions,
) -> Result<PathBuf> {
    if options.profile == Profile::Legacy {
        return Err(Error::Unsupported(
            "legacy-profile packages are import-only".to_string(),
        ));
    }
    options.cancel.check()?;
    debug!(id = package.id(), dest = %destination.display(), "building package");

    let mut container = Box::new(DirWriter::create(destination.join(package.id()))?);

    let mut builder = DocumentBuilder::new(
        package.ids().join(" "),
        format!("{}:{}", package.ip_type().name(), package.content_type()),
        profile_url(package.ip_type()),
        options.href_encoding,
    );
    if let Some(description) = package.description() {
        builder.set_label(description);
    }
    builder.set_header(
        package
            .create_date()
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        package
            .modification_date()
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        Some(package.status().name().to_string()),
        package.agents(),
    );

    let mut zones = StructMapZones::default();

    stage_metadata(
        &mut builder,
        &mut zones,
        container.as_mut(),
        "",
        package.descriptive_metadata(),
        package.preservation_metadata(),
        package.other_metadata(),
        options,
    )?;

    for representation in package.representations() {
        options.cancel.check()?;
        let doc_href = build_representation(representation, container.as_mut(), options)?;
        zones
            .representations
            .push((representation.representation_id().to_string(), doc_href));
    }

    zones.schemas = stage_zone_files(
        &mut builder,
        container.as_mut(),
        "",
        zone::SCHEMAS,
        package.schemas(),
        options,
    )?;
    zones.documentation = stage_zone_files(
        &mut builder,
        container.as_mut(),
        "",
        zone::DOCUMENTATION,
        package.documentation(),
        options,
    )?;
    if package.ip_type() == IPType::Aip {
        zones.submission = stage_zone_files(
            &mut builder,
            container.as_mut(),
            "",
            zone::SUBMISSION,
            package.submissions(),
            options,
        )?;
    }

    builder.push_struct_map(document::common_struct_map(package.id(), None, &zones));
    if !package.ancestors().is_empty() {
        let encoded: Vec<String> = package
            .ancestors()
            .iter()
            .map(|a| options.href_encoding.encode(a))
            .collect();
        builder.push_struct_map(document::ancestors_struct_map(package.id(), &encoded));
    }

    let xml = writer::write_string(&builder.finish())?;
    container.write_bytes(xml.as_bytes(), Path::new(MAIN_DOCUMENT_NAME))?;

    options.cancel.check()?;
    container.finish()
}

/// Stage one representation and its nested document. Returns the
/// package-relative href of that document.
fn build_representation(
    representation: &Representation,
    container: &mut dyn ContainerWriter,
    options: &BuildOptions,
) -> Result<String> {
    let rep_id = representation.representation_id();
    let rep_prefix = format!("{}/{}", zone::REPRESENTATIONS, rep_id);

    let mut builder = DocumentBuilder::new(
        representation.object_id(),
        representation_type_attr(representation),
        REPRESENTATION_PROFILE_URL,
        options.href_encoding,
    );
    builder.set_header(
        Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        None,
        None,
        representation.agents(),
    );

    let mut zones = StructMapZones::default();
    stage_metadata(
        &mut builder,
        &mut zones,
        container,
        &rep_prefix,
        representation.descriptive_metadata(),
        representation.preservation_metadata(),
        representation.other_metadata(),
        options,
    )?;

    let mut data_group = document::group("Data");
    for file in representation.data() {
        options.cancel.check()?;
        let relative = format!("{}/{}", zone::DATA, file.relative_path());
        let facts = stage_file(container, &rep_prefix, &relative, file, options)?;
        let id = builder.add_file_entry(&mut data_group, &relative, &facts);
        zones.data.push(id);
    }
    builder.push_group(data_group);

    zones.schemas = stage_zone_files(
        &mut builder,
        container,
        &rep_prefix,
        zone::SCHEMAS,
        representation.schemas(),
        options,
    )?;
    zones.documentation = stage_zone_files(
        &mut builder,
        container,
        &rep_prefix,
        zone::DOCUMENTATION,
        representation.documentation(),
        options,
    )?;

    builder.push_struct_map(document::common_struct_map(
        rep_id,
        Some(representation.status().as_str()),
        &zones,
    ));

    let xml = writer::write_string(&builder.finish())?;
    let doc_relative = format!("{rep_prefix}/{MAIN_DOCUMENT_NAME}");
    container.write_bytes(xml.as_bytes(), Path::new(&doc_relative))?;
    Ok(doc_relative)
}

#[allow(clippy::too_many_arguments)]
fn stage_metadata(
    builder: &mut DocumentBuilder,
    zones: &mut StructMapZones,
    container: &mut dyn ContainerWriter,
    prefix: &str,
    descriptive: &[DescriptiveMetadata],
    preservation: &[MetadataRecord],
    other: &[MetadataRecord],
    options: &BuildOptions,
) -> Result<()> {
    for metadata in descriptive {
        options.cancel.check()?;
        let relative = metadata_relative(zone::DESCRIPTIVE, metadata.file());
        let facts = stage_file(container, prefix, &relative, metadata.file(), options)?;
        zones
            .descriptive
            .push(builder.add_descriptive(metadata, &relative, &facts));
    }
    for record in preservation {
        options.cancel.check()?;
        let relative = metadata_relative(zone::PRESERVATION, record.file());
        let facts = stage_file(container, prefix, &relative, record.file(), options)?;
        zones.preservation.push(builder.add_administrative(
            MdSectionKind::DigiProv,
            record,
            &relative,
            &facts,
        ));
    }
    for record in other {
        options.cancel.check()?;
        let relative = metadata_relative(zone::OTHER, record.file());
        let facts = stage_file(container, prefix, &relative, record.file(), options)?;
        zones.other.push(builder.add_administrative(
            MdSectionKind::Source,
            record,
            &relative,
            &facts,
        ));
    }
    Ok(())
}

fn stage_zone_files(
    builder: &mut DocumentBuilder,
    container: &mut dyn ContainerWriter,
    prefix: &str,
    zone_name: &str,
    files: &[IPFile],
    options: &BuildOptions,
) -> Result<Vec<String>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    let mut group = document::group(capitalized(zone_name));
    let mut ids = Vec::with_capacity(files.len());
    for file in files {
        options.cancel.check()?;
        let relative = format!("{}/{}", zone_name, file.relative_path());
        let facts = stage_file(container, prefix, &relative, file, options)?;
        ids.push(builder.add_file_entry(&mut group, &relative, &facts));
    }
    builder.push_group(group);
    Ok(ids)
}

/// Copy one model file into the container and gather what the document must
/// declare about it. A digest already carried by the model is trusted;
/// otherwise one is computed from the source.
fn stage_file(
    container: &mut dyn ContainerWriter,
    prefix: &str,
    relative: &str,
    file: &IPFile,
    options: &BuildOptions,
) -> Result<FileFacts> {
    let target = if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    };
    container.write_file(file.path(), Path::new(&target))?;

    let (checksum, checksum_type) = match (file.checksum(), file.checksum_algorithm()) {
        (Some(digest), Some(algorithm)) => (digest.to_string(), algorithm.to_string()),
        _ => {
            let digest = checksum::compute(file.path(), options.checksum_algorithm)
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            (digest, options.checksum_algorithm.name().to_string())
        }
    };
    let size = match file.size() {
        Some(size) => Some(size),
        None => fs::metadata(file.path()).ok().map(|m| m.len()),
    };
    let mimetype = file
        .mimetype()
        .map(str::to_string)
        .or_else(|| guess_mimetype(&file.file_name()).map(str::to_string));
    let created = file
        .created()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    Ok(FileFacts {
        checksum: Some(checksum),
        checksum_type: Some(checksum_type),
        size,
        mimetype,
        created: Some(created),
    })
}

fn metadata_relative(metadata_zone: &str, file: &IPFile) -> String {
    format!(
        "{}/{}/{}",
        zone::METADATA,
        metadata_zone,
        file.relative_path()
    )
}

fn representation_type_attr(representation: &Representation) -> String {
    format!("representation:{}", representation.content_type())
}

fn capitalized(zone_name: &str) -> &'static str {
    match zone_name {
        z if z == zone::SCHEMAS => "Schemas",
        z if z == zone::DOCUMENTATION => "Documentation",
        z if z == zone::SUBMISSION => "Submission",
        _ => "Data",
    }
}

/// Extension-based media-type fallback for files the model carries no
/// declared type for.
static MIMETYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "pdf" => "application/pdf",
    "xml" => "text/xml",
    "txt" => "text/plain",
    "csv" => "text/csv",
    "html" => "text/html",
    "json" => "application/json",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "tif" => "image/tiff",
    "tiff" => "image/tiff",
    "zip" => "application/zip",
    "xsd" => "text/xml",
};

fn guess_mimetype(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    MIMETYPES.get(extension.as_str()).copied()
}

fn profile_url(ip_type: IPType) -> &'static str {
    match ip_type {
        IPType::Sip => "https://earksip.dilcis.eu/profile/E-ARK-SIP.xml",
        IPType::Aip => "https://earkaip.dilcis.eu/profile/E-ARK-AIP.xml",
        IPType::Dip => "https://earkdip.dilcis.eu/profile/E-ARK-DIP.xml",
    }
}

const REPRESENTATION_PROFILE_URL: &str = "https://earkcsip.dilcis.eu/profile/E-ARK-CSIP.xml";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentType, IPAgent};

    fn package_with_payload(dir: &Path) -> InformationPackage {
        fs::write(dir.join("a.txt"), b"payload").unwrap();
        let mut package =
            InformationPackage::new(IPType::Sip, "SIP_BUILD", ContentType::mixed());
        package.add_agent(IPAgent::creator_software("earkive").with_note("0.1.0"));
        let mut rep = Representation::new("rep1");
        rep.add_file(IPFile::new(dir.join("a.txt")));
        package.add_representation(rep);
        package
    }

    #[test]
    fn test_build_writes_documents_and_payload() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("src");
        fs::create_dir(&source).unwrap();
        let package = package_with_payload(&source);

        let dest = root.path().join("out");
        let built = build_package(&package, &dest, &BuildOptions::default()).unwrap();

        assert_eq!(built, dest.join("SIP_BUILD"));
        assert!(built.join("METS.xml").is_file());
        assert!(built.join("representations/rep1/METS.xml").is_file());
        assert_eq!(
            fs::read(built.join("representations/rep1/data/a.txt")).unwrap(),
            b"payload"
        );
    }

    #[test]
    fn test_legacy_build_is_unsupported() {
        let root = tempfile::tempdir().unwrap();
        let package =
            InformationPackage::new(IPType::Sip, "SIP_1", ContentType::mixed());
        let options = BuildOptions {
            profile: Profile::Legacy,
            ..Default::default()
        };
        assert!(matches!(
            build_package(&package, root.path(), &options),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_cancelled_build_leaves_no_destination() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("src");
        fs::create_dir(&source).unwrap();
        let package = package_with_payload(&source);

        let options = BuildOptions::default();
        options.cancel.cancel();
        let dest = root.path().join("out");
        assert!(matches!(
            build_package(&package, &dest, &options),
            Err(Error::Cancelled)
        ));
        assert!(!dest.join("SIP_BUILD").exists());
    }

    #[test]
    fn test_existing_destination_rejected() {
        let root = tempfile::tempdir().unwrap();
        let package =
            InformationPackage::new(IPType::Sip, "SIP_1", ContentType::mixed());
        fs::create_dir_all(root.path().join("out/SIP_1")).unwrap();
        assert!(matches!(
            build_package(&package, &root.path().join("out"), &BuildOptions::default()),
            Err(Error::Destination(_))
        ));
    }
}
