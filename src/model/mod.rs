//! In-memory package object model.
//!
//! The aggregate root is [`InformationPackage`]; everything it owns has
//! already passed existence and checksum validation. Anything that failed
//! resolution exists only as an entry in the package's
//! [`ValidationReport`](crate::report::ValidationReport).

pub mod agent;
pub mod content_type;
pub mod file;
pub mod metadata;
pub mod metadata_type;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::report::ValidationReport;

pub use agent::{AgentType, IPAgent};
pub use content_type::{ContentType, ContentTypeKind, IPStatus, IPType};
pub use file::IPFile;
pub use metadata::{DescriptiveMetadata, MetadataRecord};
pub use metadata_type::{MetadataCategory, MetadataType};

/// Status of one representation relative to the original submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentationStatus {
    name: String,
}

impl RepresentationStatus {
    pub const ORIGINAL: &'static str = "ORIGINAL";
    pub const NORMALIZED: &'static str = "NORMALIZED";

    pub fn original() -> Self {
        Self {
            name: Self::ORIGINAL.to_string(),
        }
    }

    pub fn normalized() -> Self {
        Self {
            name: Self::NORMALIZED.to_string(),
        }
    }

    /// Any free-text status is preserved verbatim; an absent one means
    /// ORIGINAL.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() => Self {
                name: s.to_string(),
            },
            _ => Self::original(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl Default for RepresentationStatus {
    fn default() -> Self {
        Self::original()
    }
}

impl fmt::Display for RepresentationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One version/rendition of the package's content, with its own files and
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct Representation {
    representation_id: String,
    object_id: String,
    content_type: ContentType,
    status: RepresentationStatus,
    agents: Vec<IPAgent>,
    descriptive_metadata: Vec<DescriptiveMetadata>,
    preservation_metadata: Vec<MetadataRecord>,
    other_metadata: Vec<MetadataRecord>,
    data: Vec<IPFile>,
    schemas: Vec<IPFile>,
    documentation: Vec<IPFile>,
}

impl Representation {
    pub fn new(representation_id: impl Into<String>) -> Self {
        let id = representation_id.into();
        Self {
            object_id: id.clone(),
            representation_id: id,
            ..Default::default()
        }
    }

    pub fn representation_id(&self) -> &str {
        &self.representation_id
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn set_object_id(&mut self, object_id: impl Into<String>) {
        self.object_id = object_id.into();
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn status(&self) -> &RepresentationStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: RepresentationStatus) {
        self.status = status;
    }

    pub fn agents(&self) -> &[IPAgent] {
        &self.agents
    }

    pub fn add_agent(&mut self, agent: IPAgent) {
        self.agents.push(agent);
    }

    pub fn descriptive_metadata(&self) -> &[DescriptiveMetadata] {
        &self.descriptive_metadata
    }

    pub fn add_descriptive_metadata(&mut self, metadata: DescriptiveMetadata) {
        self.descriptive_metadata.push(metadata);
    }

    pub fn preservation_metadata(&self) -> &[MetadataRecord] {
        &self.preservation_metadata
    }

    pub fn add_preservation_metadata(&mut self, metadata: MetadataRecord) {
        self.preservation_metadata.push(metadata);
    }

    pub fn other_metadata(&self) -> &[MetadataRecord] {
        &self.other_metadata
    }

    pub fn add_other_metadata(&mut self, metadata: MetadataRecord) {
        self.other_metadata.push(metadata);
    }

    pub fn data(&self) -> &[IPFile] {
        &self.data
    }

    pub fn add_file(&mut self, file: IPFile) {
        self.data.push(file);
    }

    pub fn schemas(&self) -> &[IPFile] {
        &self.schemas
    }

    pub fn add_schema(&mut self, file: IPFile) {
        self.schemas.push(file);
    }

    pub fn documentation(&self) -> &[IPFile] {
        &self.documentation
    }

    pub fn add_documentation(&mut self, file: IPFile) {
        self.documentation.push(file);
    }
}

/// Root aggregate for one information package.
#[derive(Debug)]
pub struct InformationPackage {
    ids: Vec<String>,
    ip_type: IPType,
    content_type: ContentType,
    status: IPStatus,
    description: Option<String>,
    create_date: Option<DateTime<Utc>>,
    modification_date: Option<DateTime<Utc>>,
    agents: Vec<IPAgent>,
    descriptive_metadata: Vec<DescriptiveMetadata>,
    preservation_metadata: Vec<MetadataRecord>,
    other_metadata: Vec<MetadataRecord>,
    representations: Vec<Representation>,
    schemas: Vec<IPFile>,
    documentation: Vec<IPFile>,
    /// Populated for the archival role only.
    submissions: Vec<IPFile>,
    ancestors: Vec<String>,
    base_path: Option<PathBuf>,
    report: ValidationReport,
}

impl InformationPackage {
    pub fn new(ip_type: IPType, id: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            ids: vec![id.into()],
            ip_type,
            content_type,
            status: IPStatus::New,
            description: None,
            create_date: Some(Utc::now()),
            modification_date: None,
            agents: Vec::new(),
            descriptive_metadata: Vec::new(),
            preservation_metadata: Vec::new(),
            other_metadata: Vec::new(),
            representations: Vec::new(),
            schemas: Vec::new(),
            documentation: Vec::new(),
            submissions: Vec::new(),
            ancestors: Vec::new(),
            base_path: None,
            report: ValidationReport::new(),
        }
    }

    /// First external identifier.
    pub fn id(&self) -> &str {
        self.ids.first().map(String::as_str).unwrap_or_default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn set_ids(&mut self, ids: Vec<String>) {
        self.ids = ids;
    }

    pub fn ip_type(&self) -> IPType {
        self.ip_type
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn status(&self) -> IPStatus {
        self.status
    }

    pub fn set_status(&mut self, status: IPStatus) {
        self.status = status;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn create_date(&self) -> Option<DateTime<Utc>> {
        self.create_date
    }

    pub fn set_create_date(&mut self, date: Option<DateTime<Utc>>) {
        self.create_date = date;
    }

    pub fn modification_date(&self) -> Option<DateTime<Utc>> {
        self.modification_date
    }

    pub fn set_modification_date(&mut self, date: Option<DateTime<Utc>>) {
        self.modification_date = date;
    }

    pub fn agents(&self) -> &[IPAgent] {
        &self.agents
    }

    pub fn add_agent(&mut self, agent: IPAgent) {
        self.agents.push(agent);
    }

    pub fn descriptive_metadata(&self) -> &[DescriptiveMetadata] {
        &self.descriptive_metadata
    }

    pub fn add_descriptive_metadata(&mut self, metadata: DescriptiveMetadata) {
        self.descriptive_metadata.push(metadata);
    }

    pub fn preservation_metadata(&self) -> &[MetadataRecord] {
        &self.preservation_metadata
    }

    pub fn add_preservation_metadata(&mut self, metadata: MetadataRecord) {
        self.preservation_metadata.push(metadata);
    }

    pub fn other_metadata(&self) -> &[MetadataRecord] {
        &self.other_metadata
    }

    pub fn add_other_metadata(&mut self, metadata: MetadataRecord) {
        self.other_metadata.push(metadata);
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    pub fn add_representation(&mut self, representation: Representation) {
        self.representations.push(representation);
    }

    /// Whether a representation with this identifier is already present.
    pub fn has_representation(&self, representation_id: &str) -> bool {
        self.representations
            .iter()
            .any(|r| r.representation_id() == representation_id)
    }

    pub fn schemas(&self) -> &[IPFile] {
        &self.schemas
    }

    pub fn add_schema(&mut self, file: IPFile) {
        self.schemas.push(file);
    }

    pub fn documentation(&self) -> &[IPFile] {
        &self.documentation
    }

    pub fn add_documentation(&mut self, file: IPFile) {
        self.documentation.push(file);
    }

    pub fn submissions(&self) -> &[IPFile] {
        &self.submissions
    }

    /// Submission files only exist for the archival role.
    pub fn add_submission(&mut self, file: IPFile) {
        debug_assert_eq!(self.ip_type, IPType::Aip);
        self.submissions.push(file);
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn set_ancestors(&mut self, ancestors: Vec<String>) {
        self.ancestors = ancestors;
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn set_base_path(&mut self, base_path: impl Into<PathBuf>) {
        self.base_path = Some(base_path.into());
    }

    pub fn validation_report(&self) -> &ValidationReport {
        &self.report
    }

    /// Hand the report over when the pipeline that produced it finishes.
    pub(crate) fn set_validation_report(&mut self, report: ValidationReport) {
        self.report = report;
    }
}
