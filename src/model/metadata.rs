//! Metadata records: a resolved file plus its classified type.

use chrono::{DateTime, Utc};

use crate::model::file::IPFile;
use crate::model::metadata_type::MetadataType;

/// A preservation/other metadata record, or the core of a descriptive one.
#[derive(Debug, Clone)]
pub struct MetadataRecord {
    id: Option<String>,
    file: IPFile,
    metadata_type: MetadataType,
    created: Option<DateTime<Utc>>,
}

impl MetadataRecord {
    pub fn new(file: IPFile, metadata_type: MetadataType) -> Self {
        Self {
            id: None,
            file,
            metadata_type,
            created: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn file(&self) -> &IPFile {
        &self.file
    }

    pub fn metadata_type(&self) -> &MetadataType {
        &self.metadata_type
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }
}

/// A descriptive metadata record; additionally tracks the schema-declared
/// type version.
#[derive(Debug, Clone)]
pub struct DescriptiveMetadata {
    record: MetadataRecord,
    metadata_version: Option<String>,
}

impl DescriptiveMetadata {
    pub fn new(file: IPFile, metadata_type: MetadataType, version: Option<String>) -> Self {
        Self {
            record: MetadataRecord::new(file, metadata_type),
            metadata_version: version,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.record = self.record.with_id(id);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.record = self.record.with_created(created);
        self
    }

    pub fn record(&self) -> &MetadataRecord {
        &self.record
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id()
    }

    pub fn file(&self) -> &IPFile {
        self.record.file()
    }

    pub fn metadata_type(&self) -> &MetadataType {
        self.record.metadata_type()
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.record.created()
    }

    pub fn metadata_version(&self) -> Option<&str> {
        self.metadata_version.as_deref()
    }
}
