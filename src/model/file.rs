//! Resolved file references.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use smallvec::SmallVec;

/// Folder segments between a zone root and a file, almost always zero to
/// two deep.
pub type FolderSegments = SmallVec<[String; 4]>;

/// A file that has been resolved and validated against its declared
/// reference. Constructed by the file resolver (parse direction) or by the
/// caller (build direction); never mutated after construction, renames
/// produce a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPFile {
    /// Absolute path on local storage.
    path: PathBuf,
    /// Explicit rename; when absent the on-disk basename is the logical name.
    rename: Option<String>,
    /// Folder segments relative to the owning zone's root, preserving
    /// subfolder layout across a rebuild.
    relative_folders: FolderSegments,
    checksum: Option<String>,
    checksum_algorithm: Option<String>,
    mimetype: Option<String>,
    size: Option<u64>,
    created: Option<DateTime<Utc>>,
}

impl IPFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rename: None,
            relative_folders: FolderSegments::new(),
            checksum: None,
            checksum_algorithm: None,
            mimetype: None,
            size: None,
            created: None,
        }
    }

    /// Copy-on-rename: same file, different logical name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn with_relative_folders(mut self, folders: impl Into<FolderSegments>) -> Self {
        self.relative_folders = folders.into();
        self
    }

    pub fn with_checksum(
        mut self,
        algorithm: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        self.checksum_algorithm = Some(algorithm.into());
        self.checksum = Some(digest.into());
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical filename: the explicit rename if one was set, otherwise the
    /// on-disk basename.
    pub fn file_name(&self) -> String {
        match &self.rename {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn relative_folders(&self) -> &[String] {
        &self.relative_folders
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn checksum_algorithm(&self) -> Option<&str> {
        self.checksum_algorithm.as_deref()
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Zone-relative location: folder segments joined with the logical name.
    pub fn relative_path(&self) -> String {
        let mut out = String::new();
        for folder in &self.relative_folders {
            out.push_str(folder);
            out.push('/');
        }
        out.push_str(&self.file_name());
        out
    }
}

/// Folder segments of `file` relative to `zone_root`, excluding the filename
/// itself. Empty when the file sits directly in the zone root or outside it.
pub fn relative_folders(zone_root: &Path, file: &Path) -> FolderSegments {
    match file.parent().and_then(|p| p.strip_prefix(zone_root).ok()) {
        Some(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
        None => FolderSegments::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_rename_when_present() {
        let file = IPFile::new("/data/blob.bin");
        assert_eq!(file.file_name(), "blob.bin");
        let renamed = file.clone().with_file_name("object.bin");
        assert_eq!(renamed.file_name(), "object.bin");
        // the original is untouched
        assert_eq!(file.file_name(), "blob.bin");
    }

    #[test]
    fn test_relative_path_preserves_subfolders() {
        let file = IPFile::new("/somewhere/deep/report.pdf")
            .with_relative_folders(vec!["minutes".into(), "2024".into()]);
        assert_eq!(file.relative_path(), "minutes/2024/report.pdf");
    }

    #[test]
    fn test_relative_folders_helper() {
        let zone = Path::new("/ip/representations/rep1/data");
        let file = Path::new("/ip/representations/rep1/data/sub/a.txt");
        assert_eq!(relative_folders(zone, file).as_slice(), ["sub".to_string()]);

        let at_root = Path::new("/ip/representations/rep1/data/a.txt");
        assert!(relative_folders(zone, at_root).is_empty());

        let outside = Path::new("/elsewhere/a.txt");
        assert!(relative_folders(zone, outside).is_empty());
    }
}
