//! Container output staging.
//!
//! Builds never write into the destination directly. Everything goes to a
//! temporary staging directory first and is promoted in one move on full
//! success, so a cancelled or failed build leaves no partial package behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};

/// Sink for the files and documents a build produces.
pub trait ContainerWriter {
    /// Copy a payload file to `relative` inside the container.
    fn write_file(&mut self, source: &Path, relative: &Path) -> Result<()>;

    /// Write in-memory content (description documents, externalized
    /// metadata) to `relative` inside the container.
    fn write_bytes(&mut self, content: &[u8], relative: &Path) -> Result<()>;

    /// Promote the staged content to the final destination. Consumes the
    /// writer; anything not finished is discarded with the staging
    /// directory.
    fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// Directory-tree container writer with temp-dir staging.
pub struct DirWriter {
    staging: TempDir,
    destination: PathBuf,
}

impl DirWriter {
    /// `destination` is the package directory to create. It must not already
    /// exist.
    pub fn create(destination: impl Into<PathBuf>) -> Result<Self> {
        let destination = destination.into();
        if destination.exists() {
            return Err(Error::Destination(destination));
        }
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;
        // staged next to the destination so the final promote is a rename
        let staging = TempDir::new_in(&parent)?;
        Ok(Self {
            staging,
            destination,
        })
    }

    pub fn staging_path(&self) -> &Path {
        self.staging.path()
    }

    fn target(&self, relative: &Path) -> Result<PathBuf> {
        if relative.is_absolute() {
            return Err(Error::Destination(relative.to_path_buf()));
        }
        let target = self.staging.path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(target)
    }
}

impl ContainerWriter for DirWriter {
    fn write_file(&mut self, source: &Path, relative: &Path) -> Result<()> {
        let target = self.target(relative)?;
        let mut reader = File::open(source)?;
        let mut writer = BufWriter::new(File::create(&target)?);
        io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_bytes(&mut self, content: &[u8], relative: &Path) -> Result<()> {
        let target = self.target(relative)?;
        fs::write(target, content)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        let staged = self.staging.keep();
        match fs::rename(&staged, &self.destination) {
            Ok(()) => Ok(self.destination),
            Err(_) => {
                // staging may sit on another filesystem; fall back to a copy
                copy_tree(&staged, &self.destination)?;
                fs::remove_dir_all(&staged)?;
                Ok(self.destination)
            }
        }
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
