//! Fileset - Copies the fixed set of save files between profile directories

use crate::{metadata::MetadataStore, Error, Result, CONTENT_FILES, METADATA_FILE};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// What a copy tolerates missing in its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPolicy {
    /// Every file of the fileset must be present
    RequireAll,
    /// The metadata file may be absent; it is skipped, not reported
    AllowMissingMetadata,
}

/// A single file that could not be copied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CopyIssue {
    SourceMissing { file: String },
    WriteFailed { file: String, reason: String },
}

impl CopyIssue {
    pub fn file(&self) -> &str {
        match self {
            CopyIssue::SourceMissing { file } | CopyIssue::WriteFailed { file, .. } => file,
        }
    }
}

impl fmt::Display for CopyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyIssue::SourceMissing { file } => write!(f, "source file {file} is missing"),
            CopyIssue::WriteFailed { file, reason } => {
                write!(f, "can not write {file} ({reason})")
            }
        }
    }
}

/// Every issue hit by one `copy_fileset` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    pub issues: Vec<CopyIssue>,
}

impl CopyFailure {
    /// Names of the files that were not copied
    pub fn files(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.file()).collect()
    }
}

impl fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// File names making up one profile, metadata first
pub fn fileset() -> impl Iterator<Item = &'static str> {
    std::iter::once(METADATA_FILE).chain(CONTENT_FILES)
}

/// Copy the fileset from `source` into `target`
///
/// Existing target files are replaced. A failing file does not stop the rest
/// from being copied, so on error `target` may hold a partial copy.
pub fn copy_fileset(source: &Path, target: &Path, policy: CopyPolicy) -> Result<()> {
    let mut issues = Vec::new();

    for filename in fileset() {
        let source_path = source.join(filename);
        if !source_path.exists() {
            if filename == METADATA_FILE && policy == CopyPolicy::AllowMissingMetadata {
                log::debug!("skipping absent {source_path:?}");
            } else {
                log::warn!("source file {source_path:?} is not found");
                issues.push(CopyIssue::SourceMissing {
                    file: filename.to_string(),
                });
            }
            continue;
        }

        let target_path = target.join(filename);
        if target_path.exists() {
            if let Err(e) = std::fs::remove_file(&target_path) {
                log::debug!("can not remove {target_path:?} before copy: {e}");
            }
        }
        match std::fs::copy(&source_path, &target_path) {
            Ok(bytes) => log::debug!("copied {source_path:?} to {target_path:?} ({bytes} bytes)"),
            Err(e) => {
                log::warn!("can not write to {target_path:?}: {e}");
                issues.push(CopyIssue::WriteFailed {
                    file: filename.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::CopyFailed(CopyFailure { issues }))
    }
}

/// Template contents for the save files of a brand-new profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedContent {
    blobs: [Vec<u8>; 2],
}

impl SeedContent {
    /// Seed from the two blobs, in `CONTENT_FILES` order
    pub fn new(dxb: Vec<u8>, dxg: Vec<u8>) -> Self {
        Self { blobs: [dxb, dxg] }
    }

    /// Read the templates from a directory holding files named like the content files
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let dxb = std::fs::read(dir.join(CONTENT_FILES[0]))?;
        let dxg = std::fs::read(dir.join(CONTENT_FILES[1]))?;
        Ok(Self::new(dxb, dxg))
    }

    fn files(&self) -> impl Iterator<Item = (&'static str, &[u8])> {
        CONTENT_FILES
            .into_iter()
            .zip(self.blobs.iter().map(|b| b.as_slice()))
    }
}

/// Populate `target` with the seed files and the given name
pub fn init_fileset(target: &Path, name: &str, seed: &SeedContent) -> Result<()> {
    let init_failed = |reason: String| Error::InitFailed {
        dir: target.to_path_buf(),
        reason,
    };

    for (filename, data) in seed.files() {
        if data.is_empty() {
            return Err(init_failed(format!("template for {filename} is empty")));
        }
        std::fs::write(target.join(filename), data)
            .map_err(|e| init_failed(format!("can not write {filename}: {e}")))?;
    }

    MetadataStore::write_name(target, name)
        .map_err(|e| init_failed(format!("can not write {METADATA_FILE}: {e}")))
}
