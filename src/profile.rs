//! ProfileRecord - One profile directory and its display name

use crate::{metadata::MetadataStore, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A profile directory together with the name read from its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    id: String,
    name: String,
    location: PathBuf,
}

impl ProfileRecord {
    /// Load the record stored in `dir`
    ///
    /// The id is the directory's file name. A directory without a readable name
    /// still loads, it is just not valid.
    pub fn load(dir: &Path) -> Self {
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id,
            name: MetadataStore::read_name(dir),
            location: dir.to_path_buf(),
        }
    }

    /// Stable identifier, the name of the backing directory
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// A record is valid once it carries a name
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// Persist a new name, then take it in memory
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        MetadataStore::write_name(&self.location, name)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Remove the backing directory and everything in it
    pub fn delete_from_disk(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.location) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("profile directory {:?} already gone", self.location);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
