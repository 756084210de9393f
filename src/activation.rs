//! Activation - Swaps a catalog profile into the active save directory
//!
//! Activating a profile first archives whatever is live into the catalog entry
//! that represents it (creating that entry if the live content was never
//! checked in), then copies the chosen profile over the live files. The two
//! copies are not atomic: if installing fails after archiving succeeded, the
//! old content is safe in the catalog but the active directory may be half
//! overwritten. Running the activation again is the way out of that state.

use crate::{
    catalog::{discard_dir, ProfileCatalog},
    fileset::{copy_fileset, fileset, CopyIssue, CopyPolicy},
    metadata::{MetadataStore, LINK_KEY},
    profile::ProfileRecord,
    Error, Result, ACTIVE_DIR, DEFAULT_PROFILE_NAME,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Step of an activation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStage {
    /// Creating a catalog entry for live content that has none
    Materialize,
    /// Copying the live content into its catalog entry
    Archive,
    /// Copying the chosen profile into the active directory
    Install,
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStage::Materialize => write!(f, "creating a profile for the active save"),
            ActivationStage::Archive => write!(f, "archiving the active save"),
            ActivationStage::Install => write!(f, "installing the selected profile"),
        }
    }
}

/// What a successful activation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activation {
    /// Name of the profile now live
    pub activated: String,
    /// Name the previous live content was archived under
    pub archived_as: String,
    /// True when the previous live content got a new catalog entry
    pub materialized: bool,
}

/// Swap engine bound to the active directory of one save directory
#[derive(Debug, Clone)]
pub struct ActivationEngine {
    active_dir: PathBuf,
}

impl ActivationEngine {
    pub fn new(root: &Path) -> Self {
        Self {
            active_dir: root.join(ACTIVE_DIR),
        }
    }

    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// Record describing the live content; it never belongs to the catalog
    pub fn active_record(&self) -> ProfileRecord {
        ProfileRecord::load(&self.active_dir)
    }

    /// Name of the live content, or the default name when it has none
    pub fn active_name(&self) -> String {
        let name = MetadataStore::read_name(&self.active_dir);
        if name.is_empty() {
            DEFAULT_PROFILE_NAME.to_string()
        } else {
            name
        }
    }

    /// Catalog index of the entry the live content belongs to
    ///
    /// The link written by the last activation wins; without a usable link
    /// the entry is matched by name.
    pub fn linked_index(&self, catalog: &ProfileCatalog) -> Option<usize> {
        let linked = MetadataStore::read_value(&self.active_dir, LINK_KEY)
            .and_then(|id| catalog.position(&id));
        if linked.is_some() {
            return linked;
        }
        catalog.position_by_name(&self.active_name())
    }

    /// Write a new name into the live content
    pub fn rename_active(&self, name: &str) -> Result<()> {
        MetadataStore::write_name(&self.active_dir, name)
    }

    /// Make the catalog entry at `index` the live content
    pub fn activate(&self, catalog: &mut ProfileCatalog, index: usize) -> Result<Activation> {
        let target = catalog
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("#{index}")))?;
        let active_name = self.active_name();
        log::debug!(
            "activating {:?} from {:?} over {:?} ({active_name:?})",
            target.name(),
            target.location(),
            self.active_dir
        );

        let (archived_as, materialized) = match self.linked_index(catalog) {
            Some(holder) => (self.archive_into(catalog, holder)?, false),
            None => {
                self.materialize(catalog, &active_name)?;
                (active_name, true)
            }
        };

        if let Err(e) = copy_fileset(target.location(), &self.active_dir, CopyPolicy::RequireAll) {
            let active_modified = match &e {
                Error::CopyFailed(failure) => {
                    failure.issues.len() < fileset().count()
                        || failure
                            .issues
                            .iter()
                            .any(|i| matches!(i, CopyIssue::WriteFailed { .. }))
                }
                _ => true,
            };
            return Err(failed(ActivationStage::Install, active_modified, e));
        }

        if let Err(e) = MetadataStore::write_value(&self.active_dir, LINK_KEY, target.id()) {
            log::warn!("can not record active profile link: {e}");
        }

        log::info!(
            "activated profile {:?}, previous save kept as {archived_as:?}",
            target.name()
        );
        Ok(Activation {
            activated: target.name().to_string(),
            archived_as,
            materialized,
        })
    }

    /// Copy the live content over an existing catalog entry
    ///
    /// Returns the name the entry keeps. The entry keeps its name even when
    /// the copy fails part way.
    fn archive_into(&self, catalog: &ProfileCatalog, index: usize) -> Result<String> {
        let holder = catalog.get(index).ok_or_else(|| {
            failed(
                ActivationStage::Archive,
                false,
                Error::NotFound(format!("#{index}")),
            )
        })?;

        let copied = copy_fileset(&self.active_dir, holder.location(), CopyPolicy::RequireAll);

        // the copied metadata may carry no name or a stale one
        let named = if MetadataStore::read_name(holder.location()) != holder.name() {
            MetadataStore::write_name(holder.location(), holder.name())
        } else {
            Ok(())
        };

        copied
            .and(named)
            .map_err(|e| failed(ActivationStage::Archive, false, e))?;
        Ok(holder.name().to_string())
    }

    /// Check the live content into a brand-new catalog entry named `name`
    fn materialize(&self, catalog: &mut ProfileCatalog, name: &str) -> Result<()> {
        let dir = catalog
            .create_dir()
            .map_err(|e| failed(ActivationStage::Materialize, false, e))?;

        let archived = copy_fileset(&self.active_dir, &dir, CopyPolicy::AllowMissingMetadata)
            .and_then(|()| MetadataStore::write_name(&dir, name));
        if let Err(e) = archived {
            discard_dir(&dir);
            return Err(failed(ActivationStage::Archive, false, e));
        }

        log::info!("checked the active save in as {name:?} ({dir:?})");
        catalog.insert(ProfileRecord::load(&dir));
        Ok(())
    }
}

fn failed(stage: ActivationStage, active_modified: bool, source: Error) -> Error {
    Error::ActivationFailed {
        stage,
        active_modified,
        source: Box::new(source),
    }
}
