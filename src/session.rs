//! Session - The profile operations a host application drives

use crate::{
    activation::{Activation, ActivationEngine},
    catalog::{CatalogEvent, ProfileCatalog},
    config::check_save_dir,
    fileset::SeedContent,
    profile::ProfileRecord,
    Error, Result,
};
use std::path::{Path, PathBuf};

/// Top level: owns the catalog and the swap engine of one save directory
pub struct ProfileSession {
    root: PathBuf,
    catalog: ProfileCatalog,
    engine: ActivationEngine,
    seed: Option<SeedContent>,
}

impl ProfileSession {
    /// Open the save directory at `root` and scan its profiles
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        check_save_dir(&root)?;
        let catalog = ProfileCatalog::open(&root)?;
        let engine = ActivationEngine::new(&root);
        log::debug!("opened {root:?} with {} profiles", catalog.len());

        Ok(Self {
            root,
            catalog,
            engine,
            seed: None,
        })
    }

    /// Open a save directory the user just picked and hand it to `persist`
    ///
    /// `persist` only runs when the directory turned out to be usable.
    pub fn open_selected<F>(root: impl Into<PathBuf>, persist: F) -> Result<Self>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let session = Self::open(root)?;
        persist(&session.root)?;
        Ok(session)
    }

    /// Move this session to another save directory
    pub fn switch_root<F>(&mut self, root: impl Into<PathBuf>, persist: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let root = root.into();
        check_save_dir(&root)?;
        persist(&root)?;

        self.catalog.switch_root(&root)?;
        self.engine = ActivationEngine::new(&root);
        self.root = root;
        Ok(())
    }

    /// Templates used by `create_profile`
    pub fn with_seed(mut self, seed: SeedContent) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn set_seed(&mut self, seed: SeedContent) {
        self.seed = Some(seed);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    /// Get told about every change of the profile list
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&CatalogEvent) + 'static,
    {
        self.catalog.subscribe(observer);
    }

    pub fn list_profiles(&self) -> &[ProfileRecord] {
        self.catalog.profiles()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ProfileRecord> {
        self.catalog.find_by_name(name)
    }

    /// Rescan the save directory
    pub fn reload(&mut self) -> Result<()> {
        check_save_dir(&self.root)?;
        self.catalog.reload()
    }

    /// Name of the live content, the default name when it has none
    pub fn current_active_name(&self) -> String {
        self.engine.active_name()
    }

    /// Catalog entry the live content belongs to, if it was ever checked in
    pub fn current_profile(&self) -> Option<&ProfileRecord> {
        self.engine
            .linked_index(&self.catalog)
            .and_then(|index| self.catalog.get(index))
    }

    /// Create a profile from the seed templates
    pub fn create_profile(&mut self, name: &str) -> Result<ProfileRecord> {
        let seed = self.seed.as_ref().ok_or_else(|| Error::InitFailed {
            dir: self.catalog.profiles_dir(),
            reason: "no template save files configured".to_string(),
        })?;
        self.catalog.create_new(name, seed)
    }

    /// Rename a profile
    ///
    /// When the profile is the one currently live, the live content is renamed
    /// as well.
    pub fn rename_profile(&mut self, id: &str, new_name: &str) -> Result<()> {
        let index = self.index_of(id)?;
        let is_live = self.engine.linked_index(&self.catalog) == Some(index);

        self.catalog.rename(index, new_name)?;
        if is_live {
            log::debug!("profile {id} is live, renaming the active save too");
            self.engine.rename_active(new_name)?;
        }
        Ok(())
    }

    /// Delete a profile and its directory
    ///
    /// Deleting the entry of the live content leaves the live files alone; the
    /// next activation checks them in again.
    pub fn delete_profile(&mut self, id: &str) -> Result<ProfileRecord> {
        let index = self.index_of(id)?;
        self.catalog.remove(index)
    }

    /// Swap the profile into the active directory
    pub fn activate_profile(&mut self, id: &str) -> Result<Activation> {
        let index = self.index_of(id)?;
        self.engine.activate(&mut self.catalog, index)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.catalog
            .position(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}
