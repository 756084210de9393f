//! ProfileCatalog - The known inactive profiles of one save directory

use crate::{
    fileset::{init_fileset, SeedContent},
    metadata::MetadataStore,
    profile::ProfileRecord,
    Error, Result, PROFILES_DIR, RESERVED_PROFILE_DIR,
};
use std::path::{Path, PathBuf};

/// Timestamp layout used for new profile directory names
const DIR_NAME_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Change notifications sent to catalog observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
    /// The whole list was replaced
    Reset,
    Inserted(usize),
    Removed(usize),
    Renamed(usize),
}

type Observer = Box<dyn FnMut(&CatalogEvent)>;

/// Ordered list of the profiles stored under `<root>/profiles`
///
/// Names are unique across the list. A scan keeps the first directory
/// carrying a name and skips later ones with the same name.
pub struct ProfileCatalog {
    root: PathBuf,
    profiles: Vec<ProfileRecord>,
    observers: Vec<Observer>,
}

impl ProfileCatalog {
    /// Create an empty catalog for `root` without scanning it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            profiles: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Create a catalog for `root` and scan it
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut catalog = Self::new(root);
        catalog.reload()?;
        Ok(catalog)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the profile directories
    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(PROFILES_DIR)
    }

    /// Register a callback for every change of the list
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&CatalogEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, event: CatalogEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    /// Point the catalog at another save directory and scan it
    pub fn switch_root(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        self.root = root.into();
        self.reload()
    }

    /// Rescan the profile collection
    ///
    /// Unnamed or unreadable directories, the reserved legacy directory and
    /// later directories repeating a name are skipped. The list is only
    /// replaced once the scan has finished.
    pub fn reload(&mut self) -> Result<()> {
        let profiles_dir = self.profiles_dir();
        let mut dirs = Vec::new();

        match std::fs::read_dir(&profiles_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_dir() || entry.file_name() == RESERVED_PROFILE_DIR {
                        continue;
                    }
                    dirs.push(path);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no profile collection at {profiles_dir:?} yet");
            }
            Err(e) => return Err(e.into()),
        }
        dirs.sort_by_cached_key(|dir| creation_order(dir));

        let mut profiles: Vec<ProfileRecord> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let record = ProfileRecord::load(&dir);
            if !record.is_valid() {
                log::warn!("ignoring {dir:?}, it has no profile name");
            } else if profiles.iter().any(|p| p.name() == record.name()) {
                log::warn!("ignoring {dir:?}, profile {:?} already exists", record.name());
            } else {
                profiles.push(record);
            }
        }

        log::debug!("loaded {} profiles from {profiles_dir:?}", profiles.len());
        self.profiles = profiles;
        self.notify(CatalogEvent::Reset);
        Ok(())
    }

    pub fn profiles(&self) -> &[ProfileRecord] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProfileRecord> {
        self.profiles.get(index)
    }

    /// Index of the record with the given directory id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.id() == id)
    }

    /// Index of the first record with exactly this name
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name() == name)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ProfileRecord> {
        self.profiles.iter().find(|p| p.name() == name)
    }

    pub fn is_duplicate(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Append a record
    ///
    /// The caller has already checked the name with `is_duplicate`.
    pub fn insert(&mut self, record: ProfileRecord) -> usize {
        self.profiles.push(record);
        let index = self.profiles.len() - 1;
        self.notify(CatalogEvent::Inserted(index));
        index
    }

    /// Delete a profile from disk, then from the list
    pub fn remove(&mut self, index: usize) -> Result<ProfileRecord> {
        let record = self.get(index).ok_or_else(|| missing(index))?;
        record.delete_from_disk()?;

        let record = self.profiles.remove(index);
        log::info!("deleted profile {:?} ({:?})", record.name(), record.location());
        self.notify(CatalogEvent::Removed(index));
        Ok(record)
    }

    /// Rename a profile on disk and in the list
    ///
    /// A name held by another profile is refused.
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        MetadataStore::validate_name(new_name)?;
        if self.get(index).is_none() {
            return Err(missing(index));
        }
        if let Some(holder) = self.position_by_name(new_name) {
            if holder != index {
                return Err(Error::DuplicateName(new_name.to_string()));
            }
        }

        let record = &mut self.profiles[index];
        let old_name = record.name().to_string();
        record.set_name(new_name)?;
        log::info!("renamed profile {old_name:?} to {new_name:?}");
        self.notify(CatalogEvent::Renamed(index));
        Ok(())
    }

    /// Make a fresh, empty profile directory
    ///
    /// The directory is named after the current time; if that name is taken a
    /// numeric suffix is added.
    pub fn create_dir(&self) -> Result<PathBuf> {
        let profiles_dir = self.profiles_dir();
        std::fs::create_dir_all(&profiles_dir).map_err(|e| Error::InitFailed {
            dir: profiles_dir.clone(),
            reason: e.to_string(),
        })?;

        let stem = chrono::Local::now().format(DIR_NAME_FORMAT).to_string();
        create_unique_dir(&profiles_dir, &stem)
    }

    /// Create a new profile from the seed templates and append it
    pub fn create_new(&mut self, name: &str, seed: &SeedContent) -> Result<ProfileRecord> {
        MetadataStore::validate_name(name)?;
        if self.is_duplicate(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let dir = self.create_dir()?;
        if let Err(e) = init_fileset(&dir, name, seed) {
            discard_dir(&dir);
            return Err(e);
        }

        let record = ProfileRecord::load(&dir);
        log::info!("created profile {name:?} in {dir:?}");
        self.insert(record.clone());
        Ok(record)
    }
}

fn missing(index: usize) -> Error {
    Error::NotFound(format!("#{index}"))
}

fn create_unique_dir(parent: &Path, stem: &str) -> Result<PathBuf> {
    let mut candidate = parent.join(stem);
    let mut suffix = 0;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                suffix += 1;
                log::debug!("{candidate:?} exists, trying suffix {suffix}");
                candidate = parent.join(format!("{stem}-{suffix}"));
            }
            Err(e) => {
                return Err(Error::InitFailed {
                    dir: candidate,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Sort key putting `<stem>-<n>` directories after `<stem>` in numeric order
fn creation_order(dir: &Path) -> (String, u64) {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some((stem, suffix)) = name.rsplit_once('-') {
        if let Ok(n) = suffix.parse::<u64>() {
            return (stem.to_string(), n);
        }
    }
    (name, 0)
}

/// Best-effort removal of a half-initialized profile directory
pub(crate) fn discard_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        log::warn!("can not clean up {dir:?}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn seed() -> SeedContent {
        SeedContent::new(b"dxb".to_vec(), b"dxg".to_vec())
    }

    fn names(catalog: &ProfileCatalog) -> Vec<&str> {
        catalog.profiles().iter().map(|p| p.name()).collect()
    }

    fn make_profile(root: &Path, dir_name: &str, name: Option<&str>) -> PathBuf {
        let dir = root.join(PROFILES_DIR).join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(name) = name {
            MetadataStore::write_name(&dir, name).unwrap();
        }
        dir
    }

    #[test]
    fn missing_collection_loads_empty() {
        let root = TempDir::new().unwrap();
        let catalog = ProfileCatalog::open(root.path()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn reload_skips_reserved_unnamed_and_files() {
        let root = TempDir::new().unwrap();
        make_profile(root.path(), "20240102000000000", Some("Second"));
        make_profile(root.path(), "20240101000000000", Some("First"));
        make_profile(root.path(), "0", Some("Legacy"));
        make_profile(root.path(), "20240103000000000", None);
        std::fs::write(root.path().join(PROFILES_DIR).join("stray.txt"), b"x").unwrap();

        let catalog = ProfileCatalog::open(root.path()).unwrap();
        assert_eq!(names(&catalog), vec!["First", "Second"]);
    }

    #[test]
    fn reload_orders_suffixes_numerically() {
        let root = TempDir::new().unwrap();
        let stem = "20240101000000000";
        make_profile(root.path(), stem, Some("P0"));
        for n in 1..=11 {
            make_profile(root.path(), &format!("{stem}-{n}"), Some(&format!("P{n}")));
        }
        make_profile(root.path(), "20240101000000001", Some("Later"));

        let catalog = ProfileCatalog::open(root.path()).unwrap();
        let mut expected: Vec<String> = (0..=11).map(|n| format!("P{n}")).collect();
        expected.push("Later".to_string());
        assert_eq!(names(&catalog), expected);
    }

    #[test]
    fn reload_keeps_first_of_duplicate_names() {
        let root = TempDir::new().unwrap();
        let first = make_profile(root.path(), "20240101000000000", Some("Twin"));
        make_profile(root.path(), "20240102000000000", Some("Twin"));
        make_profile(root.path(), "20240103000000000", Some("Other"));

        let catalog = ProfileCatalog::open(root.path()).unwrap();
        assert_eq!(names(&catalog), vec!["Twin", "Other"]);
        assert_eq!(catalog.find_by_name("Twin").unwrap().location(), first);
    }

    #[test]
    fn created_profiles_keep_insertion_order() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        for name in ["Gamma", "Alpha", "Beta"] {
            catalog.create_new(name, &seed()).unwrap();
        }
        assert_eq!(names(&catalog), vec!["Gamma", "Alpha", "Beta"]);

        let record = catalog.find_by_name("Alpha").unwrap();
        assert_eq!(std::fs::read(record.location().join("winsys.dxb")).unwrap(), b"dxb");
    }

    #[test]
    fn duplicate_create_makes_no_directory() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        catalog.create_new("Alpha", &seed()).unwrap();
        let before = std::fs::read_dir(catalog.profiles_dir()).unwrap().count();

        let result = catalog.create_new("Alpha", &seed());
        assert!(matches!(result, Err(Error::DuplicateName(_))));
        assert_eq!(std::fs::read_dir(catalog.profiles_dir()).unwrap().count(), before);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn failed_init_leaves_nothing_behind() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        let empty = SeedContent::new(Vec::new(), Vec::new());

        let result = catalog.create_new("Alpha", &empty);
        assert!(matches!(result, Err(Error::InitFailed { .. })));
        assert_eq!(std::fs::read_dir(catalog.profiles_dir()).unwrap().count(), 0);
        assert!(catalog.is_empty());
    }

    #[test]
    fn unusable_collection_fails_create() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        std::fs::write(catalog.profiles_dir(), b"not a directory").unwrap();

        let result = catalog.create_new("Alpha", &seed());
        assert!(matches!(result, Err(Error::InitFailed { .. })));
        assert!(catalog.is_empty());
        assert!(catalog.profiles_dir().is_file());
    }

    #[test]
    fn remove_deletes_directory() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        catalog.create_new("Alpha", &seed()).unwrap();
        let location = catalog.create_new("Beta", &seed()).unwrap().location().to_path_buf();

        let removed = catalog.remove(1).unwrap();
        assert_eq!(removed.name(), "Beta");
        assert!(!location.exists());
        assert_eq!(names(&catalog), vec!["Alpha"]);
        assert!(matches!(catalog.remove(5), Err(Error::NotFound(_))));
    }

    #[test]
    fn rename_persists_and_refuses_duplicates() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::open(root.path()).unwrap();
        let alpha = catalog.create_new("Alpha", &seed()).unwrap();
        catalog.create_new("Beta", &seed()).unwrap();

        catalog.rename(0, "Delta").unwrap();
        assert_eq!(catalog.find_by_name("Delta").unwrap().id(), alpha.id());
        assert_eq!(MetadataStore::read_name(alpha.location()), "Delta");

        assert!(matches!(catalog.rename(0, "Beta"), Err(Error::DuplicateName(_))));
        assert!(matches!(catalog.rename(0, ""), Err(Error::EmptyName)));
        catalog.rename(0, "Delta").unwrap();
        assert_eq!(names(&catalog), vec!["Delta", "Beta"]);
    }

    #[test]
    fn observers_see_every_change() {
        let root = TempDir::new().unwrap();
        let mut catalog = ProfileCatalog::new(root.path());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        catalog.subscribe(move |event| sink.borrow_mut().push(*event));

        catalog.reload().unwrap();
        catalog.create_new("Alpha", &seed()).unwrap();
        catalog.rename(0, "Beta").unwrap();
        catalog.remove(0).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                CatalogEvent::Reset,
                CatalogEvent::Inserted(0),
                CatalogEvent::Renamed(0),
                CatalogEvent::Removed(0),
            ]
        );
    }

    #[test]
    fn taken_directory_name_gets_suffix() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("20240101000000000")).unwrap();
        std::fs::create_dir(root.path().join("20240101000000000-1")).unwrap();

        let dir = create_unique_dir(root.path(), "20240101000000000").unwrap();
        assert_eq!(dir, root.path().join("20240101000000000-2"));
        assert!(dir.is_dir());
    }
}
