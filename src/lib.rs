//! SaveSwap - Named save profiles for a game
//!
//! This library keeps any number of save-data profiles next to a game's live
//! save directory and swaps them in and out of it, archiving whatever was live
//! under its own name.
//!
//! The on-disk tree under the save directory is assumed to be owned by a single
//! running instance. Nothing here locks it, and the game writing into the
//! active directory while a swap runs is not guarded against.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

pub mod activation;
pub mod catalog;
pub mod config;
pub mod fileset;
pub mod formatters;
pub mod metadata;
pub mod outcome;
pub mod profile;
pub mod session;

pub use activation::{Activation, ActivationEngine, ActivationStage};
pub use catalog::{CatalogEvent, ProfileCatalog};
pub use config::Config;
pub use fileset::{CopyFailure, CopyIssue, CopyPolicy, SeedContent};
pub use formatters::Formatters;
pub use metadata::MetadataStore;
pub use outcome::{Operation, Outcome};
pub use profile::ProfileRecord;
pub use session::ProfileSession;

/// Directory holding the content the game actually reads
pub const ACTIVE_DIR: &str = "sys";

/// Directory holding the inactive profiles
pub const PROFILES_DIR: &str = "profiles";

/// Legacy subdirectory of the profile collection that is never a profile
pub const RESERVED_PROFILE_DIR: &str = "0";

/// Per-profile metadata file
pub const METADATA_FILE: &str = "info.ini";

/// Save-data files copied along with the metadata file
pub const CONTENT_FILES: [&str; 2] = ["winsys.dxb", "winsys.dxg"];

/// Display name used when the active directory carries no name
pub const DEFAULT_PROFILE_NAME: &str = "Original Profile";

lazy_static! {
    /// INI section header, e.g. `[General]`
    pub static ref SECTION_REGEX: Regex =
        Regex::new(r"^\s*\[([^\]]*)\]\s*$").unwrap();

    /// INI `key=value` line
    pub static ref KEY_VALUE_REGEX: Regex =
        Regex::new(r"^\s*([^=;#][^=]*?)\s*=\s*(.*?)\s*$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Not a game save directory (no \"sys\" inside): {0:?}")]
    InvalidSaveDir(PathBuf),

    #[error("No save directory configured, select one first")]
    NoSaveDir,

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile name must not be empty")]
    EmptyName,

    #[error("Profile name is duplicated: {0}")]
    DuplicateName(String),

    #[error("Name can not be stored in the save encoding: {0}")]
    Unencodable(String),

    #[error("Copy failed: {0}")]
    CopyFailed(CopyFailure),

    #[error("Can not initialize profile in {dir:?}: {reason}")]
    InitFailed { dir: PathBuf, reason: String },

    #[error("Activation failed while {stage}{}: {source}", modified_note(.active_modified))]
    ActivationFailed {
        stage: ActivationStage,
        active_modified: bool,
        #[source]
        source: Box<Error>,
    },
}

fn modified_note(active_modified: &bool) -> &'static str {
    if *active_modified {
        " (active save may be partially overwritten)"
    } else {
        ""
    }
}

pub type Result<T> = std::result::Result<T, Error>;
