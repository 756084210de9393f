//! Outcome - Structured result of one profile operation

use crate::{profile::ProfileRecord, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Operation a host asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Current,
    Create,
    Rename,
    Delete,
    Activate,
    Reload,
    SelectDir,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::List => write!(f, "list"),
            Operation::Current => write!(f, "current"),
            Operation::Create => write!(f, "create"),
            Operation::Rename => write!(f, "rename"),
            Operation::Delete => write!(f, "delete"),
            Operation::Activate => write!(f, "activate"),
            Operation::Reload => write!(f, "reload"),
            Operation::SelectDir => write!(f, "select-dir"),
        }
    }
}

/// Result of an operation, ready to be presented
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub operation: Operation,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl Outcome {
    pub fn new(operation: Operation, success: bool, message: Option<String>) -> Self {
        Self {
            operation,
            success,
            message,
            details: BTreeMap::new(),
        }
    }

    /// Successful outcome with a message
    pub fn success(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(operation, true, Some(message.into()))
    }

    /// Failed outcome describing `error`
    ///
    /// Copy problems list the affected files, and activation failures say
    /// whether the live save may have been touched.
    pub fn failure(operation: Operation, error: &Error) -> Self {
        let mut outcome = Self::new(operation, false, Some(error.to_string()));
        outcome.add_detail("error", Value::from(error_kind(error)));

        let mut cause = error;
        if let Error::ActivationFailed {
            stage,
            active_modified,
            source,
        } = error
        {
            outcome.add_detail("stage", serde_json::json!(stage));
            outcome.add_detail("active_modified", Value::Bool(*active_modified));
            cause = source.as_ref();
        }
        if let Error::CopyFailed(failure) = cause {
            outcome.add_detail("files", serde_json::json!(failure.files()));
        }
        outcome
    }

    /// Attach a profile list
    pub fn with_profiles(mut self, profiles: &[ProfileRecord]) -> Self {
        match serde_json::to_value(profiles) {
            Ok(value) => self.add_detail("profiles", value),
            Err(e) => log::warn!("can not serialize profile list: {e}"),
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn add_detail(&mut self, key: impl Into<String>, value: Value) {
        self.details.insert(key.into(), value);
    }

    pub fn get_detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Io(_) => "io",
        Error::Config(_) => "config",
        Error::InvalidSaveDir(_) => "invalid_save_dir",
        Error::NoSaveDir => "no_save_dir",
        Error::NotFound(_) => "not_found",
        Error::EmptyName => "empty_name",
        Error::DuplicateName(_) => "duplicate_name",
        Error::Unencodable(_) => "unencodable",
        Error::CopyFailed(_) => "copy_failed",
        Error::InitFailed { .. } => "init_failed",
        Error::ActivationFailed { .. } => "activation_failed",
    }
}
