//! MetadataStore - Reads and writes the key-value metadata kept in each profile directory
//!
//! The file is INI text in GBK, laid out the way Qt's `QSettings` writes it: keys
//! live under `[General]`, values with surrounding whitespace or separators are
//! quoted and control characters are backslash-escaped. Existing save folders
//! were written that way, so reading and writing must stay byte compatible.

use crate::{Error, Result, KEY_VALUE_REGEX, METADATA_FILE, SECTION_REGEX};
use encoding_rs::GBK;
use std::path::{Path, PathBuf};

/// Key holding the display name of a profile
pub const NAME_KEY: &str = "name";

/// Key holding the id of the catalog entry mirrored by the active directory
pub const LINK_KEY: &str = "profile";

const GENERAL_SECTION: &str = "General";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Access to the metadata file of a profile directory
pub struct MetadataStore;

impl MetadataStore {
    /// Path of the metadata file inside `dir`
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE)
    }

    /// Read the profile name stored in `dir`
    ///
    /// A missing file, an unreadable file or a missing key all read as the
    /// empty string.
    pub fn read_name(dir: &Path) -> String {
        Self::read_value(dir, NAME_KEY).unwrap_or_default()
    }

    /// Write the profile name into `dir`, creating the metadata file if needed
    pub fn write_name(dir: &Path, name: &str) -> Result<()> {
        Self::write_value(dir, NAME_KEY, name)
    }

    /// Check that `name` can become a profile name
    ///
    /// Empty names would make the profile invalid, and the metadata encoding
    /// can not hold every character.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let (_, _, had_errors) = GBK.encode(name);
        if had_errors {
            return Err(Error::Unencodable(name.to_string()));
        }
        Ok(())
    }

    /// Read a single key from the metadata file in `dir`
    pub fn read_value(dir: &Path, key: &str) -> Option<String> {
        let path = Self::path(dir);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("no metadata at {path:?}: {e}");
                return None;
            }
        };
        let (text, had_errors) = GBK.decode_without_bom_handling(&bytes);
        if had_errors {
            log::warn!("metadata {path:?} contains bytes that are not valid GBK");
        }

        let mut section: Option<String> = None;
        for line in text.lines() {
            if let Some(captures) = SECTION_REGEX.captures(line) {
                section = Some(captures[1].trim().to_string());
                continue;
            }
            if !in_general(section.as_deref()) {
                continue;
            }
            if let Some(captures) = KEY_VALUE_REGEX.captures(line) {
                if &captures[1] == key {
                    return Some(unescape_value(&captures[2]));
                }
            }
        }
        None
    }

    /// Write a single key into the metadata file in `dir`
    ///
    /// Every other line of an existing file is kept as it is.
    pub fn write_value(dir: &Path, key: &str, value: &str) -> Result<()> {
        let path = Self::path(dir);
        let existing = match std::fs::read(&path) {
            Ok(bytes) => GBK.decode_without_bom_handling(&bytes).0.into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let line_ending = if existing.contains("\r\n") {
            "\r\n"
        } else {
            LINE_ENDING
        };

        let entry = format!("{}={}", key, escape_value(value));
        let mut lines: Vec<String> = existing.lines().map(|l| l.to_string()).collect();
        let mut section: Option<String> = None;
        let mut general_header = None;
        let mut replaced = false;

        for (index, line) in lines.iter_mut().enumerate() {
            if let Some(captures) = SECTION_REGEX.captures(line) {
                section = Some(captures[1].trim().to_string());
                if section.as_deref() == Some(GENERAL_SECTION) {
                    general_header = Some(index);
                }
                continue;
            }
            if !in_general(section.as_deref()) {
                continue;
            }
            let matches_key = KEY_VALUE_REGEX
                .captures(line)
                .map(|captures| &captures[1] == key)
                .unwrap_or(false);
            if matches_key {
                *line = entry.clone();
                replaced = true;
                break;
            }
        }

        if !replaced {
            match general_header {
                Some(index) => lines.insert(index + 1, entry),
                None if lines.iter().all(|l| l.trim().is_empty()) => {
                    lines = vec![format!("[{GENERAL_SECTION}]"), entry];
                }
                None => {
                    let mut prefixed = vec![format!("[{GENERAL_SECTION}]"), entry, String::new()];
                    prefixed.append(&mut lines);
                    lines = prefixed;
                }
            }
        }

        let mut text = lines.join(line_ending);
        text.push_str(line_ending);
        let (bytes, _, had_errors) = GBK.encode(&text);
        if had_errors {
            return Err(Error::Unencodable(value.to_string()));
        }

        log::debug!("writing {key} to {path:?}");
        std::fs::write(&path, bytes)?;
        Ok(())
    }
}

fn in_general(section: Option<&str>) -> bool {
    matches!(section, None | Some(GENERAL_SECTION))
}

/// Escape a value the way `QSettings` does for string values
fn escape_value(value: &str) -> String {
    let needs_quotes = value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains([',', ';', '=']);

    let mut escaped = String::with_capacity(value.len() + 2);
    if needs_quotes {
        escaped.push('"');
    }
    if value.starts_with('@') {
        escaped.push('@');
    }
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            c => escaped.push(c),
        }
    }
    if needs_quotes {
        escaped.push('"');
    }
    escaped
}

fn unescape_value(raw: &str) -> String {
    let body = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };

    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('t') => value.push('\t'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }

    if value.starts_with("@@") {
        value.remove(0);
    }
    value
}
