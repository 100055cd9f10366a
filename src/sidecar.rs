//! Flat `"Key" => "Value"` extraction from property-list dumps.
//!
//! `plutil -p` renders every scalar of a (binary) plist on its own line in
//! that shape, so a handful of known fields can be pulled out with a regex
//! instead of a full plist parser. Nested dictionaries are flattened by the
//! dump, so keys under `ApplicationProperties` match just like top-level ones.

use crate::constants::UNKNOWN;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to read sidecar: {0}")]
    Io(#[from] io::Error),
    #[error("plutil rejected {}: {stderr}", path.display())]
    Rejected { path: PathBuf, stderr: String },
}

/// First value of `key` in `text`.
///
/// Strings are dumped quoted (`"Name" => "Demo"`) while dates and numbers are
/// bare up to the end of the line (`"CreationDate" => 2025-01-01 10:00:00 +0000`).
/// Nested dictionaries and arrays never match.
pub fn extract_field(text: &str, key: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let pattern = format!(
        r#"(?m)"{}" => (?:"([^"]+)"|([^"{{\[\n]+?))[ \t\r]*$"#,
        regex::escape(key)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Like [`extract_field`] but never blank.
pub fn field_or_unknown(text: &str, key: &str) -> String {
    extract_field(text, key).unwrap_or_else(|| UNKNOWN.to_string())
}

pub trait SidecarReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String, SidecarError>;

    /// Textual dump of the sidecar, empty when it cannot be read.
    fn dump(&self, path: &Path) -> String {
        self.read(path).unwrap_or_else(|err| {
            debug!(path = %path.display(), %err, "sidecar unreadable");
            String::new()
        })
    }
}

/// Dumps binary or XML plists through `plutil -p`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlistDump;

impl SidecarReader for PlistDump {
    fn read(&self, path: &Path) -> Result<String, SidecarError> {
        if !path.exists() {
            return Err(SidecarError::Missing(path.to_path_buf()));
        }
        let output = Command::new("plutil").arg("-p").arg(path).output()?;
        if !output.status.success() {
            return Err(SidecarError::Rejected {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Reads sidecars that are already stored as flat text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl SidecarReader for PlainText {
    fn read(&self, path: &Path) -> Result<String, SidecarError> {
        if !path.exists() {
            return Err(SidecarError::Missing(path.to_path_buf()));
        }
        Ok(fs::read_to_string(path)?.trim().to_string())
    }
}

/// `plutil` only exists on macOS.
pub fn default_reader() -> Box<dyn SidecarReader> {
    if cfg!(target_os = "macos") {
        Box::new(PlistDump)
    } else {
        Box::new(PlainText)
    }
}
