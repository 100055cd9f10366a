//! Best-effort size measurement through the host's `du`.
//!
//! A probe never fails towards its caller: every error is logged and
//! collapsed into [`ZERO_SIZE`] (or an empty list / zero bytes).

use crate::size::{self, ZERO_SIZE};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to run du: {0}")]
    Spawn(#[from] io::Error),
    #[error("no size line in du output for {}: {output:?}", path.display())]
    Unparseable { path: PathBuf, output: String },
}

pub trait SizeProbe: Send + Sync {
    /// Human-readable recursive size of `path`.
    fn measure(&self, path: &Path) -> Result<String, ProbeError>;

    /// Combined block usage of `paths` in bytes.
    fn measure_blocks(&self, paths: &[PathBuf]) -> Result<u64, ProbeError>;

    fn size_of(&self, path: &Path) -> String {
        self.measure(path).unwrap_or_else(|err| {
            debug!(path = %path.display(), %err, "size probe failed");
            ZERO_SIZE.to_string()
        })
    }

    fn sum_sizes(&self, paths: &[PathBuf]) -> u64 {
        if paths.is_empty() {
            return 0;
        }
        self.measure_blocks(paths).unwrap_or_else(|err| {
            debug!(count = paths.len(), %err, "block size probe failed");
            0
        })
    }
}

/// Shells out to `du` under the C locale.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuProbe;

impl SizeProbe for DuProbe {
    fn measure(&self, path: &Path) -> Result<String, ProbeError> {
        if !path.exists() {
            return Err(ProbeError::Missing(path.to_path_buf()));
        }

        let output = Command::new("du")
            .arg("-sh")
            .arg(path)
            .env("LC_ALL", "C")
            .output()?;
        let text = combined_output(&output);

        last_size_line(&text).ok_or_else(|| ProbeError::Unparseable {
            path: path.to_path_buf(),
            output: text,
        })
    }

    fn measure_blocks(&self, paths: &[PathBuf]) -> Result<u64, ProbeError> {
        let output = Command::new("du")
            .arg("-sk")
            .args(paths)
            .env("LC_ALL", "C")
            .output()?;
        let text = combined_output(&output);

        let kilobytes: u64 = text
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .filter_map(|(blocks, _)| blocks.trim().parse::<u64>().ok())
            .sum();
        Ok(kilobytes * 1024)
    }
}

/// Stdout followed by stderr, trimmed.
pub fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

/// Size column of the last `<size>\t<path>` line; warnings printed before it are ignored.
pub fn last_size_line(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .find(|line| line.contains('\t'))
        .and_then(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Immediate subdirectories of `path`, sorted by name. Missing or unreadable roots yield nothing.
pub fn child_dirs(path: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(path) else {
        return vec![];
    };

    let mut dirs: Vec<PathBuf> = read_dir
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

/// Probes every immediate subdirectory and returns the `limit` largest, largest first.
pub fn list_children_by_size(
    probe: &dyn SizeProbe,
    path: &Path,
    limit: usize,
) -> Vec<(String, PathBuf)> {
    let mut sized: Vec<(String, PathBuf)> = child_dirs(path)
        .into_par_iter()
        .map(|child| (probe.size_of(&child), child))
        .collect();

    sized.sort_by_key(|(size_text, _)| std::cmp::Reverse(size::parse(size_text)));
    sized.truncate(limit);
    sized
}

/// Total block usage of every path under `root` matching `pattern`, e.g. `Devices/*/data/Library/Caches`.
pub fn sum_child_sizes_matching(probe: &dyn SizeProbe, root: &Path, pattern: &str) -> u64 {
    let full = format!(
        "{}/{pattern}",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let paths: Vec<PathBuf> = match glob::glob(&full) {
        Ok(matches) => matches.filter_map(Result::ok).collect(),
        Err(err) => {
            debug!(pattern = %full, %err, "invalid glob");
            return 0;
        }
    };
    probe.sum_sizes(&paths)
}
