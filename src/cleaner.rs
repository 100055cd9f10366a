//! Permanent deletion of cache items.
//!
//! Removal goes through `rm -rf` and bypasses the Trash. A removal counts as
//! successful when `rm` prints nothing; any output, even a harmless warning,
//! is reported as a failure.

use crate::allowlist::Allowlist;
use crate::constants::{
    CORE_SIMULATOR, DEVICE_CACHES_DIR, SIMULATOR_CACHES, SIMULATOR_DEVICES, SIMULATOR_TEMP,
};
use crate::model::{
    ApplicationArchive, BuildCacheProject, CacheItem, DeviceSymbolCache, PackageVersion,
};
use crate::probe::{child_dirs, combined_output};
use jwalk::WalkDir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("failed to run rm: {0}")]
    Spawn(#[from] io::Error),
    #[error("rm reported: {0}")]
    Output(String),
    #[error("{} is allowlisted", .0.display())]
    Allowlisted(PathBuf),
}

pub struct Cleaner {
    home: PathBuf,
    allowlist: Allowlist,
}

impl Cleaner {
    pub fn new(home: PathBuf, allowlist: Allowlist) -> Self {
        Self { home, allowlist }
    }

    fn simulator_root(&self) -> PathBuf {
        self.home.join(CORE_SIMULATOR)
    }

    /// Deletes a root or folder. The simulator root is only emptied of caches;
    /// a path that is already gone counts as deleted.
    pub fn delete_path(&self, path: &Path) -> bool {
        let result = if path == self.simulator_root() {
            self.clear_simulator_caches()
        } else if is_gone(path) {
            Ok(())
        } else {
            self.remove(path)
        };
        report(path, result)
    }

    pub fn delete_device_symbol_cache(&self, device: &DeviceSymbolCache) -> bool {
        report(&device.entry.path, self.remove(&device.entry.path))
    }

    pub fn delete_archive(&self, archive: &ApplicationArchive) -> bool {
        report(&archive.entry.path, self.remove(&archive.entry.path))
    }

    pub fn delete_build_cache_project(&self, project: &BuildCacheProject) -> bool {
        report(&project.entry.path, self.remove(&project.entry.path))
    }

    pub fn delete_package_version(&self, version: &PackageVersion) -> bool {
        report(&version.entry.path, self.remove(&version.entry.path))
    }

    pub fn delete(&self, item: &CacheItem) -> bool {
        match item {
            CacheItem::Folder(entry) => self.delete_path(&entry.path),
            CacheItem::Project(project) => self.delete_build_cache_project(project),
            CacheItem::DeviceSymbols(device) => self.delete_device_symbol_cache(device),
            CacheItem::Archive(archive) => self.delete_archive(archive),
            CacheItem::PackageVersion(version) => self.delete_package_version(version),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), DeleteError> {
        if self.allowlist.is_allowed(path) && !is_gone(path) {
            return Err(DeleteError::Allowlisted(path.to_path_buf()));
        }
        force_remove(path)
    }

    /// Empties the shared `Caches` and `Temp` folders and every `Caches`
    /// folder inside each simulator's data directory. Devices themselves,
    /// and anything not under a `Caches` folder, are kept.
    fn clear_simulator_caches(&self) -> Result<(), DeleteError> {
        let root = self.simulator_root();
        let mut targets = vec![root.join(SIMULATOR_CACHES), root.join(SIMULATOR_TEMP)];
        for device in child_dirs(&root.join(SIMULATOR_DEVICES)) {
            targets.extend(named_dirs_below(&device.join("data"), DEVICE_CACHES_DIR));
        }

        let mut first_error = None;
        for dir in targets {
            if let Err(err) = self.clear_contents(&dir) {
                warn!(dir = %dir.display(), %err, "failed to clear simulator cache folder");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Removes everything inside `dir`, keeping `dir` itself.
    fn clear_contents(&self, dir: &Path) -> Result<(), DeleteError> {
        let Ok(read_dir) = fs::read_dir(dir) else {
            return Ok(());
        };
        let mut first_error = None;
        for entry in read_dir.filter_map(Result::ok) {
            if let Err(err) = self.remove(&entry.path()) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Nothing at `path`, not even a dangling symlink.
fn is_gone(path: &Path) -> bool {
    path.symlink_metadata().is_err()
}

fn force_remove(path: &Path) -> Result<(), DeleteError> {
    let output = Command::new("rm").arg("-rf").arg(path).output()?;
    let text = combined_output(&output);
    if text.is_empty() {
        Ok(())
    } else {
        Err(DeleteError::Output(text))
    }
}

/// Directories named exactly `name` anywhere below `root`, outermost first.
fn named_dirs_below(root: &Path, name: &str) -> Vec<PathBuf> {
    if !root.exists() {
        return vec![];
    }
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .skip_hidden(false)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_dir() && e.file_name() == name)
        .map(|e| e.path())
        .collect();
    found.sort();
    found
}

fn report(path: &Path, result: Result<(), DeleteError>) -> bool {
    match result {
        Ok(()) => {
            info!(path = %path.display(), "deleted");
            true
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "deletion failed");
            false
        }
    }
}
