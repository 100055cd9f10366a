use crate::allowlist::Allowlist;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub allowlist: Allowlist,
}

impl Config {
    pub fn load() -> Result<Self> {
        let home = real_home().context("could not determine the user's home directory")?;
        let allowlist = dirs::config_dir()
            .map(|dir| Allowlist::load_from(&dir.join("devsweep/allowlist.txt")))
            .unwrap_or_default();
        if !allowlist.is_empty() {
            info!(rules = allowlist.len(), "allowlist loaded");
        }

        Ok(Self { home, allowlist })
    }
}

/// The user's real home, even when running under `sudo` or from inside an app container.
pub fn real_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("DEVSWEEP_HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }

    if let Ok(sudo_user) = std::env::var("SUDO_USER")
        && !sudo_user.is_empty()
    {
        let base = if cfg!(target_os = "macos") {
            "/Users"
        } else {
            "/home"
        };
        return Some(PathBuf::from(base).join(sudo_user));
    }

    dirs::home_dir().map(|home| strip_container(&home))
}

/// `/Users/me/Library/Containers/<bundle>/Data` -> `/Users/me`.
fn strip_container(home: &Path) -> PathBuf {
    let components: Vec<_> = home.components().collect();
    components
        .windows(2)
        .position(|pair| {
            pair[0].as_os_str() == "Library" && pair[1].as_os_str() == "Containers"
        })
        .map_or_else(
            || home.to_path_buf(),
            |index| components[..index].iter().collect(),
        )
}
