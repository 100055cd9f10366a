use crate::constants::{GRADLE_CACHE, HOME_CACHE, NPM_CACHE, PUB_CACHE, PUB_HOSTED};
use crate::model::{CacheEntry, PackageGroup, PackageManagerCaches, PackageVersion, ScanPhase};
use crate::probe::child_dirs;
use crate::scanner::utils::{attach_if_nonempty, detail_total, dir_name, rolled_up, sum_entries};
use crate::scanner::{CategoryScanner, ScanContext};
use crate::size;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub struct PackageScan {
    pub total: String,
    pub caches: PackageManagerCaches,
}

/// pub, Gradle, npm and `~/.cache`.
pub struct PackageManagerScanner {
    /// Per-version enumeration of the pub cache. Off by default: it probes
    /// every installed version, which takes minutes on large caches.
    pub include_packages: bool,
}

impl CategoryScanner for PackageManagerScanner {
    type Output = PackageScan;

    fn phase(&self) -> ScanPhase {
        ScanPhase::PackageManager
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> PackageScan {
        let mut caches = PackageManagerCaches {
            pub_cache: attach_if_nonempty(ctx, PUB_CACHE),
            gradle: attach_if_nonempty(ctx, GRADLE_CACHE),
            npm: attach_if_nonempty(ctx, NPM_CACHE),
            home_cache: attach_if_nonempty(ctx, HOME_CACHE),
            packages: vec![],
        };
        if self.include_packages {
            attach_packages(&mut caches, enumerate_packages(ctx));
        }

        PackageScan {
            total: package_total(&caches),
            caches,
        }
    }
}

/// Stores `packages` and re-derives the pub cache root from them when non-empty.
pub fn attach_packages(caches: &mut PackageManagerCaches, packages: Vec<PackageGroup>) {
    if let Some(root) = caches.pub_cache.take() {
        let detail = detail_total(
            packages
                .iter()
                .flat_map(|group| group.versions.iter().map(|v| &v.entry)),
        );
        caches.pub_cache = Some(rolled_up(root.path, root.size, detail));
    }
    caches.packages = packages;
}

pub fn package_total(caches: &PackageManagerCaches) -> String {
    size::format(sum_entries(caches.roots()))
}

/// Groups `.pub-cache/hosted/<host>/<name>-<version>` folders by package, largest group first.
pub fn enumerate_packages(ctx: &ScanContext<'_>) -> Vec<PackageGroup> {
    let folders: Vec<(PathBuf, String, String)> = child_dirs(&ctx.home.join(PUB_HOSTED))
        .iter()
        .flat_map(|host| child_dirs(host))
        .filter(|p| !ctx.allowlist.is_allowed(p))
        .filter_map(|path| {
            let folder = dir_name(&path);
            let (name, version) = folder.split_once('-')?;
            let (name, version) = (name.to_string(), version.to_string());
            Some((path, name, version))
        })
        .collect();

    let versions: Vec<PackageVersion> = folders
        .into_par_iter()
        .map(|(path, package_name, version)| PackageVersion {
            entry: CacheEntry::new(&path, ctx.probe.size_of(&path)),
            package_name,
            version,
        })
        .collect();

    let mut by_name: BTreeMap<String, Vec<PackageVersion>> = BTreeMap::new();
    for version in versions {
        by_name
            .entry(version.package_name.clone())
            .or_default()
            .push(version);
    }

    let mut groups: Vec<PackageGroup> = by_name
        .into_iter()
        .map(|(name, mut versions)| {
            versions.sort_by_key(|v| Reverse(v.entry.size_bytes()));
            let total = versions.iter().map(|v| v.entry.size_bytes()).sum();
            PackageGroup {
                name,
                versions,
                total_size: size::format(total),
            }
        })
        .collect();

    groups.sort_by_key(|g| Reverse(size::parse(&g.total_size)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::Allowlist;
    use crate::model::ScanMode;
    use crate::probe::testing::FixedProbe;
    use crate::sidecar::PlainText;
    use anyhow::Result;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn scan(home: &Path, probe: &FixedProbe, include_packages: bool) -> PackageScan {
        let allowlist = Allowlist::default();
        let ctx = ScanContext {
            home,
            probe,
            sidecars: &PlainText,
            allowlist: &allowlist,
            mode: ScanMode::Quick,
        };
        PackageManagerScanner { include_packages }.scan(&ctx)
    }

    #[test]
    fn roots_attached_only_when_non_empty() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let probe = FixedProbe::default()
            .with(home.join(GRADLE_CACHE), "2G")
            .with(home.join(NPM_CACHE), "0B")
            .with(home.join(HOME_CACHE), "512M");

        let result = scan(home, &probe, false);
        assert!(result.caches.pub_cache.is_none());
        assert!(result.caches.npm.is_none());
        assert_eq!(result.caches.gradle.as_ref().map(|e| e.size.as_str()), Some("2G"));
        assert_eq!(result.caches.roots().len(), 2);
        assert!(result.caches.packages.is_empty());
        assert_eq!(result.total, "2.50 GB");
        Ok(())
    }

    #[test]
    fn package_versions_grouped_when_requested() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let hosted = home.join(PUB_HOSTED).join("pub.dev");
        let http_old = hosted.join("http-0.13.6");
        let http_new = hosted.join("http-1.2.0");
        let lints = hosted.join("flutter_lints-3.0.1");
        let prerelease = hosted.join("riverpod-3.0.0-dev.1");
        let stray = hosted.join(".cache");
        for p in [&http_old, &http_new, &lints, &prerelease, &stray] {
            fs::create_dir_all(p)?;
        }

        let probe = FixedProbe::default()
            .with(home.join(PUB_CACHE), "3G")
            .with(&http_old, "1M")
            .with(&http_new, "2M")
            .with(&lints, "100K")
            .with(&prerelease, "4M");

        let quick = scan(home, &probe, false);
        assert!(quick.caches.packages.is_empty());
        assert_eq!(quick.caches.pub_cache.as_ref().map(|e| e.size.as_str()), Some("3G"));

        let result = scan(home, &probe, true);
        let groups = &result.caches.packages;
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].name, "riverpod");
        assert_eq!(groups[0].versions[0].version, "3.0.0-dev.1");
        assert_eq!(groups[1].name, "http");
        assert_eq!(groups[1].versions.len(), 2);
        assert_eq!(groups[1].versions[0].version, "1.2.0");
        assert_eq!(groups[1].total_size, "3.0 MB");
        assert_eq!(groups[2].name, "flutter_lints");

        let expected = 7 * 1024 * 1024 + 100 * 1024;
        assert_eq!(
            result.caches.pub_cache.as_ref().map(CacheEntry::size_bytes),
            Some(size::parse(&size::format(expected)))
        );
        Ok(())
    }
}
