use crate::constants::{
    ARCHIVE_EXTENSION, ARCHIVE_SIDECAR, CORE_SIMULATOR, DEVELOPER_DISK_IMAGES, DVT_DOWNLOADS,
    INDEX_EXEMPT_MARKER, KEY_BUNDLE_ID, KEY_BUNDLE_VERSION, KEY_CREATION_DATE,
    KEY_LAST_ACCESSED, KEY_NAME, KEY_SHORT_VERSION, KEY_WORKSPACE_PATH, PROJECT_SIDECAR,
    SIMULATOR_CACHES, SIMULATOR_DEVICE_CACHES_GLOB, SIMULATOR_TEMP, XCODE_ARCHIVES,
    XCODE_DERIVED_DATA, XCODE_DEVICE_SUPPORT, XCPG_DEVICES, XCTEST_DEVICES,
};
use crate::model::{
    ApplicationArchive, BuildCacheProject, CacheEntry, DeviceSymbolCache, ScanPhase,
    ToolchainCaches,
};
use crate::probe::{child_dirs, sum_child_sizes_matching};
use crate::scanner::utils::{
    attach_if_nonempty, detail_total, dir_name, find_dirs_with_extension, rolled_up,
    sum_entries,
};
use crate::scanner::{CategoryScanner, ScanContext};
use crate::sidecar::field_or_unknown;
use crate::size::{self, ZERO_SIZE};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ToolchainScan {
    pub total: String,
    pub caches: ToolchainCaches,
}

/// Xcode build products, device symbols, archives and simulator caches.
///
/// In quick mode only the root probes run for derived data, device support
/// and archives; full mode also enumerates and sizes each child.
pub struct ToolchainScanner;

impl CategoryScanner for ToolchainScanner {
    type Output = ToolchainScan;

    fn phase(&self) -> ScanPhase {
        ScanPhase::Toolchain
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> ToolchainScan {
        let full = ctx.mode.is_full();

        let derived_root = ctx.home.join(XCODE_DERIVED_DATA);
        let derived_probe = ctx.probe.size_of(&derived_root);
        let projects = if full {
            scan_projects(ctx, &derived_root)
        } else {
            vec![]
        };
        let derived_data = rolled_up(
            derived_root,
            derived_probe,
            detail_total(projects.iter().map(|p| &p.entry)),
        );

        let support_root = ctx.home.join(XCODE_DEVICE_SUPPORT);
        let support_probe = ctx.probe.size_of(&support_root);
        let devices = if full {
            scan_devices(ctx, &support_root)
        } else {
            vec![]
        };
        let device_support = rolled_up(
            support_root,
            support_probe,
            detail_total(devices.iter().map(|d| &d.entry)),
        );

        let archives_root = ctx.home.join(XCODE_ARCHIVES);
        let archives_probe = ctx.probe.size_of(&archives_root);
        let (archive_list, unlisted_bytes) = if full {
            scan_archives(ctx, &archives_root)
        } else {
            (vec![], 0)
        };
        let archives = rolled_up(
            archives_root,
            archives_probe,
            detail_total(archive_list.iter().map(|a| &a.entry)).map(|listed| listed + unlisted_bytes),
        );

        let simulator = scan_simulator(ctx);

        let caches = ToolchainCaches {
            derived_data,
            device_support,
            archives,
            simulator,
            projects,
            devices,
            archive_list,
            disk_images: attach_if_nonempty(ctx, DEVELOPER_DISK_IMAGES),
            playground_devices: attach_if_nonempty(ctx, XCPG_DEVICES),
            downloads: attach_if_nonempty(ctx, DVT_DOWNLOADS),
            test_devices: attach_if_nonempty(ctx, XCTEST_DEVICES),
        };

        ToolchainScan {
            total: size::format(sum_entries(caches.roots())),
            caches,
        }
    }
}

/// One entry per derived data folder, named after the part before the first hyphen.
fn scan_projects(ctx: &ScanContext<'_>, root: &Path) -> Vec<BuildCacheProject> {
    let folders: Vec<PathBuf> = child_dirs(root)
        .into_iter()
        .filter(|p| !dir_name(p).contains(INDEX_EXEMPT_MARKER))
        .filter(|p| !ctx.allowlist.is_allowed(p))
        .collect();

    folders
        .into_par_iter()
        .map(|path| {
            let folder = dir_name(&path);
            let project_name = folder.split('-').next().unwrap_or(&folder).to_string();
            let sidecar = ctx.sidecars.dump(&path.join(PROJECT_SIDECAR));
            let size = ctx.probe.size_of(&path);

            BuildCacheProject {
                project_name,
                workspace_path: field_or_unknown(&sidecar, KEY_WORKSPACE_PATH),
                last_accessed: field_or_unknown(&sidecar, KEY_LAST_ACCESSED),
                entry: CacheEntry::new(path, size),
            }
        })
        .collect()
}

/// Device support folders named `<model> <version> (<build>)`; other names are skipped.
fn scan_devices(ctx: &ScanContext<'_>, root: &Path) -> Vec<DeviceSymbolCache> {
    let parsed: Vec<DeviceSymbolCache> = child_dirs(root)
        .into_iter()
        .filter(|p| !ctx.allowlist.is_allowed(p))
        .filter_map(|path| {
            let name = dir_name(&path);
            let device = DeviceSymbolCache::from_dir_name(&name, CacheEntry::new(path, ZERO_SIZE));
            if device.is_none() {
                debug!(%name, "skipping unrecognised device support folder");
            }
            device
        })
        .collect();

    parsed
        .into_par_iter()
        .map(|mut device| {
            device.entry.size = ctx.probe.size_of(&device.entry.path);
            device
        })
        .collect()
}

/// Every `.xcarchive` below the archives root with a readable `Info.plist`.
///
/// Archives whose sidecar is unreadable are left out of the list; their
/// bytes are returned separately so the root total still counts them.
fn scan_archives(ctx: &ScanContext<'_>, root: &Path) -> (Vec<ApplicationArchive>, u64) {
    let bundles: Vec<PathBuf> = find_dirs_with_extension(root, ARCHIVE_EXTENSION)
        .into_iter()
        .filter(|p| !ctx.allowlist.is_allowed(p))
        .collect();

    let probed: Vec<(CacheEntry, String)> = bundles
        .into_par_iter()
        .map(|path| {
            let sidecar = ctx.sidecars.dump(&path.join(ARCHIVE_SIDECAR));
            let size = ctx.probe.size_of(&path);
            (CacheEntry::new(path, size), sidecar)
        })
        .collect();

    let mut archives = Vec::new();
    let mut unlisted_bytes = 0;
    for (entry, sidecar) in probed {
        if sidecar.is_empty() {
            debug!(path = %entry.path.display(), "archive without readable Info.plist left out of list");
            unlisted_bytes += entry.size_bytes();
            continue;
        }
        archives.push(ApplicationArchive {
            name: field_or_unknown(&sidecar, KEY_NAME),
            bundle_identifier: field_or_unknown(&sidecar, KEY_BUNDLE_ID),
            version: field_or_unknown(&sidecar, KEY_SHORT_VERSION),
            build_number: field_or_unknown(&sidecar, KEY_BUNDLE_VERSION),
            creation_date: field_or_unknown(&sidecar, KEY_CREATION_DATE),
            entry,
        });
    }
    (archives, unlisted_bytes)
}

/// Shared simulator caches plus every device's own `Library/Caches`, as one total.
fn scan_simulator(ctx: &ScanContext<'_>) -> CacheEntry {
    let root = ctx.home.join(CORE_SIMULATOR);
    let caches = size::parse(&ctx.probe.size_of(&root.join(SIMULATOR_CACHES)));
    let temp = size::parse(&ctx.probe.size_of(&root.join(SIMULATOR_TEMP)));
    let device_caches = sum_child_sizes_matching(ctx.probe, &root, SIMULATOR_DEVICE_CACHES_GLOB);

    CacheEntry::new(root, size::format(caches + temp + device_caches))
}
