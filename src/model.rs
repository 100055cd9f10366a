use crate::size;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identity of one entry within the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Root-level probes only for the derived data, device support and archive roots.
    #[default]
    Quick,
    /// Enumerates and sizes every child of those roots.
    Full,
}

impl ScanMode {
    pub fn is_full(self) -> bool {
        self == Self::Full
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    General,
    Toolchain,
    PackageManager,
}

impl ScanPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::General => "Scanning general caches...",
            Self::Toolchain => "Scanning Xcode and simulator caches...",
            Self::PackageManager => "Scanning package manager caches...",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A sized filesystem location. Immutable; replaced wholesale on rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: EntryId,
    pub path: PathBuf,
    /// Human-readable size, always parseable by [`size::parse`].
    pub size: String,
}

impl CacheEntry {
    pub fn new(path: impl Into<PathBuf>, size: impl Into<String>) -> Self {
        Self {
            id: EntryId::next(),
            path: path.into(),
            size: size.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        size::parse(&self.size)
    }

    pub fn display_name(&self) -> String {
        last_component(&self.path)
    }
}

/// One project folder inside the derived data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCacheProject {
    pub entry: CacheEntry,
    pub project_name: String,
    pub workspace_path: String,
    pub last_accessed: String,
}

impl BuildCacheProject {
    pub fn description(&self) -> String {
        format!(
            "{}\nWorkspace: {}\nLast accessed: {}",
            self.project_name,
            last_component(Path::new(&self.workspace_path)),
            self.last_accessed
        )
    }
}

/// Debug symbols copied from one connected device, e.g. `iPhone16,1 18.2 (22C152)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSymbolCache {
    pub entry: CacheEntry,
    pub model_code: String,
    pub os_version: String,
    pub build_number: String,
}

impl DeviceSymbolCache {
    /// Splits `<model> <version> (<build>)`. Names with fewer than three tokens are rejected.
    pub fn from_dir_name(name: &str, entry: CacheEntry) -> Option<Self> {
        let tokens: Vec<&str> = name.split(' ').collect();
        if tokens.len() < 3 {
            return None;
        }
        Some(Self {
            entry,
            model_code: tokens[0].to_string(),
            os_version: tokens[1].to_string(),
            build_number: tokens[2].trim_matches(|c| c == '(' || c == ')').to_string(),
        })
    }

    pub fn device_name(&self) -> &str {
        marketing_name(&self.model_code).unwrap_or(&self.model_code)
    }

    pub fn display_name(&self) -> String {
        format!("{} iOS {}", self.device_name(), self.os_version)
    }

    pub fn description(&self) -> String {
        format!(
            "{} - iOS {} ({})",
            self.device_name(),
            self.os_version,
            self.build_number
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationArchive {
    pub entry: CacheEntry,
    pub name: String,
    pub bundle_identifier: String,
    pub version: String,
    pub build_number: String,
    pub creation_date: String,
}

impl ApplicationArchive {
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.name, self.version, self.build_number)
    }

    pub fn description(&self) -> String {
        format!(
            "{} - {}\nVersion: {}, build: {}\nCreated: {}",
            self.name, self.bundle_identifier, self.version, self.build_number, self.creation_date
        )
    }
}

/// One installed version of a package in the shared package cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub entry: CacheEntry,
    pub package_name: String,
    pub version: String,
}

impl PackageVersion {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.package_name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageGroup {
    pub name: String,
    pub versions: Vec<PackageVersion>,
    pub total_size: String,
}

impl PackageGroup {
    pub fn display_name(&self) -> String {
        let count = self.versions.len();
        let noun = if count == 1 { "version" } else { "versions" };
        format!("{} ({count} {noun})", self.name)
    }
}

/// Xcode and simulator caches.
///
/// The four core roots are always present (zero-sized when missing). The
/// roots introduced by newer OS releases are only attached when non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCaches {
    pub derived_data: CacheEntry,
    pub device_support: CacheEntry,
    pub archives: CacheEntry,
    /// Rolled-up simulator caches; never listed per device.
    pub simulator: CacheEntry,
    pub projects: Vec<BuildCacheProject>,
    pub devices: Vec<DeviceSymbolCache>,
    pub archive_list: Vec<ApplicationArchive>,
    pub disk_images: Option<CacheEntry>,
    pub playground_devices: Option<CacheEntry>,
    pub downloads: Option<CacheEntry>,
    pub test_devices: Option<CacheEntry>,
}

impl ToolchainCaches {
    /// Root entries in probe order, skipping unattached optional roots.
    pub fn roots(&self) -> Vec<&CacheEntry> {
        let mut roots = vec![
            &self.derived_data,
            &self.device_support,
            &self.archives,
            &self.simulator,
        ];
        roots.extend(
            [
                &self.disk_images,
                &self.playground_devices,
                &self.downloads,
                &self.test_devices,
            ]
            .into_iter()
            .flatten(),
        );
        roots
    }
}

/// Package-manager caches, each attached only when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManagerCaches {
    pub pub_cache: Option<CacheEntry>,
    pub gradle: Option<CacheEntry>,
    pub npm: Option<CacheEntry>,
    pub home_cache: Option<CacheEntry>,
    /// Filled only when package enumeration was requested.
    pub packages: Vec<PackageGroup>,
}

impl PackageManagerCaches {
    pub fn roots(&self) -> Vec<&CacheEntry> {
        [&self.pub_cache, &self.gradle, &self.npm, &self.home_cache]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Snapshot of one completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScanResult {
    pub mode: ScanMode,
    pub general_total: String,
    pub toolchain_total: String,
    pub package_manager_total: String,
    /// Largest immediate children of the general cache root, largest first.
    pub top_general: Vec<CacheEntry>,
    pub toolchain: ToolchainCaches,
    pub package_managers: PackageManagerCaches,
}

impl CacheScanResult {
    pub fn grand_total_bytes(&self) -> u64 {
        size::parse(&self.general_total)
            + size::parse(&self.toolchain_total)
            + size::parse(&self.package_manager_total)
    }

    /// Recomputed from the three category totals on every call.
    pub fn grand_total(&self) -> String {
        size::format(self.grand_total_bytes())
    }
}

/// Anything the user can select for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheItem {
    Folder(CacheEntry),
    Project(BuildCacheProject),
    DeviceSymbols(DeviceSymbolCache),
    Archive(ApplicationArchive),
    PackageVersion(PackageVersion),
}

impl CacheItem {
    pub fn entry(&self) -> &CacheEntry {
        match self {
            Self::Folder(entry) => entry,
            Self::Project(project) => &project.entry,
            Self::DeviceSymbols(device) => &device.entry,
            Self::Archive(archive) => &archive.entry,
            Self::PackageVersion(version) => &version.entry,
        }
    }

    pub fn id(&self) -> EntryId {
        self.entry().id
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Folder(entry) => entry.display_name(),
            Self::Project(project) => project.project_name.clone(),
            Self::DeviceSymbols(device) => device.display_name(),
            Self::Archive(archive) => archive.display_name(),
            Self::PackageVersion(version) => version.display_name(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Folder(entry) => entry.path.display().to_string(),
            Self::Project(project) => project.description(),
            Self::DeviceSymbols(device) => device.description(),
            Self::Archive(archive) => archive.description(),
            Self::PackageVersion(version) => version.entry.path.display().to_string(),
        }
    }

    /// Folders are deleted before the finer-grained kinds.
    pub fn batch_rank(&self) -> u8 {
        match self {
            Self::Folder(_) => 0,
            Self::Project(_) => 1,
            Self::DeviceSymbols(_) => 2,
            Self::Archive(_) => 3,
            Self::PackageVersion(_) => 4,
        }
    }
}

fn last_component(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn marketing_name(model_code: &str) -> Option<&'static str> {
    let name = match model_code {
        "iPhone14,2" => "iPhone 13 Pro",
        "iPhone14,3" => "iPhone 13 Pro Max",
        "iPhone14,4" => "iPhone 13 mini",
        "iPhone14,5" => "iPhone 13",
        "iPhone15,2" => "iPhone 14 Pro",
        "iPhone15,3" => "iPhone 14 Pro Max",
        "iPhone15,4" => "iPhone 14",
        "iPhone15,5" => "iPhone 14 Plus",
        "iPhone16,1" => "iPhone 15 Pro",
        "iPhone16,2" => "iPhone 15 Pro Max",
        "iPhone16,3" => "iPhone 15",
        "iPhone16,4" => "iPhone 15 Plus",
        "iPhone17,1" => "iPhone 16 Pro",
        "iPhone17,2" => "iPhone 16 Pro Max",
        "iPhone17,3" => "iPhone 16",
        "iPhone17,4" => "iPhone 16 Plus",
        "iPad13,1" | "iPad13,2" => "iPad Air (4th gen)",
        "iPad13,16" | "iPad13,17" => "iPad Air (5th gen)",
        "iPad14,1" | "iPad14,2" => "iPad mini (6th gen)",
        "iPad13,4" | "iPad13,5" | "iPad13,6" | "iPad13,7" => "iPad Pro 11\" (3rd gen)",
        "iPad13,8" | "iPad13,9" | "iPad13,10" | "iPad13,11" => "iPad Pro 12.9\" (5th gen)",
        "iPad14,3" | "iPad14,4" => "iPad Pro 11\" (4th gen)",
        "iPad14,5" | "iPad14,6" => "iPad Pro 12.9\" (6th gen)",
        _ => return None,
    };
    Some(name)
}
