pub const LIBRARY_CACHES: &str = "Library/Caches";

pub const XCODE_DERIVED_DATA: &str = "Library/Developer/Xcode/DerivedData";
pub const XCODE_DEVICE_SUPPORT: &str = "Library/Developer/Xcode/iOS DeviceSupport";
pub const XCODE_ARCHIVES: &str = "Library/Developer/Xcode/Archives";
pub const CORE_SIMULATOR: &str = "Library/Developer/CoreSimulator";

// Relative to CORE_SIMULATOR.
pub const SIMULATOR_CACHES: &str = "Caches";
pub const SIMULATOR_TEMP: &str = "Temp";
pub const SIMULATOR_DEVICES: &str = "Devices";
pub const SIMULATOR_DEVICE_CACHES_GLOB: &str = "Devices/*/data/Library/Caches";

// Introduced with newer macOS / Xcode releases; attached only when non-empty.
pub const DEVELOPER_DISK_IMAGES: &str = "Library/Developer/DeveloperDiskImages";
pub const XCPG_DEVICES: &str = "Library/Developer/XCPGDevices";
pub const DVT_DOWNLOADS: &str = "Library/Developer/DVTDownloads";
pub const XCTEST_DEVICES: &str = "Library/Developer/XCTestDevices";

pub const PUB_CACHE: &str = ".pub-cache";
pub const PUB_HOSTED: &str = ".pub-cache/hosted";
pub const GRADLE_CACHE: &str = ".gradle";
pub const NPM_CACHE: &str = ".npm";
pub const HOME_CACHE: &str = ".cache";

pub const TOP_GENERAL_LIMIT: usize = 10;

/// `DerivedData` children carrying this marker are shared module caches, not projects.
pub const INDEX_EXEMPT_MARKER: &str = ".noindex";
pub const ARCHIVE_EXTENSION: &str = "xcarchive";
pub const ARCHIVE_SIDECAR: &str = "Info.plist";
pub const PROJECT_SIDECAR: &str = "info.plist";
pub const DEVICE_CACHES_DIR: &str = "Caches";

pub const KEY_NAME: &str = "Name";
pub const KEY_BUNDLE_ID: &str = "CFBundleIdentifier";
pub const KEY_SHORT_VERSION: &str = "CFBundleShortVersionString";
pub const KEY_BUNDLE_VERSION: &str = "CFBundleVersion";
pub const KEY_CREATION_DATE: &str = "CreationDate";
pub const KEY_WORKSPACE_PATH: &str = "WorkspacePath";
pub const KEY_LAST_ACCESSED: &str = "LastAccessedDate";

pub const UNKNOWN: &str = "Unknown";
