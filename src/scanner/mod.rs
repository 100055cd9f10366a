pub mod general;
pub mod packages;
pub mod utils;
pub mod xcode;

use crate::allowlist::Allowlist;
use crate::model::{CacheScanResult, ScanMode, ScanPhase};
use crate::probe::SizeProbe;
use crate::sidecar::SidecarReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a category scanner needs for one scan.
pub struct ScanContext<'a> {
    pub home: &'a Path,
    pub probe: &'a dyn SizeProbe,
    pub sidecars: &'a dyn SidecarReader,
    pub allowlist: &'a Allowlist,
    pub mode: ScanMode,
}

pub trait CategoryScanner {
    type Output;

    fn phase(&self) -> ScanPhase;
    fn scan(&self, ctx: &ScanContext<'_>) -> Self::Output;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: ScanMode,
    /// Enumerate every package version in the shared package cache. Slow on large caches.
    pub include_packages: bool,
}

/// Runs the general, toolchain and package-manager scanners in that order.
pub struct Orchestrator {
    home: PathBuf,
    probe: Box<dyn SizeProbe>,
    sidecars: Box<dyn SidecarReader>,
    allowlist: Allowlist,
}

impl Orchestrator {
    pub fn new(
        home: PathBuf,
        probe: Box<dyn SizeProbe>,
        sidecars: Box<dyn SidecarReader>,
        allowlist: Allowlist,
    ) -> Self {
        Self {
            home,
            probe,
            sidecars,
            allowlist,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn context(&self, mode: ScanMode) -> ScanContext<'_> {
        ScanContext {
            home: &self.home,
            probe: self.probe.as_ref(),
            sidecars: self.sidecars.as_ref(),
            allowlist: &self.allowlist,
            mode,
        }
    }

    /// Full scan. Cannot fail: unreadable roots show up as zero sizes.
    pub fn run_scan(&self, options: ScanOptions, on_progress: &dyn Fn(ScanPhase)) -> CacheScanResult {
        let ctx = self.context(options.mode);
        info!(mode = options.mode.name(), home = %self.home.display(), "scan started");

        let general = run_phase(&general::GeneralScanner, &ctx, on_progress);
        let toolchain = run_phase(&xcode::ToolchainScanner, &ctx, on_progress);
        let packages = run_phase(
            &packages::PackageManagerScanner {
                include_packages: options.include_packages,
            },
            &ctx,
            on_progress,
        );

        let result = CacheScanResult {
            mode: options.mode,
            general_total: general.total,
            toolchain_total: toolchain.total,
            package_manager_total: packages.total,
            top_general: general.top,
            toolchain: toolchain.caches,
            package_managers: packages.caches,
        };
        info!(grand_total = %result.grand_total(), "scan finished");
        result
    }

    /// Package-version enumeration on its own, outside a regular scan.
    pub fn enumerate_packages(&self) -> Vec<crate::model::PackageGroup> {
        packages::enumerate_packages(&self.context(ScanMode::Full))
    }
}

fn run_phase<S: CategoryScanner>(
    scanner: &S,
    ctx: &ScanContext<'_>,
    on_progress: &dyn Fn(ScanPhase),
) -> S::Output {
    let phase = scanner.phase();
    on_progress(phase);
    info!(%phase, "phase started");
    scanner.scan(ctx)
}
