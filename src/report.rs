//! Non-interactive scan summary printed to stdout.

use crate::model::{CacheEntry, CacheScanResult};
use crate::scanner::ScanOptions;
use crate::service::CacheService;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::time::Duration;

const NAME_WIDTH: usize = 44;

pub fn run(service: &CacheService, options: ScanOptions) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✔"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = service.scan(options, &|phase| spinner.set_message(phase.label()));
    spinner.finish_and_clear();

    print!("{}", render(&result));
    Ok(())
}

pub fn render(result: &CacheScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "devsweep ({} scan) | total reclaimable: {}",
        result.mode.name(),
        result.grand_total()
    );

    section(&mut out, "General caches", &result.general_total);
    for entry in &result.top_general {
        line(&mut out, 2, &entry.display_name(), &entry.size);
    }

    let toolchain = &result.toolchain;
    section(&mut out, "Xcode and simulators", &result.toolchain_total);
    root(&mut out, "Derived data", &toolchain.derived_data);
    for project in &toolchain.projects {
        line(&mut out, 4, &project.project_name, &project.entry.size);
    }
    root(&mut out, "Device support", &toolchain.device_support);
    for device in &toolchain.devices {
        line(&mut out, 4, &device.display_name(), &device.entry.size);
    }
    root(&mut out, "Archives", &toolchain.archives);
    for archive in &toolchain.archive_list {
        line(&mut out, 4, &archive.display_name(), &archive.entry.size);
    }
    root(&mut out, "Simulator caches", &toolchain.simulator);
    for (label, entry) in [
        ("Developer disk images", &toolchain.disk_images),
        ("Playground devices", &toolchain.playground_devices),
        ("Developer downloads", &toolchain.downloads),
        ("Test devices", &toolchain.test_devices),
    ] {
        if let Some(entry) = entry {
            root(&mut out, label, entry);
        }
    }

    let packages = &result.package_managers;
    section(&mut out, "Package managers", &result.package_manager_total);
    for (label, entry) in [
        ("pub cache", &packages.pub_cache),
        ("Gradle", &packages.gradle),
        ("npm", &packages.npm),
        ("~/.cache", &packages.home_cache),
    ] {
        if let Some(entry) = entry {
            root(&mut out, label, entry);
        }
    }
    for group in &packages.packages {
        line(&mut out, 4, &group.display_name(), &group.total_size);
    }
    out
}

fn section(out: &mut String, title: &str, total: &str) {
    let _ = writeln!(out, "\n{title}: {total}");
}

fn root(out: &mut String, label: &str, entry: &CacheEntry) {
    line(out, 2, label, &entry.size);
}

fn line(out: &mut String, indent: usize, name: &str, size: &str) {
    let width = NAME_WIDTH.saturating_sub(indent);
    let _ = writeln!(out, "{:indent$}{name:<width$} {size:>10}", "");
}
