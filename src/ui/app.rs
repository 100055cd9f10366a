use crate::model::{CacheItem, CacheScanResult, EntryId, ScanPhase};
use crate::scanner::ScanOptions;
use crate::service::{BatchOutcome, CacheService};
use crate::size;
use humansize::{BINARY, format_size};
use ratatui::widgets::ListState;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use sysinfo::Disks;

pub enum AppState {
    Browsing,
    Confirming,
    Cleaning,
    Scanning,
    Done(String),
}

/// One selectable line in the cache list.
pub struct Row {
    pub group: &'static str,
    /// 0 for roots and top-level folders, 1 for entries listed under a root.
    pub depth: u8,
    pub item: CacheItem,
}

pub enum ScanUpdate {
    Progress(ScanPhase),
    Result(Arc<CacheScanResult>),
}

pub struct App {
    service: Arc<CacheService>,
    pub options: ScanOptions,
    pub result: Option<Arc<CacheScanResult>>,
    pub rows: Vec<Row>,
    pub selected: HashSet<EntryId>,
    pub list_state: ListState,
    pub state: AppState,
    pub disks: Disks,
    pub phase: Option<ScanPhase>,
    pub cleaning_rx: Option<mpsc::Receiver<BatchOutcome>>,
    pub scan_rx: Option<mpsc::Receiver<ScanUpdate>>,
    /// Shown once the rescan that follows a successful deletion completes.
    notice: Option<String>,
    cleaning_bytes: u64,
}

impl App {
    pub fn new_scanning(service: Arc<CacheService>, options: ScanOptions) -> Self {
        let disks = Disks::new_with_refreshed_list();
        Self {
            service,
            options,
            result: None,
            rows: Vec::new(),
            selected: HashSet::new(),
            list_state: ListState::default(),
            state: AppState::Scanning,
            disks,
            phase: None,
            cleaning_rx: None,
            scan_rx: None,
            notice: None,
            cleaning_bytes: 0,
        }
    }

    pub fn home(&self) -> &Path {
        self.service.home()
    }

    pub fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn highlighted(&self) -> Option<&Row> {
        self.list_state.selected().and_then(|i| self.rows.get(i))
    }

    pub fn toggle(&mut self) {
        let Some(id) = self.highlighted().map(|row| row.item.id()) else {
            return;
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn is_selected(&self, row: &Row) -> bool {
        self.selected.contains(&row.item.id())
    }

    /// Selected rows, minus any that lie inside another selected row.
    fn effective_selection(&self) -> Vec<&Row> {
        let chosen: Vec<&Row> = self.rows.iter().filter(|row| self.is_selected(row)).collect();
        chosen
            .iter()
            .filter(|row| {
                !chosen.iter().any(|outer| {
                    outer.item.id() != row.item.id()
                        && row.item.entry().path.starts_with(&outer.item.entry().path)
                })
            })
            .copied()
            .collect()
    }

    fn selected_items(&self) -> Vec<CacheItem> {
        self.effective_selection()
            .into_iter()
            .map(|row| row.item.clone())
            .collect()
    }

    pub fn total_selected_size(&self) -> u64 {
        self.effective_selection()
            .into_iter()
            .map(|row| row.item.entry().size_bytes())
            .sum()
    }

    /// Largest row size, used to scale the bars.
    pub fn max_row_size(&self) -> u64 {
        size::max_of(self.rows.iter().map(|row| row.item.entry().size.as_str()))
    }

    pub fn clean_selected(&mut self) {
        let items = self.selected_items();
        if items.is_empty() {
            self.state = AppState::Done("Nothing selected to clean.".to_string());
            return;
        }

        self.cleaning_bytes = self.total_selected_size();
        self.state = AppState::Cleaning;

        let (tx, rx) = mpsc::channel();
        self.cleaning_rx = Some(rx);

        let service = Arc::clone(&self.service);
        thread::spawn(move || {
            let outcome = service.delete_many(&items);
            let _ = tx.send(outcome);
        });
    }

    pub fn check_cleaning_status(&mut self) {
        let Some(outcome) = self.cleaning_rx.as_ref().and_then(|rx| rx.try_recv().ok()) else {
            return;
        };
        self.cleaning_rx = None;
        self.disks.refresh(true);

        if outcome.is_success() {
            self.notice = Some(format!(
                "Deleted {} item(s), about {} freed.",
                outcome.deleted,
                format_size(self.cleaning_bytes, BINARY)
            ));
            self.start_scan();
        } else {
            self.state = AppState::Done(format!(
                "Could not delete: {}",
                outcome.failed.join(", ")
            ));
        }
    }

    pub fn start_scan(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.scan_rx = Some(rx);
        self.state = AppState::Scanning;
        self.phase = None;

        let service = Arc::clone(&self.service);
        let options = self.options;
        thread::spawn(move || {
            let result = service.scan(options, &|phase| {
                let _ = tx.send(ScanUpdate::Progress(phase));
            });
            let _ = tx.send(ScanUpdate::Result(result));
        });
    }

    /// Sizes every package version and merges them into the current result.
    pub fn load_packages(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.scan_rx = Some(rx);
        self.state = AppState::Scanning;
        self.phase = Some(ScanPhase::PackageManager);

        let service = Arc::clone(&self.service);
        let options = ScanOptions {
            include_packages: true,
            ..self.options
        };
        thread::spawn(move || {
            let result = service
                .load_packages()
                .unwrap_or_else(|| service.scan(options, &|_| {}));
            let _ = tx.send(ScanUpdate::Result(result));
        });
    }

    pub fn check_scan_status(&mut self) {
        let Some(rx) = &self.scan_rx else {
            return;
        };

        let mut finished = None;
        while let Ok(update) = rx.try_recv() {
            match update {
                ScanUpdate::Progress(phase) => self.phase = Some(phase),
                ScanUpdate::Result(result) => finished = Some(result),
            }
        }

        if let Some(result) = finished {
            self.show_result(result);
            self.scan_rx = None;
            self.state = match self.notice.take() {
                Some(msg) => AppState::Done(msg),
                None => AppState::Browsing,
            };
        }
    }

    fn show_result(&mut self, result: Arc<CacheScanResult>) {
        self.rows = rows_for(&result);
        self.selected.clear();
        self.list_state
            .select(if self.rows.is_empty() { None } else { Some(0) });
        self.result = Some(result);
    }
}

/// Flattens a scan result into list rows, skipping anything empty.
pub fn rows_for(result: &CacheScanResult) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut push = |group: &'static str, depth: u8, item: CacheItem| {
        if item.entry().size_bytes() > 0 {
            rows.push(Row { group, depth, item });
        }
    };

    for entry in &result.top_general {
        push("General", 0, CacheItem::Folder(entry.clone()));
    }

    let toolchain = &result.toolchain;
    push("Xcode", 0, CacheItem::Folder(toolchain.derived_data.clone()));
    for project in &toolchain.projects {
        push("Xcode", 1, CacheItem::Project(project.clone()));
    }
    push("Xcode", 0, CacheItem::Folder(toolchain.device_support.clone()));
    for device in &toolchain.devices {
        push("Xcode", 1, CacheItem::DeviceSymbols(device.clone()));
    }
    push("Xcode", 0, CacheItem::Folder(toolchain.archives.clone()));
    for archive in &toolchain.archive_list {
        push("Xcode", 1, CacheItem::Archive(archive.clone()));
    }
    push("Simulator", 0, CacheItem::Folder(toolchain.simulator.clone()));
    for entry in [
        &toolchain.disk_images,
        &toolchain.playground_devices,
        &toolchain.downloads,
        &toolchain.test_devices,
    ]
    .into_iter()
    .flatten()
    {
        push("Xcode", 0, CacheItem::Folder(entry.clone()));
    }

    let packages = &result.package_managers;
    if let Some(entry) = &packages.pub_cache {
        push("Packages", 0, CacheItem::Folder(entry.clone()));
    }
    for version in packages.packages.iter().flat_map(|g| &g.versions) {
        push("Packages", 1, CacheItem::PackageVersion(version.clone()));
    }
    for entry in [&packages.gradle, &packages.npm, &packages.home_cache]
        .into_iter()
        .flatten()
    {
        push("Packages", 0, CacheItem::Folder(entry.clone()));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::Allowlist;
    use crate::cleaner::Cleaner;
    use crate::constants::{LIBRARY_CACHES, XCODE_DERIVED_DATA};
    use crate::model::{BuildCacheProject, CacheEntry, ScanMode};
    use crate::probe::testing::FixedProbe;
    use crate::scanner::Orchestrator;
    use crate::sidecar::PlainText;

    fn service(home: &Path) -> Arc<CacheService> {
        Arc::new(CacheService::from_parts(
            Orchestrator::new(
                home.to_path_buf(),
                Box::new(FixedProbe::default()),
                Box::new(PlainText),
                Allowlist::default(),
            ),
            Cleaner::new(home.to_path_buf(), Allowlist::default()),
        ))
    }

    fn scan_result(home: &Path) -> Arc<CacheScanResult> {
        let orchestrator = Orchestrator::new(
            home.to_path_buf(),
            Box::new(
                FixedProbe::default()
                    .with(home.join(LIBRARY_CACHES), "3G")
                    .with(home.join(XCODE_DERIVED_DATA), "2G"),
            ),
            Box::new(PlainText),
            Allowlist::default(),
        );
        let mut result = orchestrator.run_scan(ScanOptions::default(), &|_| {});
        result.top_general = vec![
            CacheEntry::new(home.join("Library/Caches/com.a"), "1G"),
            CacheEntry::new(home.join("Library/Caches/com.b"), "512M"),
        ];
        Arc::new(result)
    }

    #[test]
    fn test_check_scan_status_updates() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let mut app = App::new_scanning(service(home), ScanOptions::default());

        let (tx, rx) = mpsc::channel();
        app.scan_rx = Some(rx);

        tx.send(ScanUpdate::Progress(ScanPhase::Toolchain)).unwrap();
        app.check_scan_status();

        assert_eq!(app.phase, Some(ScanPhase::Toolchain));
        assert!(matches!(app.state, AppState::Scanning));
        assert!(app.scan_rx.is_some());

        tx.send(ScanUpdate::Result(scan_result(home))).unwrap();
        app.check_scan_status();

        assert!(matches!(app.state, AppState::Browsing));
        assert!(app.scan_rx.is_none());
        assert_eq!(app.result.as_ref().map(|r| r.mode), Some(ScanMode::Quick));
        assert_eq!(app.rows.len(), 3);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn toggle_tracks_selected_bytes() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let mut app = App::new_scanning(service(home), ScanOptions::default());
        app.show_result(scan_result(home));

        assert_eq!(app.total_selected_size(), 0);
        app.toggle();
        assert_eq!(app.total_selected_size(), 1024 * 1024 * 1024);
        app.next();
        app.toggle();
        assert_eq!(app.total_selected_size(), 1536 * 1024 * 1024);
        app.toggle();
        assert_eq!(app.total_selected_size(), 1024 * 1024 * 1024);
        assert_eq!(app.max_row_size(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn nested_selection_is_counted_once() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let mut result = (*scan_result(home)).clone();
        let project_path = result.toolchain.derived_data.path.join("App-abc123");
        result.toolchain.projects.push(BuildCacheProject {
            entry: CacheEntry::new(project_path, "512M"),
            project_name: "App".to_string(),
            workspace_path: "Unknown".to_string(),
            last_accessed: "Unknown".to_string(),
        });

        let mut app = App::new_scanning(service(home), ScanOptions::default());
        app.show_result(Arc::new(result));
        assert_eq!(app.rows.len(), 4);

        app.list_state.select(Some(2));
        app.toggle();
        app.next();
        app.toggle();
        assert_eq!(app.total_selected_size(), 2 * 1024 * 1024 * 1024);
        assert_eq!(app.selected_items().len(), 1);

        app.previous();
        app.toggle();
        assert_eq!(app.total_selected_size(), 512 * 1024 * 1024);
        assert!(matches!(app.selected_items()[0], CacheItem::Project(_)));
    }

    #[test]
    fn navigation_wraps() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let mut app = App::new_scanning(service(home), ScanOptions::default());
        app.show_result(scan_result(home));

        app.previous();
        assert_eq!(app.list_state.selected(), Some(2));
        app.next();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn empty_selection_is_reported() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let mut app = App::new_scanning(service(home), ScanOptions::default());
        app.show_result(scan_result(home));

        app.clean_selected();
        assert!(matches!(app.state, AppState::Done(_)));
        assert!(app.cleaning_rx.is_none());
    }

    #[test]
    fn rows_skip_empty_roots() {
        let home = Path::new("/nonexistent/devsweep-ui-test");
        let rows = rows_for(&scan_result(home));
        let groups: Vec<&str> = rows.iter().map(|r| r.group).collect();
        assert_eq!(groups, ["General", "General", "Xcode"]);
        assert!(matches!(rows[2].item, CacheItem::Folder(_)));
    }
}
