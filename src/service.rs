use crate::cleaner::Cleaner;
use crate::config::Config;
use crate::model::{CacheItem, CacheScanResult, ScanPhase};
use crate::probe::DuProbe;
use crate::scanner::{Orchestrator, ScanOptions, packages};
use crate::sidecar;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Outcome of deleting a selection of items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub deleted: usize,
    /// Display names of the items that could not be deleted.
    pub failed: Vec<String>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Scanning and deletion for one session, plus the most recent scan result.
///
/// Not reentrant: callers serialise scans and deletions themselves.
pub struct CacheService {
    orchestrator: Orchestrator,
    cleaner: Cleaner,
    last: Mutex<Option<Arc<CacheScanResult>>>,
}

impl CacheService {
    pub fn new(config: &Config) -> Self {
        let orchestrator = Orchestrator::new(
            config.home.clone(),
            Box::new(DuProbe),
            sidecar::default_reader(),
            config.allowlist.clone(),
        );
        let cleaner = Cleaner::new(config.home.clone(), config.allowlist.clone());
        Self::from_parts(orchestrator, cleaner)
    }

    pub fn from_parts(orchestrator: Orchestrator, cleaner: Cleaner) -> Self {
        Self {
            orchestrator,
            cleaner,
            last: Mutex::new(None),
        }
    }

    pub fn home(&self) -> &Path {
        self.orchestrator.home()
    }

    /// Runs a scan and replaces the last result once it is complete.
    pub fn scan(
        &self,
        options: ScanOptions,
        on_progress: &dyn Fn(ScanPhase),
    ) -> Arc<CacheScanResult> {
        let result = Arc::new(self.orchestrator.run_scan(options, on_progress));
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&result));
        result
    }

    pub fn last_result(&self) -> Option<Arc<CacheScanResult>> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds per-version package detail to the last result without rescanning
    /// the other categories. `None` before the first scan.
    pub fn load_packages(&self) -> Option<Arc<CacheScanResult>> {
        let mut result = (*self.last_result()?).clone();
        packages::attach_packages(
            &mut result.package_managers,
            self.orchestrator.enumerate_packages(),
        );
        result.package_manager_total = packages::package_total(&result.package_managers);

        let result = Arc::new(result);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&result));
        Some(result)
    }

    pub fn delete(&self, item: &CacheItem) -> bool {
        self.cleaner.delete(item)
    }

    /// Deletes folders first, then projects, device symbols, archives and
    /// package versions. Keeps going after a failure.
    pub fn delete_many(&self, items: &[CacheItem]) -> BatchOutcome {
        let mut ordered: Vec<&CacheItem> = items.iter().collect();
        ordered.sort_by_key(|item| item.batch_rank());

        let mut outcome = BatchOutcome::default();
        for item in ordered {
            if self.cleaner.delete(item) {
                outcome.deleted += 1;
            } else {
                outcome.failed.push(item.display_name());
            }
        }
        info!(
            deleted = outcome.deleted,
            failed = outcome.failed.len(),
            "batch deletion finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::Allowlist;
    use crate::constants::{LIBRARY_CACHES, PUB_CACHE, PUB_HOSTED, TOP_GENERAL_LIMIT};
    use crate::model::{CacheEntry, ScanMode};
    use crate::probe::testing::FixedProbe;
    use crate::sidecar::PlainText;
    use anyhow::Result;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn service(home: &Path, probe: FixedProbe, allowlist: Allowlist) -> CacheService {
        CacheService::from_parts(
            Orchestrator::new(
                home.to_path_buf(),
                Box::new(probe),
                Box::new(PlainText),
                allowlist.clone(),
            ),
            Cleaner::new(home.to_path_buf(), allowlist),
        )
    }

    #[test]
    fn scan_replaces_last_result() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let svc = service(
            home,
            FixedProbe::default().with(home.join(LIBRARY_CACHES), "1G"),
            Allowlist::default(),
        );
        assert!(svc.last_result().is_none());

        let first = svc.scan(ScanOptions::default(), &|_| {});
        let full = ScanOptions {
            mode: ScanMode::Full,
            include_packages: false,
        };
        let second = svc.scan(full, &|_| {});

        let last = svc.last_result().expect("scan stored");
        assert!(Arc::ptr_eq(&last, &second));
        assert!(!Arc::ptr_eq(&last, &first));
        assert_eq!(last.mode, ScanMode::Full);
        assert_eq!(last.general_total, "1G");
        Ok(())
    }

    #[test]
    fn packages_loaded_into_last_result() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let version = home.join(PUB_HOSTED).join("pub.dev/http-1.2.0");
        fs::create_dir_all(&version)?;

        let svc = service(
            home,
            FixedProbe::default()
                .with(home.join(PUB_CACHE), "1G")
                .with(&version, "2M"),
            Allowlist::default(),
        );
        assert!(svc.load_packages().is_none());

        let scanned = svc.scan(ScanOptions::default(), &|_| {});
        assert!(scanned.package_managers.packages.is_empty());
        assert_eq!(scanned.package_manager_total, "1.00 GB");

        let loaded = svc.load_packages().expect("scanned before");
        assert_eq!(loaded.package_managers.packages.len(), 1);
        assert_eq!(loaded.package_manager_total, "2.0 MB");
        assert_eq!(loaded.general_total, scanned.general_total);
        assert!(Arc::ptr_eq(&svc.last_result().expect("stored"), &loaded));
        Ok(())
    }

    #[test]
    fn batch_continues_past_failures() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let caches = home.join(LIBRARY_CACHES);
        let keep = caches.join("com.keep");
        let drop_a = caches.join("com.drop.a");
        let drop_b = caches.join("com.drop.b");
        for p in [&keep, &drop_a, &drop_b] {
            fs::create_dir_all(p)?;
            fs::write(p.join("blob"), b"data")?;
        }

        let svc = service(
            home,
            FixedProbe::default(),
            Allowlist::new(vec![keep.clone()]),
        );
        let items: Vec<CacheItem> = [&drop_a, &keep, &drop_b]
            .into_iter()
            .map(|p| CacheItem::Folder(CacheEntry::new(p, "1M")))
            .collect();

        let outcome = svc.delete_many(&items);
        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.failed, vec!["com.keep".to_string()]);
        assert!(!outcome.is_success());
        assert!(keep.exists());
        assert!(!drop_a.exists() && !drop_b.exists());
        Ok(())
    }

    #[test]
    fn rescan_after_delete_drops_entry() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let caches = home.join(LIBRARY_CACHES);
        let big = caches.join("com.big");
        fs::create_dir_all(&big)?;

        let svc = service(
            home,
            FixedProbe::default().with(&big, "2G"),
            Allowlist::default(),
        );
        let before = svc.scan(ScanOptions::default(), &|_| {});
        assert_eq!(before.top_general.len(), 1);
        assert!(before.top_general.len() <= TOP_GENERAL_LIMIT);

        let target: PathBuf = before.top_general[0].path.clone();
        assert!(svc.delete(&CacheItem::Folder(before.top_general[0].clone())));
        assert!(!target.exists());

        let after = svc.scan(ScanOptions::default(), &|_| {});
        assert!(after.top_general.is_empty());
        Ok(())
    }
}
