use crate::model::CacheEntry;
use crate::probe::list_children_by_size;
use crate::scanner::ScanContext;
use crate::size;
use jwalk::WalkDir;
use std::path::{Path, PathBuf};

/// Root entry following the aggregation rule: with a non-empty detail list the
/// size is the sum of the listed children (`detail_bytes`), otherwise the root probe.
pub fn rolled_up(path: PathBuf, probed: String, detail_bytes: Option<u64>) -> CacheEntry {
    match detail_bytes {
        Some(bytes) => CacheEntry::new(path, size::format(bytes)),
        None => CacheEntry::new(path, probed),
    }
}

/// `Some(sum)` for a non-empty list, `None` otherwise.
pub fn detail_total<'a>(children: impl IntoIterator<Item = &'a CacheEntry>) -> Option<u64> {
    let mut iter = children.into_iter().peekable();
    iter.peek()?;
    Some(iter.map(CacheEntry::size_bytes).sum())
}

/// Probes `home/relative`, keeping it only when it holds anything.
pub fn attach_if_nonempty(ctx: &ScanContext<'_>, relative: &str) -> Option<CacheEntry> {
    let path = ctx.home.join(relative);
    let entry = CacheEntry::new(&path, ctx.probe.size_of(&path));
    (entry.size_bytes() > 0).then_some(entry)
}

/// Largest immediate children of `root` that are not allowlisted.
pub fn top_children(ctx: &ScanContext<'_>, root: &Path, limit: usize) -> Vec<CacheEntry> {
    list_children_by_size(ctx.probe, root, usize::MAX)
        .into_iter()
        .filter(|(_, path)| !ctx.allowlist.is_allowed(path))
        .take(limit)
        .map(|(size_text, path)| CacheEntry::new(path, size_text))
        .collect()
}

/// Every directory below `root` whose extension is `extension`, sorted.
pub fn find_dirs_with_extension(root: &Path, extension: &str) -> Vec<PathBuf> {
    if !root.exists() {
        return vec![];
    }

    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .skip_hidden(true)
        .into_iter()
        .flatten()
        .filter(|e| {
            e.file_type().is_dir()
                && Path::new(e.file_name()).extension().is_some_and(|ext| ext == extension)
        })
        .map(|e| e.path())
        .collect();
    found.sort();
    found
}

pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn sum_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>) -> u64 {
    entries.into_iter().map(CacheEntry::size_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn rolled_up_prefers_detail_sum() {
        let children = [CacheEntry::new("/r/a", "120M"), CacheEntry::new("/r/b", "80M")];
        let detail = detail_total(&children);
        assert_eq!(detail, Some(209_715_200));

        let root = rolled_up(PathBuf::from("/r"), "1G".to_string(), detail);
        assert_eq!(root.size_bytes(), 209_715_200);

        let root = rolled_up(PathBuf::from("/r"), "1G".to_string(), detail_total(std::iter::empty()));
        assert_eq!(root.size, "1G");
    }

    #[test]
    fn finds_nested_archive_bundles() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("2025-01-01/App 1-1-25, 10.00.xcarchive/Products"))?;
        fs::create_dir_all(root.join("2025-02-01/Other.xcarchive"))?;
        fs::create_dir_all(root.join("2025-02-01/not-an-archive"))?;
        fs::write(root.join("2025-02-01/file.xcarchive"), b"")?;

        let found = find_dirs_with_extension(root, "xcarchive");
        assert_eq!(
            found,
            vec![
                root.join("2025-01-01/App 1-1-25, 10.00.xcarchive"),
                root.join("2025-02-01/Other.xcarchive"),
            ]
        );
        assert!(find_dirs_with_extension(&root.join("missing"), "xcarchive").is_empty());
        Ok(())
    }
}
