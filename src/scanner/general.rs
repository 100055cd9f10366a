use crate::constants::{LIBRARY_CACHES, TOP_GENERAL_LIMIT};
use crate::model::{CacheEntry, ScanPhase};
use crate::scanner::utils::top_children;
use crate::scanner::{CategoryScanner, ScanContext};

pub struct GeneralScan {
    pub total: String,
    pub top: Vec<CacheEntry>,
}

/// `~/Library/Caches`: one root probe plus its ten largest children.
pub struct GeneralScanner;

impl CategoryScanner for GeneralScanner {
    type Output = GeneralScan;

    fn phase(&self) -> ScanPhase {
        ScanPhase::General
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> GeneralScan {
        let root = ctx.home.join(LIBRARY_CACHES);
        GeneralScan {
            total: ctx.probe.size_of(&root),
            top: top_children(ctx, &root, TOP_GENERAL_LIMIT),
        }
    }
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
    use tempfile::tempdir;

    #[test]
    fn top_ten_largest_without_allowlisted() -> Result<()> {
        let dir = tempdir()?;
        let home = dir.path();
        let root = home.join(LIBRARY_CACHES);

        let mut probe = FixedProbe::default().with(&root, "9.9G");
        for i in 1..=12 {
            let child = root.join(format!("com.example.app{i:02}"));
            fs::create_dir_all(&child)?;
            probe = probe.with(child, &format!("{i}M"));
        }
        let allowlist = Allowlist::new(vec![root.join("com.example.app12")]);

        let ctx = ScanContext {
            home,
            probe: &probe,
            sidecars: &PlainText,
            allowlist: &allowlist,
            mode: ScanMode::Quick,
        };
        let scan = GeneralScanner.scan(&ctx);

        assert_eq!(scan.total, "9.9G");
        assert_eq!(scan.top.len(), TOP_GENERAL_LIMIT);
        assert_eq!(scan.top[0].display_name(), "com.example.app11");
        assert_eq!(scan.top[9].display_name(), "com.example.app02");
        assert!(
            scan.top
                .windows(2)
                .all(|w| w[0].size_bytes() >= w[1].size_bytes())
        );
        Ok(())
    }
}
