use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Paths the user never wants listed or deleted.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    rules: Vec<PathBuf>,
}

impl Allowlist {
    pub fn new(rules: Vec<PathBuf>) -> Self {
        Self { rules }
    }

    /// Loads `allowlist.txt` from `path`. Missing or unreadable files give an empty allowlist.
    pub fn load_from(path: &Path) -> Self {
        let mut rules = Vec::new();

        if let Ok(file) = fs::File::open(path) {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(Result::ok) {
                let trimmed = line.trim();
                // Skip empty lines and comments
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    rules.push(PathBuf::from(trimmed));
                }
            }
        }

        Self { rules }
    }

    /// True when `path` is a rule or lies below one. Matching is per path component.
    pub fn is_allowed(&self, path: &Path) -> bool {
        self.rules.iter().any(|rule| path.starts_with(rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
