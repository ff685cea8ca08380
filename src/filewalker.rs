use crate::classify::normalize_rel_path;
use crate::ignore_rules::IgnoreRules;
use anyhow::{Context, Result, bail};
use ignore::{DirEntry, WalkBuilder};
use log::{debug, error};
use std::path::{Path, PathBuf};

/// Collects the files under `root` that survive the ignore rules, depth-first
/// and sorted by file name within each directory.
///
/// Excluded directories are pruned without being read. Paths listed in `skip`
/// (the digest's own output, the ignore file) are never collected. Returned
/// entries live under the canonical form of `root`.
pub fn collect_files(root: &Path, rules: &IgnoreRules, skip: &[PathBuf]) -> Result<Vec<DirEntry>> {
    if !root.is_dir() {
        bail!("Traversal root is not a directory: {}", root.display());
    }
    let root = &root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root: {}", root.display()))?;

    let mut builder = WalkBuilder::new(root);

    // Only our own rules decide what is excluded
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let filter_root = root.to_path_buf();
    let filter_rules = rules.clone();
    let skip: Vec<PathBuf> = skip.iter().map(|p| absolute(p)).collect();
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let path = entry.path();
        let rel_path = normalize_rel_path(path, &filter_root);
        if filter_rules.is_excluded(&rel_path, path) {
            debug!("Ignoring: {rel_path}");
            return false;
        }
        !skip.iter().any(|s| s == path)
    });

    let mut entries = Vec::new();

    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.depth() > 0 && entry.path().is_file() {
                    entries.push(entry);
                }
            }
            Err(err) => {
                error!("Error walking path: {err}");
            }
        }
    }

    Ok(entries)
}

/// Canonical form of `path` when it exists, otherwise `path` unchanged.
pub fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
