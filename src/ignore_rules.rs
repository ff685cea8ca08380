//! Ignore rules: loading patterns from a `.gitignore`-style file and
//! compiling them, together with excluded extensions, into one matcher.
//!
//! Patterns are plain globs matched against the path of an entry relative to
//! the traversal root, always using `/` as separator. Hidden names are not
//! special: `*` matches `.env` just like it matches `main.rs`. Brace sets
//! such as `*.{log,tmp}` are expanded before compiling, since `glob` treats
//! braces literally; a brace group without a comma stays literal.

use glob::{MatchOptions, Pattern};
use log::{debug, error, warn};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;

/// Name of the ignore file looked up in the traversal root.
pub const GITIGNORE_FILE: &str = ".gitignore";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Splits ignore-file content into patterns, dropping blank lines and `#` comments.
pub fn parse_ignore_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Reads patterns from an ignore file.
///
/// A missing file is a warning and an unreadable one an error, but both
/// degrade to an empty pattern list so the digest still gets produced.
pub fn read_ignore_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let patterns = parse_ignore_patterns(&content);
            debug!(
                "Loaded {} ignore pattern(s) from {}",
                patterns.len(),
                path.display()
            );
            patterns
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Ignore file not found: {}", path.display());
            Vec::new()
        }
        Err(err) => {
            error!("Error reading ignore file {}: {err}", path.display());
            Vec::new()
        }
    }
}

/// Loads `.gitignore` from `dir`.
pub fn load_gitignore(dir: &Path) -> Vec<String> {
    read_ignore_file(&dir.join(GITIGNORE_FILE))
}

/// Compiled exclusion rules.
#[derive(Debug, Default, Clone)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
    extensions: HashSet<String>,
}

impl IgnoreRules {
    pub fn new<P, E>(patterns: P, ignored_extensions: E) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .flat_map(|raw| expand_braces(raw.as_ref()))
            .filter_map(|raw| match Pattern::new(&raw) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!("Skipping invalid ignore pattern {raw:?}: {err}");
                    None
                }
            })
            .collect();

        let extensions = ignored_extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();

        Self {
            patterns,
            extensions,
        }
    }

    /// Rules that exclude nothing.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.extensions.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// True if any pattern matches the normalized relative path.
    pub fn matches_path(&self, rel_path: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(rel_path, MATCH_OPTIONS))
    }

    /// True if the lowercased extension of `path` is excluded.
    pub fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return false;
        }
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    pub fn is_excluded(&self, rel_path: &str, path: &Path) -> bool {
        self.matches_path(rel_path) || self.matches_extension(path)
    }
}

/// Expands the first brace group holding a top-level comma, recursively.
fn expand_braces(pattern: &str) -> Vec<String> {
    match find_brace_group(pattern) {
        Some((open, close, alternatives)) => {
            let (prefix, suffix) = (&pattern[..open], &pattern[close + 1..]);
            alternatives
                .iter()
                .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
                .collect()
        }
        None => vec![pattern.to_string()],
    }
}

/// Byte offsets of `{` and its matching `}`, plus the comma-separated parts.
fn find_brace_group(pattern: &str) -> Option<(usize, usize, Vec<&str>)> {
    let bytes = pattern.as_bytes();
    for (open, _) in pattern.match_indices('{') {
        let mut depth = 0usize;
        let mut part_start = open + 1;
        let mut parts = Vec::new();
        for (i, &b) in bytes.iter().enumerate().skip(open) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if parts.is_empty() {
                            break;
                        }
                        parts.push(&pattern[part_start..i]);
                        return Some((open, i, parts));
                    }
                }
                b',' if depth == 1 => {
                    parts.push(&pattern[part_start..i]);
                    part_start = i + 1;
                }
                _ => {}
            }
        }
    }
    None
}

/// Accepts `log`, `.log` or `LOG` alike.
fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    (!ext.is_empty()).then(|| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let content = "# build output\ntarget\n\n   \n*.log  \n  dist\n#another\n";
        assert_eq!(
            parse_ignore_patterns(content),
            vec!["target", "*.log", "dist"]
        );
    }

    #[test]
    fn test_parse_handles_crlf() {
        assert_eq!(parse_ignore_patterns("a.txt\r\nb.txt\r\n"), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_missing_ignore_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_gitignore(dir.path()).is_empty());
    }

    #[test]
    fn test_load_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "b.png\n# comment\nnode_modules\n").unwrap();
        assert_eq!(load_gitignore(dir.path()), vec!["b.png", "node_modules"]);
    }

    #[test]
    fn test_unreadable_ignore_file_is_empty() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file.
        fs::create_dir(dir.path().join(".gitignore")).unwrap();
        assert!(load_gitignore(dir.path()).is_empty());
    }

    #[test]
    fn test_matches_dotfiles() {
        let rules = IgnoreRules::new(["*"], Vec::<String>::new());
        assert!(rules.matches_path(".env"));
        assert!(rules.matches_path("main.rs"));

        let rules = IgnoreRules::new([".git"], Vec::<String>::new());
        assert!(rules.matches_path(".git"));
        assert!(!rules.matches_path("src/.git"));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let rules = IgnoreRules::new(["*.log"], Vec::<String>::new());
        assert!(rules.matches_path("debug.log"));
        assert!(!rules.matches_path("logs/debug.log"));

        let rules = IgnoreRules::new(["**/*.log"], Vec::<String>::new());
        assert!(rules.matches_path("logs/debug.log"));
        assert!(rules.matches_path("a/b/c/debug.log"));
    }

    #[test]
    fn test_brace_sets_are_expanded() {
        let rules = IgnoreRules::new(["*.{log,tmp}"], Vec::<String>::new());
        assert_eq!(rules.pattern_count(), 2);
        assert!(rules.matches_path("a.log"));
        assert!(rules.matches_path("b.tmp"));
        assert!(!rules.matches_path("c.rs"));

        assert_eq!(
            expand_braces("{src,lib}/{a,b{1,2}}.rs"),
            vec!["src/a.rs", "src/b1.rs", "src/b2.rs", "lib/a.rs", "lib/b1.rs", "lib/b2.rs"]
        );
        assert_eq!(expand_braces("{lone}.txt"), vec!["{lone}.txt"]);
        assert_eq!(expand_braces("open{a,b"), vec!["open{a,b"]);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rules = IgnoreRules::new(["[", "target"], Vec::<String>::new());
        assert_eq!(rules.pattern_count(), 1);
        assert!(rules.matches_path("target"));
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let rules = IgnoreRules::new(Vec::<String>::new(), [".LOG", "tmp", ""]);
        assert!(rules.matches_extension(Path::new("a/debug.log")));
        assert!(rules.matches_extension(Path::new("debug.Log")));
        assert!(rules.matches_extension(Path::new("scratch.TMP")));
        assert!(!rules.matches_extension(Path::new("main.rs")));
        assert!(!rules.matches_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_empty_rules_exclude_nothing() {
        let rules = IgnoreRules::empty();
        assert!(rules.is_empty());
        assert!(!rules.is_excluded("anything.txt", Path::new("anything.txt")));
    }
}
