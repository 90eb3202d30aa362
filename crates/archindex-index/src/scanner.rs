//! Filesystem scanner: walks a project root and yields supported source files.
//!
//! The walk is best-effort. Unreadable entries, broken symlinks and symlink
//! loops are skipped; a single bad entry never aborts the scan.

use archindex_core::language_for_path;
use glob::Pattern;
use ignore::{Walk, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source file discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Absolute path as walked (not resolved).
    pub path: PathBuf,
    /// `/`-separated path relative to the scan root.
    pub relative_path: String,
    pub language: String,
    pub size_bytes: u64,
}

// ── Exclude Patterns ──────────────────────────────────────────────────────

struct ExcludePattern {
    full: Pattern,
    /// For `dir/**` patterns, the `dir` part matched against path prefixes
    /// and individual segments.
    subtree: Option<Pattern>,
}

/// A compiled set of fnmatch-style exclude globs.
pub struct ExcludeSet {
    patterns: Vec<ExcludePattern>,
}

impl ExcludeSet {
    /// Compile the patterns. Invalid globs are dropped with a warning.
    pub fn new(patterns: &[String]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let full = match Pattern::new(raw) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", raw, err);
                    continue;
                }
            };
            let subtree = raw
                .strip_suffix("/**")
                .and_then(|base| Pattern::new(base).ok());
            compiled.push(ExcludePattern { full, subtree });
        }
        Self { patterns: compiled }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a `/`-separated relative path is excluded.
    ///
    /// A path is excluded when it matches a glob outright, or when a
    /// `dir/**` pattern's `dir` matches any leading prefix of the path or
    /// any single segment of it.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.full.matches(relative_path)
                || p.subtree
                    .as_ref()
                    .is_some_and(|base| subtree_matches(base, relative_path))
        })
    }

    /// Whether every path below this directory would be excluded.
    fn prunes_dir(&self, relative_dir: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.subtree
                .as_ref()
                .is_some_and(|base| subtree_matches(base, relative_dir))
        })
    }
}

fn subtree_matches(base: &Pattern, relative_path: &str) -> bool {
    let parts: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
    (0..parts.len()).any(|i| base.matches(&parts[..=i].join("/")) || base.matches(parts[i]))
}

/// Convenience check against uncompiled patterns.
pub fn should_exclude(relative_path: &str, patterns: &[String]) -> bool {
    !patterns.is_empty() && ExcludeSet::new(patterns).is_excluded(relative_path)
}

// ── Scanner ───────────────────────────────────────────────────────────────

/// Walks a project root, applying excludes, a size ceiling and a
/// symlink-cycle guard.
pub struct Scanner {
    root: PathBuf,
    excludes: Arc<ExcludeSet>,
    max_file_size: u64,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, exclude_patterns: &[String], max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            excludes: Arc::new(ExcludeSet::new(exclude_patterns)),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh lazy walk. Each call restarts from the root with an
    /// empty visited set.
    pub fn scan(&self) -> ScanIter {
        let excludes = Arc::clone(&self.excludes);
        let root = self.root.clone();

        let walk = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                match relative_to(&root, entry.path()) {
                    Some(rel) => !excludes.prunes_dir(&rel),
                    None => true,
                }
            })
            .build();

        ScanIter {
            walk,
            root: self.root.clone(),
            excludes: Arc::clone(&self.excludes),
            max_file_size: self.max_file_size,
            visited: HashSet::new(),
        }
    }
}

/// Lazy iterator over the files of one scan.
pub struct ScanIter {
    walk: Walk,
    root: PathBuf,
    excludes: Arc<ExcludeSet>,
    max_file_size: u64,
    visited: HashSet<PathBuf>,
}

impl ScanIter {
    fn accept(&mut self, path: &Path) -> Option<ScannedFile> {
        let relative_path = relative_to(&self.root, path)?;
        if self.excludes.is_excluded(&relative_path) {
            return None;
        }
        let language = language_for_path(path)?;

        // Broken symlinks fail here.
        let real = std::fs::canonicalize(path).ok()?;
        if !self.visited.insert(real) {
            tracing::debug!("Skipping already visited {}", relative_path);
            return None;
        }

        let size_bytes = std::fs::metadata(path).ok()?.len();
        if size_bytes > self.max_file_size {
            tracing::debug!(
                "Skipping {} ({} bytes exceeds {})",
                relative_path,
                size_bytes,
                self.max_file_size
            );
            return None;
        }

        Some(ScannedFile {
            path: path.to_path_buf(),
            relative_path,
            language: language.to_string(),
            size_bytes,
        })
    }
}

impl Iterator for ScanIter {
    type Item = ScannedFile;

    fn next(&mut self) -> Option<ScannedFile> {
        loop {
            let entry = match self.walk.next()? {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!("Walk error: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                continue;
            }
            if let Some(file) = self.accept(entry.path()) {
                return Some(file);
            }
        }
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    fn scan_paths(scanner: &Scanner) -> Vec<String> {
        scanner.scan().map(|f| f.relative_path).collect()
    }

    #[test]
    fn exclude_matches_glob_and_directory_prefix() {
        let p = patterns(&["*.pyc", ".git/**", "node_modules/**"]);
        assert!(should_exclude("module.pyc", &p));
        assert!(should_exclude(".git/objects/ab/cdef", &p));
        assert!(should_exclude("web/node_modules/react/index.js", &p));
        assert!(!should_exclude("src/main.py", &p));
        assert!(!should_exclude("src/main.py", &[]));
    }

    #[test]
    fn exclude_subtree_pattern_matches_nested_prefix() {
        let p = patterns(&["src/generated/**"]);
        assert!(should_exclude("src/generated/api.py", &p));
        assert!(!should_exclude("src/handwritten/api.py", &p));
    }

    #[test]
    fn invalid_pattern_is_dropped() {
        let set = ExcludeSet::new(&patterns(&["a**b", "*.log"]));
        assert!(set.is_excluded("debug.log"));
        assert!(!set.is_excluded("a/b"));
    }

    #[test]
    fn scan_yields_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/pkg")).unwrap();
        fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        fs::write(dir.path().join("src/app.ts"), "export {}\n").unwrap();
        fs::write(dir.path().join("src/pkg/Main.java"), "class Main {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# readme\n").unwrap();

        let scanner = Scanner::new(dir.path(), &[], 1024 * 1024);
        let files: Vec<_> = scanner.scan().collect();
        let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["main.py", "src/app.ts", "src/pkg/Main.java"]);

        let java = &files[2];
        assert_eq!(java.language, "java");
        assert_eq!(java.size_bytes, 14);
    }

    #[test]
    fn scan_applies_excludes_and_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "x\n").unwrap();
        fs::write(dir.path().join("small.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("big.py"), "x = 1\n".repeat(100)).unwrap();

        let scanner = Scanner::new(dir.path(), &patterns(&["node_modules/**"]), 64);
        assert_eq!(scan_paths(&scanner), vec!["small.py"]);
    }

    #[test]
    fn scan_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.go"), "package a\n").unwrap();
        fs::write(dir.path().join("b.go"), "package b\n").unwrap();

        let scanner = Scanner::new(dir.path(), &[], 1024);
        let first = scan_paths(&scanner);
        let second = scan_paths(&scanner);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn scan_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("m{i}.py")), "pass\n").unwrap();
        }
        let scanner = Scanner::new(dir.path(), &[], 1024);
        let mut iter = scanner.scan();
        assert_eq!(iter.next().map(|f| f.relative_path), Some("m0.py".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn self_referential_symlink_terminates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/mod.py"), "pass\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("pkg"), dir.path().join("pkg/loop")).unwrap();

        let scanner = Scanner::new(dir.path(), &[], 1024);
        let paths = scan_paths(&scanner);
        assert_eq!(paths, vec!["pkg/mod.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_visited_once_and_broken_links_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "pass\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.py"), dir.path().join("b.py")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.py"), dir.path().join("c.py"))
            .unwrap();

        let scanner = Scanner::new(dir.path(), &[], 1024);
        assert_eq!(scan_paths(&scanner), vec!["a.py"]);
    }
}
