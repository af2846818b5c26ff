//! Directory scanner
//!
//! Finds the project files whose raw content contains a search key. The walk
//! visits a fixed list of conventional source directories first, then the
//! files sitting directly in the project root.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Source directories searched, in priority order.
pub const SEARCH_DIRS: &[&str] = &[
    "src",
    "app",
    "pages",
    "components",
    "views",
    "lib",
    "public",
    "frontend",
    "client",
];

/// Directories never descended into.
pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build"];

/// File extensions (without the dot) that are read.
pub const EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "vue", "svelte", "html", "css", "scss", "json",
];

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tunables for a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub search_dirs: Vec<String>,
    pub extensions: Vec<String>,
    pub ignored_dirs: Vec<String>,
    /// Maximum directory depth below each search directory
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            search_dirs: to_strings(SEARCH_DIRS),
            extensions: to_strings(EXTENSIONS),
            ignored_dirs: to_strings(IGNORED_DIRS),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ScanOptions {
    fn is_ignored_dir(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.ignored_dirs.iter().any(|ignored| *ignored == name)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// A project file that contains the search key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Path relative to the project root, `/`-separated
    pub relative: String,
}

/// Scan `root` for files containing `search_key`.
///
/// `root` must already be canonical. Symlinked entries that resolve outside
/// the root are pruned before they are descended into, and every file is
/// canonicalised before it is read.
pub fn scan(root: &Path, search_key: &str, options: &ScanOptions) -> Vec<CandidateFile> {
    let mut visited = HashSet::new();
    let mut candidates = Vec::new();

    for dir_name in &options.search_dirs {
        let dir = root.join(dir_name);
        match dir.canonicalize() {
            Ok(resolved) if resolved.is_dir() && resolved.starts_with(root) => {}
            Ok(resolved) if resolved.is_dir() => {
                warn!(dir = %dir.display(), "Skipping search directory outside project root");
                continue;
            }
            _ => continue,
        }

        for entry in walk(root, &dir, options) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Includes symlink loops detected by walkdir
                    warn!(error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if entry.file_type().is_file() {
                visit_file(
                    root,
                    entry.path(),
                    search_key,
                    options,
                    &mut visited,
                    &mut candidates,
                );
            }
        }
    }

    let mut root_files: Vec<PathBuf> = match fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(err) => {
            warn!(root = %root.display(), error = %err, "Failed to list project root");
            Vec::new()
        }
    };
    root_files.sort();

    for path in &root_files {
        visit_file(root, path, search_key, options, &mut visited, &mut candidates);
    }

    debug!(
        key = search_key,
        candidates = candidates.len(),
        "Scan finished"
    );
    candidates
}

/// Walk `dir` without leaving `root` or entering ignored directories
fn walk<'a>(
    root: &'a Path,
    dir: &Path,
    options: &'a ScanOptions,
) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
    WalkDir::new(dir)
        .follow_links(true)
        .max_depth(options.max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.file_type().is_dir()
                && entry.depth() > 0
                && options.is_ignored_dir(entry.file_name())
            {
                return false;
            }
            stays_within(root, entry)
        })
}

/// Entries reached through a symlink must resolve inside `root`.
///
/// Anything else is a plain child of an entry already inside the root.
fn stays_within(root: &Path, entry: &DirEntry) -> bool {
    if !entry.path_is_symlink() {
        return true;
    }
    match entry.path().canonicalize() {
        Ok(target) if target.starts_with(root) => true,
        Ok(_) => {
            debug!(path = %entry.path().display(), "Pruning symlink outside project root");
            false
        }
        Err(err) => {
            warn!(path = %entry.path().display(), error = %err, "Failed to resolve symlink");
            false
        }
    }
}

fn visit_file(
    root: &Path,
    path: &Path,
    search_key: &str,
    options: &ScanOptions,
    visited: &mut HashSet<PathBuf>,
    candidates: &mut Vec<CandidateFile>,
) {
    if !options.has_allowed_extension(path) {
        return;
    }

    let canonical = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to resolve file");
            return;
        }
    };

    if !canonical.starts_with(root) {
        warn!(path = %path.display(), "Skipping file outside project root");
        return;
    }

    if !visited.insert(canonical.clone()) {
        return;
    }

    let content = match fs::read_to_string(&canonical) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %canonical.display(), error = %err, "Failed to read file");
            return;
        }
    };

    if content.contains(search_key) {
        let relative = relative_path(root, &canonical);
        debug!(file = %relative, "Candidate file");
        candidates.push(CandidateFile { relative });
    }
}

/// Render `path` relative to `root` with `/` separators
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a project-relative path onto `root`, refusing anything that would
/// land outside it.
pub fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let joined = clean_path(&root.join(relative));
    joined.starts_with(root).then_some(joined)
}

/// Clean a path by resolving . and .. components without following symlinks
fn clean_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }
    result
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
