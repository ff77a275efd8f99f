//! Directory scanner collecting fragment lines from the mod tree
//!
//! Two kinds of files feed the line-oriented data kinds:
//! - `*.comp.injector` fragments, whose lines may belong to any kind and are
//!   offered to every enabled validator
//! - plain `.dat` / `.cfg` mirrors named exactly like a kind's target file,
//!   whose lines are taken as they are

use crate::files::read_lines;
use crate::ini::is_comment_or_blank;
use crate::kinds::DataKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File name suffix of catch-all fragment files
pub const FRAGMENT_SUFFIX: &str = ".comp.injector";

/// Extensions of plain data files that may mirror a target
pub const MIRROR_EXTENSIONS: &[&str] = &["dat", "cfg"];

/// Fragment lines gathered in one run, per data kind, in discovery order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentPool {
    /// Accepted lines per kind; duplicates are kept until merge time
    pub entries: BTreeMap<DataKind, Vec<String>>,
    /// Number of `*.comp.injector` files read
    pub fragment_files: usize,
    /// Number of plain mirror files read
    pub mirror_files: usize,
    /// Fragment lines no enabled validator accepted
    pub rejected_lines: usize,
}

impl FragmentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines collected for a kind
    pub fn entries(&self, kind: DataKind) -> &[String] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Add a line to a kind without validation
    pub fn push(&mut self, kind: DataKind, line: impl Into<String>) {
        self.entries.entry(kind).or_default().push(line.into());
    }

    /// Offer a fragment line to every enabled kind; returns how many took it
    pub fn offer(&mut self, line: &str, enabled: &[DataKind]) -> usize {
        let mut accepted = 0;
        for &kind in enabled {
            if kind.validate(line) {
                self.push(kind, line);
                accepted += 1;
            }
        }
        if accepted == 0 {
            self.rejected_lines += 1;
        }
        accepted
    }

    /// Total number of collected lines across kinds
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Walk `root` recursively in file-name order, yielding regular files and
/// skipping directories whose name starts with `.`
pub fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

/// Collect fragment lines for the enabled kinds from everything below `root`
pub fn collect_fragments(root: &Path, enabled: &[DataKind]) -> FragmentPool {
    let mut pool = FragmentPool::new();

    if !root.exists() {
        tracing::warn!("mod root {} not found, no fragments collected", root.display());
        return pool;
    }

    for path in walk_files(root) {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        if file_name.to_ascii_lowercase().ends_with(FRAGMENT_SUFFIX) {
            collect_fragment_file(&mut pool, &path, enabled);
        } else if let Some(kind) = mirrored_kind(&path, &file_name, enabled) {
            collect_mirror_file(&mut pool, &path, kind);
        }
    }

    tracing::info!(
        "collected {} entries from {} fragment files and {} mirror files ({} lines rejected)",
        pool.total_entries(),
        pool.fragment_files,
        pool.mirror_files,
        pool.rejected_lines
    );
    pool
}

fn collect_fragment_file(pool: &mut FragmentPool, path: &Path, enabled: &[DataKind]) {
    let lines = match read_lines(path) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!("skipping fragment: {}", e);
            return;
        }
    };

    pool.fragment_files += 1;
    let mut accepted = 0;
    for line in lines.iter().filter(|l| !is_comment_or_blank(l)) {
        accepted += pool.offer(line, enabled);
    }
    tracing::debug!("{}: {} lines accepted", path.display(), accepted);
}

fn collect_mirror_file(pool: &mut FragmentPool, path: &Path, kind: DataKind) {
    let lines = match read_lines(path) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!("skipping mirror file: {}", e);
            return;
        }
    };

    pool.mirror_files += 1;
    for line in lines.into_iter().filter(|l| !is_comment_or_blank(l)) {
        pool.push(kind, line);
    }
    tracing::debug!(kind = kind.descriptor().log_prefix, "read mirror {}", path.display());
}

/// Kind whose target file `file_name` mirrors, if any
fn mirrored_kind(path: &Path, file_name: &str, enabled: &[DataKind]) -> Option<DataKind> {
    let is_mirror_ext = path.extension().is_some_and(|ext| {
        MIRROR_EXTENSIONS
            .iter()
            .any(|m| ext.eq_ignore_ascii_case(m))
    });
    if !is_mirror_ext {
        return None;
    }

    enabled.iter().copied().find(|kind| {
        kind.descriptor()
            .target_file_name()
            .eq_ignore_ascii_case(file_name)
    })
}
