//! Applying `.inj` directives to ini files
//!
//! This module provides:
//! - Lookup of the ini file a directive names, cached per name
//! - Line-level Replace / Merge edits that keep everything else in the file
//! - The directive pass over the mod tree, with its restore-on-nothing policy

use crate::baseline::{reference_baseline, restore_tree};
use crate::directive::{collect_directive_files, parse_directive_file, Directive, Modifier};
use crate::error::Result;
use crate::files::{copy_file, read_text, with_suffix, write_atomic};
use crate::ini::{is_comment_or_blank, parse_section_header};
use crate::paths::GamePaths;
use crate::scanner::walk_files;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Log prefix of the directive pass
pub const LOG_PREFIX: &str = "INJ";

/// Suffix of the one-time copy taken before an ini file is first rewritten
pub const INI_BACKUP_SUFFIX: &str = ".bak";

/// Result of a directive pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectiveReport {
    /// Directive files found
    pub files: Vec<PathBuf>,
    /// Directives parsed from them
    pub directives: usize,
    /// Ini files rewritten
    pub updated: Vec<PathBuf>,
    /// Ini files whose directives applied but which already held the result
    #[serde(default)]
    pub current: Vec<PathBuf>,
    /// Ini names no file could be found for
    pub unresolved: Vec<String>,
    /// Ini files that could not be rewritten (path, error message)
    pub errors: Vec<(PathBuf, String)>,
    /// Ini files restored from the reference tree
    pub restored: usize,
}

/// What applying one ini file's directives did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Directives changed the baseline and the file was rewritten
    Written,
    /// Directives changed the baseline, the live file already matched
    Current,
    /// Directives left the baseline as it was
    Unchanged,
}

/// Finds the ini file a directive refers to
///
/// Lookup order: absolute path, path relative to the directive file, first
/// file of that name under the mod root, then under the game root. Hits and
/// misses are cached by the name as written.
pub struct IniLocator<'a> {
    paths: &'a GamePaths,
    cache: HashMap<String, PathBuf>,
    missing: HashSet<String>,
}

impl<'a> IniLocator<'a> {
    pub fn new(paths: &'a GamePaths) -> Self {
        Self {
            paths,
            cache: HashMap::new(),
            missing: HashSet::new(),
        }
    }

    pub fn locate(&mut self, directive: &Directive) -> Option<PathBuf> {
        let key = directive.ini_file.as_str();
        if let Some(found) = self.cache.get(key) {
            return Some(found.clone());
        }
        if self.missing.contains(key) {
            return None;
        }

        match self.search(directive) {
            Some(found) => {
                self.cache.insert(key.to_string(), found.clone());
                Some(found)
            }
            None => {
                self.missing.insert(key.to_string());
                None
            }
        }
    }

    fn search(&self, directive: &Directive) -> Option<PathBuf> {
        let ini = Path::new(&directive.ini_file);
        if ini.is_absolute() && ini.exists() {
            return Some(ini.to_path_buf());
        }

        if let Some(local) = directive.source.parent().map(|dir| dir.join(ini)) {
            if local.exists() {
                return Some(local);
            }
        }

        let name = ini.file_name()?;
        find_file_by_name(&self.paths.modloader_root, name)
            .or_else(|| find_file_by_name(&self.paths.game_root, name))
    }
}

/// First regular file named exactly `name` below `root`
fn find_file_by_name(root: &Path, name: &OsStr) -> Option<PathBuf> {
    if !root.exists() {
        return None;
    }
    walk_files(root).find(|path| path.file_name() == Some(name))
}

/// Header line index and exclusive end of `section`
fn section_extent(lines: &[String], section: &str) -> Option<(usize, usize)> {
    let start = lines
        .iter()
        .position(|line| parse_section_header(line) == Some(section))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| parse_section_header(line).is_some())
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

/// Line index and `=` offset of `key` inside a section extent
fn find_key(lines: &[String], start: usize, end: usize, key: &str) -> Option<(usize, usize)> {
    (start + 1..end).find_map(|i| {
        let line = &lines[i];
        if is_comment_or_blank(line) {
            return None;
        }
        let eq = line.find('=')?;
        (line[..eq].trim() == key).then_some((i, eq))
    })
}

fn current_value(lines: &[String], section: &str, key: &str) -> Option<String> {
    let (start, end) = section_extent(lines, section)?;
    let (i, eq) = find_key(lines, start, end, key)?;
    Some(lines[i][eq + 1..].trim().to_string())
}

/// Set `key` in `section`, creating either as needed. Returns whether a line
/// changed or was inserted.
fn set_value(lines: &mut Vec<String>, section: &str, key: &str, value: &str) -> bool {
    let Some((start, end)) = section_extent(lines, section) else {
        if lines.last().is_some_and(|line| !line.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(format!("[{}]", section));
        lines.push(format!("{}={}", key, value));
        return true;
    };

    if let Some((i, eq)) = find_key(lines, start, end, key) {
        let line = &lines[i];
        let rest = &line[eq + 1..];
        let spacing = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let updated = format!("{}{}{}", &line[..=eq], &rest[..spacing], value);
        if updated == *line {
            return false;
        }
        lines[i] = updated;
        return true;
    }

    // After the last non-blank line, so trailing blank separators stay last
    let insert_at = (start + 1..end)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .map_or(start + 1, |i| i + 1);
    lines.insert(insert_at, format!("{}={}", key, value));
    true
}

/// Append `candidate` to a space-separated value unless its tokens already
/// occur there as a contiguous run
pub fn merge_value(current: &str, candidate: &str) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return current.to_string();
    }

    let existing: Vec<&str> = current.split_whitespace().collect();
    let wanted: Vec<&str> = candidate.split_whitespace().collect();
    if existing.windows(wanted.len()).any(|run| run == wanted.as_slice()) {
        return current.to_string();
    }

    if current.trim().is_empty() {
        candidate.to_string()
    } else if current.ends_with(char::is_whitespace) {
        format!("{}{}", current, candidate)
    } else {
        format!("{} {}", current, candidate)
    }
}

/// Apply directives to an ini document held as lines. Returns whether any
/// line changed.
///
/// All Merge values for one `(section, key)` are resolved together when the
/// first of them is reached, starting from the value already in the file.
pub fn apply_directives(lines: &mut Vec<String>, directives: &[&Directive]) -> bool {
    let mut merge_values: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
    for directive in directives.iter().filter(|d| d.modifier == Modifier::Merge) {
        merge_values
            .entry((directive.section.as_str(), directive.key.as_str()))
            .or_default()
            .push(directive.value.as_str());
    }

    let mut handled: HashSet<(&str, &str)> = HashSet::new();
    let mut changed = false;

    for directive in directives {
        let pair = (directive.section.as_str(), directive.key.as_str());
        let value = match directive.modifier {
            Modifier::Replace => directive.value.clone(),
            Modifier::Merge => {
                if !handled.insert(pair) {
                    continue;
                }
                let current = current_value(lines, pair.0, pair.1).unwrap_or_default();
                merge_values
                    .get(&pair)
                    .into_iter()
                    .flatten()
                    .fold(current, |acc, candidate| merge_value(&acc, candidate))
            }
        };

        changed |= set_value(lines, pair.0, pair.1, &value);
    }

    changed
}

/// Apply one ini file's directives on top of its baseline
///
/// Only [`ApplyOutcome::Unchanged`] means the directives had no effect; a
/// live file that already holds the merge from an earlier run is `Current`.
pub fn apply_to_file(
    paths: &GamePaths,
    ini: &Path,
    directives: &[&Directive],
) -> Result<ApplyOutcome> {
    let base = reference_baseline(paths, ini);
    let text = if base.exists() {
        read_text(&base)?
    } else {
        String::new()
    };

    let trailing_newline = text.is_empty() || text.ends_with('\n');
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

    if !apply_directives(&mut lines, directives) {
        return Ok(ApplyOutcome::Unchanged);
    }

    let mut rendered = lines.join("\n");
    if trailing_newline {
        rendered.push('\n');
    }

    if ini.exists() {
        let live = fs::read(ini)?;
        if live == rendered.as_bytes() {
            tracing::debug!(kind = LOG_PREFIX, "{} already up to date", ini.display());
            return Ok(ApplyOutcome::Current);
        }

        let backup = with_suffix(ini, INI_BACKUP_SUFFIX);
        if !backup.exists() {
            if let Err(e) = copy_file(ini, &backup) {
                tracing::warn!(kind = LOG_PREFIX, "could not back up ini: {}", e);
            }
        }
    }

    write_atomic(ini, rendered.as_bytes())?;
    Ok(ApplyOutcome::Written)
}

/// Directive files under the mod root, then under the plugin directory
fn gather_directive_files(paths: &GamePaths) -> Vec<PathBuf> {
    let mut files = collect_directive_files(&paths.modloader_root);

    if paths.plugin_dir != paths.modloader_root {
        let mut seen: HashSet<PathBuf> = files.iter().cloned().collect();
        for path in collect_directive_files(&paths.plugin_dir) {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    files
}

/// Run the directive pass
///
/// When there is nothing to apply (no directive files, no directives, or no
/// directive changed any baseline), every ini under the mod root is reset
/// from the reference tree instead.
pub fn process_directives(paths: &GamePaths) -> DirectiveReport {
    let mut report = DirectiveReport {
        files: gather_directive_files(paths),
        ..Default::default()
    };
    tracing::info!(kind = LOG_PREFIX, "found {} .inj files", report.files.len());

    let mut directives = Vec::new();
    for file in &report.files {
        match parse_directive_file(file) {
            Ok(parsed) => directives.extend(parsed),
            Err(e) => tracing::warn!(kind = LOG_PREFIX, "skipping directive file: {}", e),
        }
    }
    report.directives = directives.len();
    tracing::info!(kind = LOG_PREFIX, "parsed {} directives", directives.len());

    if !directives.is_empty() {
        let mut locator = IniLocator::new(paths);
        let mut groups: Vec<(PathBuf, Vec<&Directive>)> = Vec::new();
        let mut group_index: HashMap<PathBuf, usize> = HashMap::new();

        for directive in &directives {
            let Some(ini) = locator.locate(directive) else {
                if !report.unresolved.contains(&directive.ini_file) {
                    tracing::warn!(kind = LOG_PREFIX, "ini file not found: {}", directive.ini_file);
                    report.unresolved.push(directive.ini_file.clone());
                }
                continue;
            };

            let index = *group_index.entry(ini.clone()).or_insert_with(|| {
                groups.push((ini, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(directive);
        }

        for (ini, group) in &groups {
            match apply_to_file(paths, ini, group) {
                Ok(ApplyOutcome::Written) => {
                    tracing::info!(kind = LOG_PREFIX, "updated {}", ini.display());
                    report.updated.push(ini.clone());
                }
                Ok(ApplyOutcome::Current) => report.current.push(ini.clone()),
                Ok(ApplyOutcome::Unchanged) => {}
                Err(e) => {
                    tracing::warn!(kind = LOG_PREFIX, "failed to update {}: {}", ini.display(), e);
                    report.errors.push((ini.clone(), e.to_string()));
                }
            }
        }
    }

    if report.updated.is_empty() && report.current.is_empty() {
        tracing::info!(kind = LOG_PREFIX, "nothing applied, restoring ini files from reference");
        report.restored = restore_tree(paths, &paths.modloader_root, LOG_PREFIX);
    } else {
        tracing::info!(
            kind = LOG_PREFIX,
            "updated {} ini files, {} already current",
            report.updated.len(),
            report.current.len()
        );
    }

    report
}
