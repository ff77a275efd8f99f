//! Merge engine regenerating line-oriented data files from their baseline
//!
//! The regenerated file is the baseline with any previous merge block removed,
//! followed by the kind's marker line and the new entries:
//!
//! ```text
//! <baseline lines, comments and blanks kept>
//! ; comp.injector added weapons
//! <new entries, deduplicated>
//! <end line, for kinds that have one>
//! ```
//!
//! The output depends only on the baseline and the entries, so running the
//! merge again with the same fragments reproduces the same bytes.

use crate::baseline;
use crate::error::{Error, Result};
use crate::files::{file_contains, join_lines, read_text, write_atomic};
use crate::ini::is_comment_or_blank;
use crate::kinds::{KindDescriptor, SentinelPolicy};
use crate::paths::GamePaths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

/// What a regenerate call did to its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No entries and no marker in the target, nothing touched
    Skipped,
    /// No entries, target reset to its baseline
    Refreshed,
    /// Entries merged into the target
    Updated {
        /// Lines written below the marker
        written: usize,
        /// Entries dropped as already present
        duplicates: usize,
    },
}

/// Text of a regenerated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    pub text: String,
    pub written: usize,
    pub duplicates: usize,
}

/// Build the regenerated file from baseline text and new entries
pub fn render_merged(
    descriptor: &KindDescriptor,
    baseline: &str,
    entries: &[String],
) -> MergedDocument {
    let is_end_line = descriptor.sentinel.end_matcher();

    let mut out: Vec<&str> = Vec::new();
    let mut present: HashSet<&str> = HashSet::new();
    let mut tail: Vec<&str> = Vec::new();
    let mut in_old_block = false;

    let mut lines = baseline.lines();
    while let Some(line) = lines.next() {
        if line.contains(descriptor.marker) {
            in_old_block = true;
            continue;
        }

        if is_end_line.is_some_and(|is_end| is_end(line)) {
            if let SentinelPolicy::Trailing { .. } = descriptor.sentinel {
                tail.push(line);
                tail.extend(lines.by_ref());
                // Lines kept after the end line still count as baseline
                present.extend(tail.iter().copied().filter(|l| !is_comment_or_blank(l)));
            }
            break;
        }

        if is_comment_or_blank(line) {
            out.push(line);
            continue;
        }

        if in_old_block {
            continue;
        }

        out.push(line);
        present.insert(line);
    }

    out.push(descriptor.marker);

    let mut written_set: HashSet<&str> = HashSet::new();
    let mut duplicates = 0;
    for entry in entries {
        let entry = entry.as_str();
        if present.contains(entry) || !written_set.insert(entry) {
            duplicates += 1;
            continue;
        }
        out.push(entry);
    }
    let written = written_set.len();

    match (tail.is_empty(), descriptor.sentinel) {
        (false, _) => out.extend(tail),
        (true, SentinelPolicy::Trailing { canonical, .. })
        | (true, SentinelPolicy::Truncate { canonical, .. }) => out.push(canonical),
        (true, SentinelPolicy::None) => {}
    }

    MergedDocument {
        text: join_lines(&out),
        written,
        duplicates,
    }
}

/// Regenerate the target of `descriptor` with `entries`
///
/// An empty `entries` resets a previously merged target to its baseline and
/// leaves an untouched target alone.
pub fn regenerate(
    descriptor: &KindDescriptor,
    paths: &GamePaths,
    entries: &[String],
) -> Result<MergeOutcome> {
    let prefix = descriptor.log_prefix;
    let target = paths.game_path(descriptor.target);

    if entries.is_empty() && !file_contains(&target, descriptor.marker) {
        tracing::info!(kind = prefix, "no entries and no marker, skipping");
        return Ok(MergeOutcome::Skipped);
    }

    let base = baseline::resolve(descriptor.baseline, paths, &target);
    if !base.exists() {
        return Err(Error::MissingBaseline(base));
    }

    if entries.is_empty() {
        let bytes = fs::read(&base).map_err(|source| Error::FileRead {
            path: base.clone(),
            source,
        })?;
        write_atomic(&target, &bytes)?;
        tracing::info!(kind = prefix, "refreshed {}", target.display());
        return Ok(MergeOutcome::Refreshed);
    }

    let text = read_text(&base)?;
    let merged = render_merged(descriptor, &text, entries);
    write_atomic(&target, merged.text.as_bytes())?;

    tracing::info!(
        kind = prefix,
        "updated {} ({} entries, {} duplicates dropped)",
        target.display(),
        merged.written,
        merged.duplicates
    );
    Ok(MergeOutcome::Updated {
        written: merged.written,
        duplicates: merged.duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::with_suffix;
    use crate::kinds::DataKind;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn setup(kind: DataKind, content: &str) -> (TempDir, GamePaths, PathBuf) {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let target = paths.game_path(kind.descriptor().target);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, content).unwrap();
        (dir, paths, target)
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_render_dedups_against_baseline_and_itself() {
        let desc = DataKind::CheatStrings.descriptor();
        let baseline = "; vanilla\n1,FIRST\n\n2,SECOND\n";
        let entries = lines(&["92,NEW", "2,SECOND", "92,NEW", "93,OTHER"]);

        let merged = render_merged(desc, baseline, &entries);

        assert_eq!(
            merged.text,
            "; vanilla\n1,FIRST\n\n2,SECOND\n; comp.injector added cheatStrings\n92,NEW\n93,OTHER\n"
        );
        assert_eq!(merged.written, 2);
        assert_eq!(merged.duplicates, 2);
    }

    #[test]
    fn test_render_strips_previous_block_keeps_comments() {
        let desc = DataKind::MeleeConfig.descriptor();
        let baseline = "1 fist\n; comp.injector added gtasa_melee_config\n6 old\n; kept note\n7 stale\n";
        let entries = lines(&["8 sword"]);

        let merged = render_merged(desc, baseline, &entries);

        assert_eq!(
            merged.text,
            "1 fist\n; kept note\n; comp.injector added gtasa_melee_config\n8 sword\n"
        );
    }

    #[test]
    fn test_render_weapon_keeps_captured_end_line() {
        let desc = DataKind::WeaponConfig.descriptor();
        let baseline = "22 colt45 17 25 45 0 1 346 -1 35.0\nEND\n; after end\n";
        let entries = lines(&["60 custom 10 10 10 0 1 400 -1 40.0"]);

        let merged = render_merged(desc, baseline, &entries);

        assert_eq!(
            merged.text,
            "22 colt45 17 25 45 0 1 346 -1 35.0\n\
             ; comp.injector added weapons\n\
             60 custom 10 10 10 0 1 400 -1 40.0\n\
             END\n\
             ; after end\n"
        );
    }

    #[test]
    fn test_render_audio_appends_canonical_end() {
        let desc = DataKind::VehicleAudio.descriptor();
        let baseline = "landstal 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0\n";
        let entries = lines(&["newcar 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0"]);

        let merged = render_merged(desc, baseline, &entries);

        assert!(merged.text.ends_with("newcar 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0\n;the end\n"));
    }

    #[test]
    fn test_render_weapon_skips_entries_after_end_line() {
        let desc = DataKind::WeaponConfig.descriptor();
        let baseline = "22 colt45 17 25 45 0 1 346 -1 35.0\nEND\n61 x 1 1 1 0 1 1 -1 1.0\n";
        let entries = lines(&["61 x 1 1 1 0 1 1 -1 1.0"]);

        let merged = render_merged(desc, baseline, &entries);

        assert_eq!(merged.text.matches("61 x 1 1 1 0 1 1 -1 1.0").count(), 1);
        assert_eq!(merged.written, 0);
        assert_eq!(merged.duplicates, 1);
    }

    #[test]
    fn test_render_audio_cuts_at_end_line() {
        let desc = DataKind::VehicleAudio.descriptor();
        let baseline = "landstal 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0\n; the end\nleftover 0 1\n";
        let entries = lines(&["newcar 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0"]);

        let merged = render_merged(desc, baseline, &entries);

        assert_eq!(
            merged.text,
            "landstal 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0\n\
             ; comp.injector added vehicles\n\
             newcar 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0\n\
             ;the end\n"
        );
    }

    #[test]
    fn test_regenerate_is_idempotent() {
        let (_dir, paths, target) = setup(DataKind::CheatStrings, "1,FIRST\n");
        let desc = DataKind::CheatStrings.descriptor();
        let entries = lines(&["92,NEW", "93,OTHER"]);

        regenerate(desc, &paths, &entries).unwrap();
        let first = fs::read(&target).unwrap();
        regenerate(desc, &paths, &entries).unwrap();
        let second = fs::read(&target).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_regenerate_idempotent_without_snapshot() {
        // Reference strategy with no reference copy: the live file is the base
        let (_dir, paths, target) = setup(DataKind::TrainTypeCarriages, "0 a b\n");
        let desc = DataKind::TrainTypeCarriages.descriptor();
        let entries = lines(&["9 x y"]);

        regenerate(desc, &paths, &entries).unwrap();
        let first = read(&target);
        regenerate(desc, &paths, &entries).unwrap();

        assert_eq!(read(&target), first);
        assert_eq!(first.matches("9 x y").count(), 1);
    }

    #[test]
    fn test_empty_entries_restore_baseline() {
        let vanilla = "; header\r\n1,FIRST\r\n";
        let (_dir, paths, target) = setup(DataKind::CheatStrings, vanilla);
        let desc = DataKind::CheatStrings.descriptor();

        regenerate(desc, &paths, &lines(&["92,NEW"])).unwrap();
        assert_ne!(read(&target), vanilla);

        let outcome = regenerate(desc, &paths, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::Refreshed);
        assert_eq!(fs::read(&target).unwrap(), vanilla.as_bytes());
    }

    #[test]
    fn test_empty_entries_without_marker_is_noop() {
        let (_dir, paths, target) = setup(DataKind::CheatStrings, "1,FIRST\n");
        let desc = DataKind::CheatStrings.descriptor();
        let before = fs::metadata(&target).unwrap().modified().unwrap();

        let outcome = regenerate(desc, &paths, &[]).unwrap();

        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), before);
        assert!(!with_suffix(&target, ".back").exists());
    }

    #[test]
    fn test_missing_baseline() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let desc = DataKind::TracksConfig.descriptor();

        let result = regenerate(desc, &paths, &lines(&["tracks5.dat"]));
        assert!(matches!(result, Err(Error::MissingBaseline(_))));
    }

    #[test]
    fn test_failed_write_leaves_target_untouched() {
        let (_dir, paths, target) = setup(DataKind::CheatStrings, "1,FIRST\n");
        let desc = DataKind::CheatStrings.descriptor();
        fs::create_dir(with_suffix(&target, ".tmp")).unwrap();

        let result = regenerate(desc, &paths, &lines(&["92,NEW"]));

        assert!(result.is_err());
        assert_eq!(read(&target), "1,FIRST\n");
    }
}
