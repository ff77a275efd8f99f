//! Baseline resolution and restore
//!
//! Every merge starts from a pristine copy of its target, never from the
//! output of a previous run. Two places can hold that copy:
//! - a one-time `<target>.back` snapshot taken next to the target
//! - the reference tree under the plugin directory (see `GamePaths`)
//!
//! Each target declares which one it uses, so resolution is deterministic.

use crate::error::Result;
use crate::files::{copy_file, with_suffix};
use crate::paths::GamePaths;
use crate::scanner::walk_files;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix of the one-time snapshot used by the backup strategy
pub const BACKUP_SUFFIX: &str = ".back";

/// Where a target's pristine copy comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStrategy {
    /// `<target>.back`, created from the live file on first run
    Backup,
    /// Mirror path in the reference tree
    Reference,
}

/// Resolve the baseline for `target` with the given strategy
///
/// The returned path may not exist; callers check and treat that as missing
/// input.
pub fn resolve(strategy: BaselineStrategy, paths: &GamePaths, target: &Path) -> PathBuf {
    match strategy {
        BaselineStrategy::Backup => backup_baseline(target),
        BaselineStrategy::Reference => reference_baseline(paths, target),
    }
}

/// Snapshot `target` to `<target>.back` once, then prefer the snapshot
pub fn backup_baseline(target: &Path) -> PathBuf {
    let backup = with_suffix(target, BACKUP_SUFFIX);

    if target.exists() && !backup.exists() {
        match copy_file(target, &backup) {
            Ok(()) => tracing::debug!("created baseline snapshot {}", backup.display()),
            Err(e) => tracing::debug!("could not snapshot baseline: {}", e),
        }
    }

    if backup.exists() {
        backup
    } else {
        target.to_path_buf()
    }
}

/// Prefer the reference-tree copy of `target`, fall back to the live file
pub fn reference_baseline(paths: &GamePaths, target: &Path) -> PathBuf {
    let reference = paths.reference_path_for(target);
    if reference.exists() {
        reference
    } else {
        target.to_path_buf()
    }
}

/// Copy the reference copy of `live` over it
///
/// Returns `Ok(false)` when there is no reference copy to restore from.
pub fn restore_from_reference(paths: &GamePaths, live: &Path) -> Result<bool> {
    let reference = paths.reference_path_for(live);
    if !reference.exists() {
        return Ok(false);
    }

    copy_file(&reference, live)?;
    Ok(true)
}

/// Restore every `.ini` below `root` from the reference tree (best-effort)
///
/// Returns the number of files restored.
pub fn restore_tree(paths: &GamePaths, root: &Path, log_prefix: &str) -> usize {
    if !root.exists() {
        return 0;
    }

    let mut restored = 0;
    for path in walk_files(root) {
        let is_ini = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
        if !is_ini {
            continue;
        }

        match restore_from_reference(paths, &path) {
            Ok(true) => {
                tracing::info!(kind = log_prefix, "restored {}", path.display());
                restored += 1;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(kind = log_prefix, "restore failed: {}", e),
        }
    }
    restored
}
