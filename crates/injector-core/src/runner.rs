//! One full pass: data kinds, then directives, then variations

use crate::error::{Error, Result};
use crate::files::{copy_file, with_suffix};
use crate::kinds::DataKind;
use crate::merger::regenerate;
use crate::patch::process_directives;
use crate::paths::GamePaths;
use crate::report::{KindOutcome, KindReport, RunReport};
use crate::scanner::{collect_fragments, FragmentPool};
use crate::settings::Settings;
use crate::variation::process_variations;
use std::path::PathBuf;

/// Suffix of the one-time copy of the untouched audio settings file
pub const VANILLA_AUDIO_SUFFIX: &str = ".comp.injector.bak";

/// Copy the audio settings file aside once, before anything merges into it
///
/// Returns the snapshot path when one was created by this call.
pub fn snapshot_vanilla_audio(paths: &GamePaths) -> Result<Option<PathBuf>> {
    let audio = paths.game_path(DataKind::VehicleAudio.descriptor().target);
    let snapshot = with_suffix(&audio, VANILLA_AUDIO_SUFFIX);
    if !audio.exists() || snapshot.exists() {
        return Ok(None);
    }

    copy_file(&audio, &snapshot)?;
    tracing::info!(kind = "AUDIO", "saved vanilla copy {}", snapshot.display());
    Ok(Some(snapshot))
}

/// Regenerate every kind from the pool; disabled kinds are only reported
pub fn merge_kinds(paths: &GamePaths, settings: &Settings, pool: &FragmentPool) -> Vec<KindReport> {
    DataKind::ALL
        .into_iter()
        .map(|kind| {
            let entries = pool.entries(kind);
            let outcome = if !settings.is_enabled(kind) {
                KindOutcome::Disabled
            } else {
                let descriptor = kind.descriptor();
                match regenerate(descriptor, paths, entries) {
                    Ok(outcome) => outcome.into(),
                    Err(Error::MissingBaseline(path)) => {
                        tracing::warn!(
                            kind = descriptor.log_prefix,
                            "base file not found at {}",
                            path.display()
                        );
                        KindOutcome::MissingBaseline
                    }
                    Err(e) => {
                        tracing::warn!(kind = descriptor.log_prefix, "merge failed: {}", e);
                        KindOutcome::Failed(e.to_string())
                    }
                }
            };

            KindReport {
                kind,
                entries: entries.len(),
                outcome,
            }
        })
        .collect()
}

/// Run every enabled engine over the game directory
pub fn run(paths: &GamePaths, settings: &Settings) -> RunReport {
    let mut report = RunReport::new(&paths.game_root);
    tracing::info!("starting pass over {}", paths.game_root.display());

    if settings.vanilla_audio_backup && settings.is_enabled(DataKind::VehicleAudio) {
        if let Err(e) = snapshot_vanilla_audio(paths) {
            tracing::warn!(kind = "AUDIO", "could not save vanilla copy: {}", e);
        }
    }

    let pool = collect_fragments(&paths.modloader_root, &settings.kinds);
    report.kinds = merge_kinds(paths, settings, &pool);

    if settings.inj_loader {
        report.directives = Some(process_directives(paths));
    }
    if settings.mva_loader {
        report.variations = Some(process_variations(paths));
    }

    report.finish();
    tracing::info!(
        "pass finished: {} files written, {} failures",
        report.files_written(),
        report.failures()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_run_merges_enabled_kinds() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let cheats = write(dir.path(), "data/cheatStrings.dat", "1,FIRST\n");
        write(dir.path(), "modloader/ModA/extra.comp.injector", "92,NEWCHEAT\n");

        let mut settings = Settings::default();
        settings.kinds.retain(|k| *k != DataKind::MeleeConfig);

        let report = run(&paths, &settings);

        assert_eq!(
            fs::read_to_string(&cheats).unwrap(),
            "1,FIRST\n; comp.injector added cheatStrings\n92,NEWCHEAT\n"
        );
        assert_eq!(
            report.kind(DataKind::CheatStrings).map(|k| &k.outcome),
            Some(&KindOutcome::Updated {
                written: 1,
                duplicates: 0
            })
        );
        assert_eq!(
            report.kind(DataKind::MeleeConfig).map(|k| &k.outcome),
            Some(&KindOutcome::Disabled)
        );
        assert_eq!(
            report.kind(DataKind::WeaponConfig).map(|k| &k.outcome),
            Some(&KindOutcome::Skipped)
        );
        assert!(report.directives.is_some());
        assert!(report.variations.is_some());
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_run_reports_missing_baseline() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        write(dir.path(), "modloader/ModA/tracks.comp.injector", "tracks5.dat\n");

        let report = run(&paths, &Settings::default());

        assert_eq!(
            report.kind(DataKind::TracksConfig).map(|k| &k.outcome),
            Some(&KindOutcome::MissingBaseline)
        );
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn test_run_skips_disabled_loaders() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let settings = Settings {
            inj_loader: false,
            mva_loader: false,
            ..Settings::default()
        };

        let report = run(&paths, &settings);

        assert!(report.directives.is_none());
        assert!(report.variations.is_none());
    }

    #[test]
    fn test_vanilla_audio_snapshot_once() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let audio = write(dir.path(), "data/gtasa_vehicleAudioSettings.cfg", "vanilla\n");

        let snapshot = snapshot_vanilla_audio(&paths).unwrap();
        assert_eq!(snapshot, Some(with_suffix(&audio, VANILLA_AUDIO_SUFFIX)));

        fs::write(&audio, "merged\n").unwrap();
        assert_eq!(snapshot_vanilla_audio(&paths).unwrap(), None);
        assert_eq!(
            fs::read_to_string(with_suffix(&audio, VANILLA_AUDIO_SUFFIX)).unwrap(),
            "vanilla\n"
        );
    }
}
