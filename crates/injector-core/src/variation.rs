//! Merge of `.mva` model variation fragments into their ini files
//!
//! Every `<name>.mva` below a mod folder contributes to `<name>.ini`, the
//! first ini of that name found in the mod tree. Fragments are applied in mod
//! priority order (`modloader.ini`, `[Profiles.Default.Priority]`):
//! - fragments of equal priority merge key by key, values joined with `", "`
//!   except for single-valued settings, where the last one wins
//! - each priority tier then replaces whole sections of the result so far

use crate::baseline::{reference_baseline, restore_from_reference};
use crate::error::Result;
use crate::files::{read_text, write_atomic};
use crate::ini::{is_comment_or_blank, read_ini, IniData};
use crate::paths::GamePaths;
use crate::scanner::walk_files;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

/// Log prefix of the variation pass
pub const LOG_PREFIX: &str = "MVA";

/// Extension of variation fragments
pub const VARIATION_EXTENSION: &str = "mva";

/// Mod loader configuration holding the priority table
pub const PRIORITY_FILE: &str = "modloader.ini";
pub const PRIORITY_SECTION: &str = "Profiles.Default.Priority";

/// Section that keeps its case and is written first
pub const SETTINGS_SECTION: &str = "Settings";

/// Variation files reset from the reference tree when nothing was merged
pub const RESTORE_NAMES: [&str; 4] = [
    "ModelVariations_Peds.ini",
    "ModelVariations_PedWeapons.ini",
    "ModelVariations_Vehicles.ini",
    "ModelVariations.ini",
];

/// Single-valued keys: merging replaces instead of appending
pub const FORCE_REPLACE_KEYS: &[&str] = &[
    "MergeInteriorsWithCitiesAndZones",
    "DontInheritBehaviour",
    "MergeZonesWithCities",
    "DisableOnMission",
    "UseParentVoice",
    "Voice",
    "MergeZonesWithGlobal",
    "ReplaceDriver",
    "ReplacePassengers",
    "UseOnlyGroups",
    "DriverGroup1",
    "DriverGroup2",
    "DriverGroup3",
    "DriverGroup4",
    "DriverGroup5",
    "DriverGroup6",
    "DriverGroup7",
    "DriverGroup8",
    "DriverGroup9",
    "PassengerGroup1",
    "PassengerGroup2",
    "PassengerGroup3",
    "PassengerGroup4",
    "PassengerGroup5",
    "PassengerGroup6",
    "PassengerGroup7",
    "PassengerGroup8",
    "PassengerGroup9",
    "TuningChance",
    "TuningFullBodykit",
    "TrailersHealth",
    "RecursiveVariations",
    "UseParentVoices",
    "EnableCloneRemover",
    "CloneRemoverDisableOnMission",
    "CloneRemoverIncludeVehicleOccupants",
    "CloneRemoverSpawnDelay",
    "ChangeCarGenerators",
    "ChangeScriptedCars",
    "DisablePayAndSpray",
    "EnableLights",
    "EnableSideMissions",
    "EnableSiren",
    "EnableSpecialFeatures",
    "EnablePeds",
    "EnableSpecialPeds",
    "EnableVehicles",
    "EnablePedWeapons",
    "LoadSettingsImmediately",
    "EnableStreamingFix",
    "DisableKey",
    "ReloadKey",
    "EnableLog",
    "LogJumps",
    "ForceEnable",
    "LoadStage",
    "TrackReferenceCounts",
];

/// A `.mva` fragment and the mod it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationSource {
    pub path: PathBuf,
    /// First folder below the mod root
    pub mod_name: String,
    pub priority: i64,
}

/// Result of a variation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariationReport {
    /// Fragments found
    pub sources: usize,
    /// Distinct target ini names
    pub targets: usize,
    /// Ini files rewritten
    pub updated: Vec<PathBuf>,
    /// Target names with no ini in the mod tree
    pub missing_targets: Vec<String>,
    /// Ini files that could not be rewritten (path, error message)
    pub errors: Vec<(PathBuf, String)>,
    /// Ini files restored from the reference tree
    pub restored: usize,
}

fn is_force_replace(key: &str) -> bool {
    FORCE_REPLACE_KEYS.contains(&key)
}

/// Keys written at the top of their section
fn is_visual_priority(key: &str) -> bool {
    is_force_replace(key) || key == "Global" || key.starts_with("Wanted")
}

/// Every `.mva` below a sub-folder of `mod_root`, in walk order
pub fn collect_variation_files(mod_root: &Path) -> Vec<VariationSource> {
    if !mod_root.exists() {
        return Vec::new();
    }

    walk_files(mod_root)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(VARIATION_EXTENSION))
        })
        .filter_map(|path| {
            let relative = path.strip_prefix(mod_root).ok()?;
            // Files directly in the mod root belong to no mod
            if relative.components().count() < 2 {
                return None;
            }
            let mod_name = match relative.components().next()? {
                Component::Normal(name) => name.to_string_lossy().into_owned(),
                _ => return None,
            };
            tracing::debug!(kind = LOG_PREFIX, "found {} in mod {}", path.display(), mod_name);
            Some(VariationSource {
                path,
                mod_name,
                priority: 0,
            })
        })
        .collect()
}

/// Mod priorities from the mod loader configuration; empty when absent
pub fn load_priorities(path: &Path) -> HashMap<String, i64> {
    let mut priorities = HashMap::new();
    if !path.exists() {
        tracing::info!(kind = LOG_PREFIX, "{} not found, default priorities assumed", PRIORITY_FILE);
        return priorities;
    }

    let data = match read_ini(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(kind = LOG_PREFIX, "failed to read priorities: {}", e);
            return priorities;
        }
    };

    let Some(section) = data.get(PRIORITY_SECTION) else {
        tracing::info!(kind = LOG_PREFIX, "{} section not found", PRIORITY_SECTION);
        return priorities;
    };

    for (mod_name, value) in section {
        match value.trim().parse::<i64>() {
            Ok(priority) => {
                priorities.insert(mod_name.clone(), priority);
            }
            Err(_) => tracing::warn!(kind = LOG_PREFIX, "invalid priority for mod {}: {}", mod_name, value),
        }
    }

    priorities
}

/// `<name>.mva` -> `<name>.ini`
pub fn target_name(source: &Path) -> Option<String> {
    let stem = source.file_stem()?;
    Some(format!("{}.ini", stem.to_string_lossy()))
}

fn normalize_section(name: &str) -> String {
    if name.eq_ignore_ascii_case(SETTINGS_SECTION) {
        name.to_string()
    } else {
        name.to_ascii_uppercase()
    }
}

/// Parse variation ini text
///
/// A header may name several sections separated by commas; the keys below
/// it go to each. Section names are upper-cased, except `Settings`.
pub fn parse_variation(text: &str) -> IniData {
    let mut data = IniData::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        if is_comment_or_blank(line) {
            continue;
        }
        let trimmed = line.trim();

        if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
            current = trimmed[1..trimmed.len() - 1]
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(normalize_section)
                .collect();
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim_end();
        if key.is_empty() || current.is_empty() {
            continue;
        }

        let value = value.trim_start();
        for section in &current {
            data.entry(section.clone())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
    }

    data
}

fn read_variation(path: &Path) -> IniData {
    match read_text(path) {
        Ok(text) => parse_variation(&text),
        Err(e) => {
            tracing::warn!(kind = LOG_PREFIX, "skipping unreadable file: {}", e);
            IniData::new()
        }
    }
}

/// Merge a same-priority fragment into the tier so far
pub fn merge_tier(target: &mut IniData, source: IniData) {
    for (section, keys) in source {
        let merged = target.entry(section).or_default();
        for (key, value) in keys {
            let force = is_force_replace(&key);
            let slot = merged.entry(key).or_default();
            if force {
                *slot = value;
                continue;
            }
            if !slot.is_empty() {
                slot.push_str(", ");
            }
            slot.push_str(&value);
        }
    }
}

/// Apply a finished tier: its sections replace whole sections of `target`
pub fn replace_sections(target: &mut IniData, tier: IniData) {
    for (section, keys) in tier {
        target.insert(section, keys);
    }
}

/// Serialize variation data
///
/// `Settings` comes first, other sections follow in name order separated by
/// blank lines. Inside a section, `Global`, `Wanted*` and single-valued keys
/// lead (`Global` first), the rest follow by name.
pub fn render_variation(data: &IniData) -> String {
    let mut out = String::new();
    let mut first_section = true;

    if let Some(settings) = data.get(SETTINGS_SECTION) {
        out.push_str("[Settings]\n");
        for (key, value) in settings {
            let _ = writeln!(out, "{}={}", key, value);
        }
        first_section = false;
    }

    for (section, keys) in data {
        if section == SETTINGS_SECTION {
            continue;
        }
        if !first_section {
            out.push('\n');
        }
        let _ = writeln!(out, "[{}]", section);

        let (mut leading, rest): (Vec<_>, Vec<_>) =
            keys.iter().partition(|(key, _)| is_visual_priority(key));
        if let Some(global) = leading.iter().position(|(key, _)| key.as_str() == "Global") {
            let entry = leading.remove(global);
            leading.insert(0, entry);
        }

        for (key, value) in leading.into_iter().chain(rest) {
            let _ = writeln!(out, "{}={}", key, value);
        }
        first_section = false;
    }

    out
}

/// First `<name>` ini under the mod root, cached per name
fn find_original_ini(
    mod_root: &Path,
    name: &str,
    cache: &mut HashMap<String, Option<PathBuf>>,
) -> Option<PathBuf> {
    if let Some(found) = cache.get(name) {
        return found.clone();
    }

    let found = walk_files(mod_root).find(|path| {
        path.file_name().is_some_and(|n| n == name)
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"))
    });
    cache.insert(name.to_string(), found.clone());
    found
}

fn restore(paths: &GamePaths, ini: &Path) -> bool {
    match restore_from_reference(paths, ini) {
        Ok(true) => {
            tracing::info!(kind = LOG_PREFIX, "restored {}", ini.display());
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::warn!(kind = LOG_PREFIX, "restore failed: {}", e);
            false
        }
    }
}

/// Merge sorted fragments on top of the baseline of `ini` and write it
///
/// Returns `Ok(false)` when there was nothing to write; the caller restores
/// the file in that case.
pub fn merge_into(paths: &GamePaths, ini: &Path, sources: &[VariationSource]) -> Result<bool> {
    let base = reference_baseline(paths, ini);
    if !base.exists() {
        tracing::warn!(kind = LOG_PREFIX, "base ini not found for {}", ini.display());
        return Ok(false);
    }

    let mut document = parse_variation(&read_text(&base)?);

    for tier in sources.chunk_by(|a, b| a.priority == b.priority) {
        tracing::debug!(kind = LOG_PREFIX, "merging priority {}", tier[0].priority);
        let mut merged = IniData::new();
        for source in tier {
            merge_tier(&mut merged, read_variation(&source.path));
        }
        replace_sections(&mut document, merged);
    }

    if document.is_empty() {
        tracing::info!(kind = LOG_PREFIX, "merged content empty for {}", ini.display());
        return Ok(false);
    }

    let text = render_variation(&document);
    if text.is_empty() {
        return Ok(false);
    }

    write_atomic(ini, text.as_bytes())?;
    Ok(true)
}

fn restore_known(paths: &GamePaths, cache: &mut HashMap<String, Option<PathBuf>>) -> usize {
    RESTORE_NAMES
        .iter()
        .filter_map(|name| find_original_ini(&paths.modloader_root, name, cache))
        .filter(|ini| restore(paths, ini))
        .count()
}

/// Run the variation pass over the mod tree
pub fn process_variations(paths: &GamePaths) -> VariationReport {
    let mut report = VariationReport::default();
    let mod_root = &paths.modloader_root;
    if !mod_root.exists() {
        tracing::info!(kind = LOG_PREFIX, "mod root not found, skipping");
        return report;
    }

    let mut cache: HashMap<String, Option<PathBuf>> = HashMap::new();
    let mut sources = collect_variation_files(mod_root);
    report.sources = sources.len();

    if sources.is_empty() {
        tracing::info!(kind = LOG_PREFIX, "no .mva files found");
        report.restored = restore_known(paths, &mut cache);
        return report;
    }
    tracing::info!(kind = LOG_PREFIX, "found {} .mva files", sources.len());

    let priorities = load_priorities(&mod_root.join(PRIORITY_FILE));
    tracing::info!(kind = LOG_PREFIX, "loaded {} mod priorities", priorities.len());

    let mut groups: Vec<(String, Vec<VariationSource>)> = Vec::new();
    for mut source in sources.drain(..) {
        if let Some(&priority) = priorities.get(&source.mod_name) {
            source.priority = priority;
        }
        let Some(target) = target_name(&source.path) else {
            continue;
        };
        match groups.iter_mut().find(|(name, _)| *name == target) {
            Some((_, group)) => group.push(source),
            None => groups.push((target, vec![source])),
        }
    }
    report.targets = groups.len();

    for (target, group) in &mut groups {
        group.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.path.cmp(&b.path)));
        tracing::info!(kind = LOG_PREFIX, "processing {} with {} fragments", target, group.len());

        let Some(ini) = find_original_ini(mod_root, target, &mut cache) else {
            tracing::warn!(kind = LOG_PREFIX, "original ini not found for {}", target);
            report.missing_targets.push(target.clone());
            continue;
        };

        match merge_into(paths, &ini, group) {
            Ok(true) => {
                tracing::info!(kind = LOG_PREFIX, "updated {}", ini.display());
                report.updated.push(ini);
            }
            Ok(false) => {
                if restore(paths, &ini) {
                    report.restored += 1;
                }
            }
            Err(e) => {
                tracing::warn!(kind = LOG_PREFIX, "failed to update {}: {}", ini.display(), e);
                report.errors.push((ini.clone(), e.to_string()));
                if restore(paths, &ini) {
                    report.restored += 1;
                }
            }
        }
    }

    if report.updated.is_empty() {
        tracing::info!(kind = LOG_PREFIX, "nothing merged, restoring known variation files");
        report.restored += restore_known(paths, &mut cache);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::with_suffix;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_aliases_and_case() {
        let data = parse_variation(
            "; comment\n[Settings]\nEnableLog=1\n[landstal, Infernus]\nVariations = a,b\nVariations=c\n[ ]\nOrphan=1\n",
        );

        assert_eq!(data["Settings"]["EnableLog"], "1");
        assert_eq!(data["LANDSTAL"]["Variations"], "c");
        assert_eq!(data["INFERNUS"]["Variations"], "c");
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_merge_tier_joins_and_replaces() {
        let mut tier = IniData::new();
        merge_tier(&mut tier, parse_variation("[VEH]\nTuningChance=10\nCountryside=a\n"));
        merge_tier(&mut tier, parse_variation("[VEH]\nTuningChance=20\nCountryside=b\n"));

        assert_eq!(tier["VEH"]["TuningChance"], "20");
        assert_eq!(tier["VEH"]["Countryside"], "a, b");
    }

    #[test]
    fn test_replace_sections_is_whole_section() {
        let mut document = parse_variation("[VEH]\nX=1\n[PED]\nP=1\n");
        replace_sections(&mut document, parse_variation("[VEH]\nY=2\n"));

        assert_eq!(render_variation(&document), "[PED]\nP=1\n\n[VEH]\nY=2\n");
    }

    #[test]
    fn test_render_ordering() {
        let document = parse_variation(
            "[ZONE]\nAlpha=1\nWanted2=w\nGlobal=g\nVoice=v\n[Settings]\nB=2\nA=1\n",
        );

        assert_eq!(
            render_variation(&document),
            "[Settings]\nA=1\nB=2\n\n[ZONE]\nGlobal=g\nVoice=v\nWanted2=w\nAlpha=1\n"
        );
    }

    #[test]
    fn test_collect_skips_root_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "loose.mva", "[A]\nB=1\n");
        write(dir.path(), "ModA/sub/ModelVariations.MVA", "[A]\nB=1\n");

        let sources = collect_variation_files(dir.path());

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].mod_name, "ModA");
        assert_eq!(target_name(&sources[0].path).as_deref(), Some("ModelVariations.ini"));
    }

    #[test]
    fn test_load_priorities_skips_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            PRIORITY_FILE,
            "[Profiles.Default.Priority]\nModA=10\nModB=high\n",
        );

        let priorities = load_priorities(&path);

        assert_eq!(priorities.get("ModA"), Some(&10));
        assert!(!priorities.contains_key("ModB"));
    }

    #[test]
    fn test_process_higher_priority_replaces_section() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let ini = write(
            dir.path(),
            "modloader/Base/ModelVariations_Vehicles.ini",
            "[VEH]\nZ=0\n[OTHER]\nK=v\n",
        );
        write(
            dir.path(),
            "modloader/modloader.ini",
            "[Profiles.Default.Priority]\nA=1\nB=2\n",
        );
        write(dir.path(), "modloader/A/ModelVariations_Vehicles.mva", "[VEH]\nX=1\n");
        write(dir.path(), "modloader/B/ModelVariations_Vehicles.mva", "[veh]\nY=2\n");

        let report = process_variations(&paths);

        assert_eq!(report.sources, 2);
        assert_eq!(report.updated, vec![ini.clone()]);
        assert_eq!(fs::read_to_string(&ini).unwrap(), "[OTHER]\nK=v\n\n[VEH]\nY=2\n");
    }

    #[test]
    fn test_process_uses_reference_baseline() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let ini = write(
            dir.path(),
            "modloader/Base/ModelVariations.ini",
            "[Settings]\nEnableLog=1\n[OLD]\nX=merged\n",
        );
        write(dir.path(), "injector/ModelVariations.ini", "[Settings]\nEnableLog=0\n");
        write(dir.path(), "modloader/A/ModelVariations.mva", "[NEW]\nY=1\n");

        process_variations(&paths);

        assert_eq!(
            fs::read_to_string(&ini).unwrap(),
            "[Settings]\nEnableLog=0\n\n[NEW]\nY=1\n"
        );
    }

    #[test]
    fn test_process_without_fragments_restores_known_files() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let ini = write(dir.path(), "modloader/Base/ModelVariations_Peds.ini", "[P]\nX=merged\n");
        write(dir.path(), "injector/ModelVariations_Peds.ini", "[P]\nX=vanilla\n");

        let report = process_variations(&paths);

        assert_eq!(report.restored, 1);
        assert_eq!(fs::read_to_string(&ini).unwrap(), "[P]\nX=vanilla\n");
    }

    #[test]
    fn test_process_write_failure_restores_reference() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let ini = write(
            dir.path(),
            "modloader/Base/ModelVariations.ini",
            "[Settings]\nEnableLog=1\n[OLD]\nX=merged\n",
        );
        write(dir.path(), "injector/ModelVariations.ini", "[Settings]\nEnableLog=0\n");
        write(dir.path(), "modloader/A/ModelVariations.mva", "[NEW]\nY=1\n");
        fs::create_dir(with_suffix(&ini, ".tmp")).unwrap();

        let report = process_variations(&paths);

        assert!(report.updated.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, ini);
        assert!(report.restored >= 1);
        assert_eq!(fs::read_to_string(&ini).unwrap(), "[Settings]\nEnableLog=0\n");
    }

    #[test]
    fn test_merge_into_without_base_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let fragment = write(dir.path(), "modloader/A/Gone.mva", "[NEW]\nY=1\n");
        let ini = dir.path().join("modloader/Base/Gone.ini");
        let sources = vec![VariationSource {
            path: fragment,
            mod_name: "A".to_string(),
            priority: 0,
        }];

        assert!(!merge_into(&paths, &ini, &sources).unwrap());
        assert!(!ini.exists());
    }

    #[test]
    fn test_process_empty_merge_restores_reference() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        let ini = write(dir.path(), "modloader/Base/ModelVariations_Peds.ini", "[P]\nX=merged\n");
        write(dir.path(), "injector/ModelVariations_Peds.ini", "; vanilla\n");
        write(dir.path(), "modloader/A/ModelVariations_Peds.mva", "; nothing here\n[ ]\nK=1\n");

        let report = process_variations(&paths);

        assert!(report.updated.is_empty());
        assert!(report.errors.is_empty());
        assert!(report.restored >= 1);
        assert_eq!(fs::read_to_string(&ini).unwrap(), "; vanilla\n");
    }

    #[test]
    fn test_process_missing_target() {
        let dir = TempDir::new().unwrap();
        let paths = GamePaths::new(dir.path());
        write(dir.path(), "modloader/A/Unknown.mva", "[A]\nB=1\n");

        let report = process_variations(&paths);

        assert_eq!(report.missing_targets, vec!["Unknown.ini".to_string()]);
        assert!(report.updated.is_empty());
    }
}
