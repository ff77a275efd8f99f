//! Loader switches read from `comp.injector.ini`
//!
//! ```ini
//! [MAIN]
//! FLAAudioLoader=1
//! FLAMeleeConfigLoader=0
//! InjConfigLoader=1
//! MvaLoader=1
//! ```
//!
//! Every switch defaults to enabled; a missing settings file means defaults.

use crate::error::Result;
use crate::ini::{read_ini, IniData};
use crate::kinds::DataKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAIN_SECTION: &str = "MAIN";
pub const INJ_LOADER_KEY: &str = "InjConfigLoader";
pub const MVA_LOADER_KEY: &str = "MvaLoader";
pub const VANILLA_AUDIO_BACKUP_KEY: &str = "VanillaAudioBackup";

/// Raw `(section, key, default)` reader over a parsed settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsReader {
    data: IniData,
}

impl SettingsReader {
    pub fn new(data: IniData) -> Self {
        Self { data }
    }

    /// Integer value of `key`, or `default` when missing or not a number
    pub fn read_integer(&self, section: &str, key: &str, default: i64) -> i64 {
        self.data
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Switch in the `1` = on convention
    pub fn read_switch(&self, section: &str, key: &str) -> bool {
        self.read_integer(section, key, 1) == 1
    }
}

/// Which loaders run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Line-oriented kinds to merge, in processing order
    pub kinds: Vec<DataKind>,
    /// Apply `.inj` directives
    pub inj_loader: bool,
    /// Merge `.mva` variation files
    pub mva_loader: bool,
    /// Keep a one-time copy of the vanilla audio settings file
    pub vanilla_audio_backup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_reader(&SettingsReader::default())
    }
}

impl Settings {
    /// Load from a settings file; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        Ok(Self::from_reader(&SettingsReader::new(read_ini(path)?)))
    }

    pub fn from_reader(reader: &SettingsReader) -> Self {
        let kinds = DataKind::ALL
            .into_iter()
            .filter(|kind| reader.read_switch(MAIN_SECTION, kind.descriptor().setting_key))
            .collect();

        Self {
            kinds,
            inj_loader: reader.read_switch(MAIN_SECTION, INJ_LOADER_KEY),
            mva_loader: reader.read_switch(MAIN_SECTION, MVA_LOADER_KEY),
            vanilla_audio_backup: reader.read_switch(MAIN_SECTION, VANILLA_AUDIO_BACKUP_KEY),
        }
    }

    pub fn is_enabled(&self, kind: DataKind) -> bool {
        self.kinds.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini::parse_ini;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_enable_everything() {
        let settings = Settings::default();
        assert_eq!(settings.kinds, DataKind::ALL.to_vec());
        assert!(settings.inj_loader);
        assert!(settings.mva_loader);
        assert!(settings.vanilla_audio_backup);
    }

    #[test]
    fn test_read_integer_fallbacks() {
        let reader = SettingsReader::new(parse_ini("[MAIN]\nA=7\nB=oops\n"));
        assert_eq!(reader.read_integer("MAIN", "A", 1), 7);
        assert_eq!(reader.read_integer("MAIN", "B", 1), 1);
        assert_eq!(reader.read_integer("MAIN", "C", 3), 3);
        assert_eq!(reader.read_integer("OTHER", "A", 0), 0);
    }

    #[test]
    fn test_switches_disable_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comp.injector.ini");
        fs::write(
            &path,
            "[MAIN]\nFLAAudioLoader=0\nFLAMeleeConfigLoader = 0\nMvaLoader=0\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert!(!settings.is_enabled(DataKind::VehicleAudio));
        assert!(!settings.is_enabled(DataKind::MeleeConfig));
        assert!(settings.is_enabled(DataKind::WeaponConfig));
        assert!(settings.inj_loader);
        assert!(!settings.mva_loader);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("absent.ini")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
