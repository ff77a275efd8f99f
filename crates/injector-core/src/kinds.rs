//! The line-oriented data files we merge, one descriptor per file
//!
//! Everything the merge engine needs to know about a data file lives in its
//! `KindDescriptor`: where the file is, which marker delimits our block, where
//! its baseline comes from, how it ends and which lines may be merged into it.

use crate::baseline::BaselineStrategy;
use crate::error::Error;
use crate::validate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A line-oriented game data file that accepts fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    VehicleAudio,
    WeaponConfig,
    MeleeConfig,
    CheatStrings,
    ModelSpecialFeatures,
    RadarBlipSprites,
    TracksConfig,
    TrainTypeCarriages,
}

/// How a data file ends
#[derive(Debug, Clone, Copy)]
pub enum SentinelPolicy {
    /// The file just ends after our block
    None,
    /// The file carries an end line that must stay after our block
    Trailing {
        /// Recognizes an existing end line in the baseline
        matches: fn(&str) -> bool,
        /// Written when the baseline had no end line
        canonical: &'static str,
    },
    /// The file is cut at its end line; the canonical one always closes it
    Truncate {
        matches: fn(&str) -> bool,
        canonical: &'static str,
    },
}

impl SentinelPolicy {
    /// Recognizer for the baseline's end line, if the kind has one
    pub fn end_matcher(&self) -> Option<fn(&str) -> bool> {
        match *self {
            SentinelPolicy::None => None,
            SentinelPolicy::Trailing { matches, .. } | SentinelPolicy::Truncate { matches, .. } => {
                Some(matches)
            }
        }
    }
}

/// Static description of one data kind
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: DataKind,
    /// Prefix used in log lines
    pub log_prefix: &'static str,
    /// Game-relative path of the target file
    pub target: &'static str,
    /// Comment line that opens the block of merged entries
    pub marker: &'static str,
    pub baseline: BaselineStrategy,
    pub sentinel: SentinelPolicy,
    pub validator: fn(&str) -> bool,
    /// Key under `[MAIN]` in the settings file that enables this kind
    pub setting_key: &'static str,
}

impl KindDescriptor {
    /// File name of the target, used to spot plain mirrors of it in mods
    pub fn target_file_name(&self) -> &'static str {
        self.target.rsplit('/').next().unwrap_or(self.target)
    }
}

const CANONICAL_END: &str = ";the end";

fn audio_end(line: &str) -> bool {
    line.contains("the end")
}

fn weapon_end(line: &str) -> bool {
    let lowered = line.trim().to_ascii_lowercase();
    matches!(lowered.as_str(), "end" | "the end" | ";the end")
}

static VEHICLE_AUDIO: KindDescriptor = KindDescriptor {
    kind: DataKind::VehicleAudio,
    log_prefix: "AUDIO",
    target: "data/gtasa_vehicleAudioSettings.cfg",
    marker: "; comp.injector added vehicles",
    baseline: BaselineStrategy::Backup,
    sentinel: SentinelPolicy::Truncate {
        matches: audio_end,
        canonical: CANONICAL_END,
    },
    validator: validate::vehicle_audio,
    setting_key: "FLAAudioLoader",
};

static WEAPON_CONFIG: KindDescriptor = KindDescriptor {
    kind: DataKind::WeaponConfig,
    log_prefix: "WEAPON_CONFIG",
    target: "data/gtasa_weapon_config.dat",
    marker: "; comp.injector added weapons",
    baseline: BaselineStrategy::Backup,
    sentinel: SentinelPolicy::Trailing {
        matches: weapon_end,
        canonical: CANONICAL_END,
    },
    validator: validate::weapon_config,
    setting_key: "FLAWeaponConfigLoader",
};

static MELEE_CONFIG: KindDescriptor = KindDescriptor {
    kind: DataKind::MeleeConfig,
    log_prefix: "MELEE_CONFIG",
    target: "data/gtasa_melee_config.dat",
    marker: "; comp.injector added gtasa_melee_config",
    baseline: BaselineStrategy::Reference,
    sentinel: SentinelPolicy::None,
    validator: validate::melee_config,
    setting_key: "FLAMeleeConfigLoader",
};

static CHEAT_STRINGS: KindDescriptor = KindDescriptor {
    kind: DataKind::CheatStrings,
    log_prefix: "CHEAT_STRINGS",
    target: "data/cheatStrings.dat",
    marker: "; comp.injector added cheatStrings",
    baseline: BaselineStrategy::Backup,
    sentinel: SentinelPolicy::None,
    validator: validate::cheat_string,
    setting_key: "FLACheatStringsLoader",
};

static MODEL_SPECIAL_FEATURES: KindDescriptor = KindDescriptor {
    kind: DataKind::ModelSpecialFeatures,
    log_prefix: "MODEL_SPECIAL_FEATURES",
    target: "data/model_special_features.dat",
    marker: "; comp.injector added model_special_features",
    baseline: BaselineStrategy::Reference,
    sentinel: SentinelPolicy::None,
    validator: validate::model_special_features,
    setting_key: "FLAModelSpecialFeaturesLoader",
};

static RADAR_BLIP_SPRITES: KindDescriptor = KindDescriptor {
    kind: DataKind::RadarBlipSprites,
    log_prefix: "RADAR_BLIP_SPRITE_FILENAMES",
    target: "data/gtasa_radarBlipSpriteFilenames.dat",
    marker: "; comp.injector added gtasa_radarBlipSpriteFilenames",
    baseline: BaselineStrategy::Backup,
    sentinel: SentinelPolicy::None,
    validator: validate::radar_blip_sprite,
    setting_key: "FLARadarBlipSpriteFilenamesLoader",
};

static TRACKS_CONFIG: KindDescriptor = KindDescriptor {
    kind: DataKind::TracksConfig,
    log_prefix: "TRACKS_CONFIG",
    target: "data/Paths/gtasa_tracks_config.dat",
    marker: "; comp.injector added gtasa_tracks_config",
    baseline: BaselineStrategy::Backup,
    sentinel: SentinelPolicy::None,
    validator: validate::tracks_config,
    setting_key: "FLATracksConfigLoader",
};

static TRAIN_TYPE_CARRIAGES: KindDescriptor = KindDescriptor {
    kind: DataKind::TrainTypeCarriages,
    log_prefix: "TRAIN_TYPE_CARRIAGES",
    target: "data/gtasa_trainTypeCarriages.dat",
    marker: "; comp.injector added gtasa_trainTypeCarriages",
    baseline: BaselineStrategy::Reference,
    sentinel: SentinelPolicy::None,
    validator: validate::train_type_carriages,
    setting_key: "FLATrainTypeCarriagesLoader",
};

impl DataKind {
    /// Every kind, in processing order
    pub const ALL: [DataKind; 8] = [
        DataKind::VehicleAudio,
        DataKind::WeaponConfig,
        DataKind::MeleeConfig,
        DataKind::CheatStrings,
        DataKind::ModelSpecialFeatures,
        DataKind::RadarBlipSprites,
        DataKind::TracksConfig,
        DataKind::TrainTypeCarriages,
    ];

    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            DataKind::VehicleAudio => &VEHICLE_AUDIO,
            DataKind::WeaponConfig => &WEAPON_CONFIG,
            DataKind::MeleeConfig => &MELEE_CONFIG,
            DataKind::CheatStrings => &CHEAT_STRINGS,
            DataKind::ModelSpecialFeatures => &MODEL_SPECIAL_FEATURES,
            DataKind::RadarBlipSprites => &RADAR_BLIP_SPRITES,
            DataKind::TracksConfig => &TRACKS_CONFIG,
            DataKind::TrainTypeCarriages => &TRAIN_TYPE_CARRIAGES,
        }
    }

    /// Name used on the command line and in reports
    pub fn name(self) -> &'static str {
        match self {
            DataKind::VehicleAudio => "vehicle_audio",
            DataKind::WeaponConfig => "weapon_config",
            DataKind::MeleeConfig => "melee_config",
            DataKind::CheatStrings => "cheat_strings",
            DataKind::ModelSpecialFeatures => "model_special_features",
            DataKind::RadarBlipSprites => "radar_blip_sprites",
            DataKind::TracksConfig => "tracks_config",
            DataKind::TrainTypeCarriages => "train_type_carriages",
        }
    }

    pub fn validate(self, line: &str) -> bool {
        (self.descriptor().validator)(line)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidKind(s.to_string()))
    }
}
