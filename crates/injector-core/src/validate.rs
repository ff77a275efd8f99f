//! Line grammars deciding whether a fragment line may be merged
//!
//! Each validator is a plain `fn(&str) -> bool`. A rejected line is simply
//! not merged; nothing here reports errors.

/// Column type in a fixed-layout record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Int,
    Float,
    Word,
}

impl Field {
    fn accepts(self, token: &str) -> bool {
        match self {
            Field::Int => token.parse::<i64>().is_ok(),
            Field::Float => token.parse::<f32>().is_ok(),
            Field::Word => !token.is_empty(),
        }
    }
}

use Field::{Float, Int, Word};

/// name, VehAudType, PlayerBank, DummyBank, BassSetting, BassFactor,
/// EnginePitch, HornType, HornPitch, DoorType, EngineUpgrade, RadioStation,
/// RadioType, VehicleAudioTypeForName, EngineVolumeOffset
const AUDIO_FIELDS: &[Field] = &[
    Word, Int, Int, Int, Int, Float, Float, Int, Float, Int, Int, Int, Int, Int, Float,
];

/// index, name, ammo clip, damage, accuracy, flags, anim group, model 1,
/// model 2, range
const WEAPON_FIELDS: &[Field] = &[Int, Word, Int, Int, Int, Int, Int, Int, Int, Float];

/// Melee indices up to this value belong to the base game
const MELEE_RESERVED_MAX: i64 = 4;

/// Cheat indices up to this value belong to the base game
const CHEAT_RESERVED_MAX: i64 = 91;

const MAX_TRAIN_CARRIAGES: usize = 12;

/// Leading tokens must match `fields`; extra trailing tokens are allowed
fn matches_fields(line: &str, fields: &[Field]) -> bool {
    let mut tokens = line.split_whitespace();
    fields
        .iter()
        .all(|field| tokens.next().is_some_and(|token| field.accepts(token)))
}

/// `gtasa_vehicleAudioSettings.cfg` row
pub fn vehicle_audio(line: &str) -> bool {
    matches_fields(line, AUDIO_FIELDS)
}

/// `gtasa_weapon_config.dat` row
pub fn weapon_config(line: &str) -> bool {
    matches_fields(line, WEAPON_FIELDS)
}

/// `gtasa_melee_config.dat` row: `index name ...` with a non-reserved index
pub fn melee_config(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    let index = tokens.next().and_then(|t| t.parse::<i64>().ok());
    let has_name = tokens.next().is_some();

    matches!(index, Some(index) if index > MELEE_RESERVED_MAX) && has_name
}

/// `model_special_features.dat` row: two words
pub fn model_special_features(line: &str) -> bool {
    matches_fields(line, &[Word, Word])
}

/// `gtasa_radarBlipSpriteFilenames.dat` row: `index name texture`, where the
/// name is `NULL` or a radar/arrow sprite
pub fn radar_blip_sprite(line: &str) -> bool {
    if !matches_fields(line, &[Int, Word, Word]) {
        return false;
    }

    let name = line.split_whitespace().nth(1).unwrap_or_default();
    name == "NULL" || name.starts_with("radar") || name.starts_with("arrow")
}

/// `gtasa_trainTypeCarriages.dat` row: train type then 1 to 12 carriages
pub fn train_type_carriages(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    if !tokens.next().is_some_and(|t| Int.accepts(t)) {
        return false;
    }

    let carriages = tokens.count();
    (1..=MAX_TRAIN_CARRIAGES).contains(&carriages)
}

/// `gtasa_tracks_config.dat` row: a single `*.dat` file name
pub fn tracks_config(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    let (Some(file_name), None) = (tokens.next(), tokens.next()) else {
        return false;
    };

    file_name.len() >= 5 && file_name.ends_with(".dat")
}

/// `cheatStrings.dat` row: `index,text`, index above the reserved range and
/// some text left once a trailing `#` comment is removed
pub fn cheat_string(line: &str) -> bool {
    let Some((index, rest)) = line.split_once(',') else {
        return false;
    };

    let Ok(index) = index.trim().parse::<i64>() else {
        return false;
    };
    if index <= CHEAT_RESERVED_MAX {
        return false;
    }

    let text = rest.split('#').next().unwrap_or_default();
    !text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_audio() {
        let line = "landstal 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0";
        assert!(vehicle_audio(line));
        assert!(vehicle_audio(&format!("{} ; trailing", line)));
        assert!(!vehicle_audio("landstal 0 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3"));
        assert!(!vehicle_audio("landstal x 10 11 1 1.0 1.0 0 0.7 1 0 -1 0 3 0.0"));
    }

    #[test]
    fn test_weapon_config() {
        assert!(weapon_config("22 colt45 17 25 45 0 1 346 -1 35.0"));
        assert!(!weapon_config("22 colt45 17 25 45 0 1 346 -1"));
        assert!(!weapon_config("colt45 22 17 25 45 0 1 346 -1 35.0"));
    }

    #[test]
    fn test_melee_reserved_boundary() {
        assert!(!melee_config("4 knife"));
        assert!(melee_config("5 knife"));
        assert!(!melee_config("5"));
        assert!(!melee_config("knife 5"));
    }

    #[test]
    fn test_model_special_features() {
        assert!(model_special_features("copcarla siren"));
        assert!(!model_special_features("copcarla"));
    }

    #[test]
    fn test_radar_blip_sprite() {
        assert!(radar_blip_sprite("64 radar_newicon newicon"));
        assert!(radar_blip_sprite("65 arrow_up arrow"));
        assert!(radar_blip_sprite("66 NULL none"));
        assert!(!radar_blip_sprite("67 hud_icon icon"));
        assert!(!radar_blip_sprite("68 radar_only"));
        assert!(!radar_blip_sprite("x radar_bad bad"));
    }

    #[test]
    fn test_train_carriage_limits() {
        assert!(train_type_carriages("0 c1"));
        assert!(train_type_carriages(
            "0 c1 c2 c3 c4 c5 c6 c7 c8 c9 c10 c11 c12"
        ));
        assert!(!train_type_carriages(
            "0 c1 c2 c3 c4 c5 c6 c7 c8 c9 c10 c11 c12 c13"
        ));
        assert!(!train_type_carriages("0"));
        assert!(!train_type_carriages("freight c1"));
    }

    #[test]
    fn test_tracks_config() {
        assert!(tracks_config("tracks5.dat"));
        assert!(tracks_config("  tracks5.dat  "));
        assert!(!tracks_config("tracks5.dat extra"));
        assert!(!tracks_config("tracks5.txt"));
        assert!(!tracks_config(".dat"));
    }

    #[test]
    fn test_cheat_string_boundaries() {
        assert!(!cheat_string("91,FOO"));
        assert!(cheat_string("92,FOO"));
        assert!(!cheat_string("92,  "));
        assert!(!cheat_string("92, # only a comment"));
        assert!(cheat_string(" 120 ,SOMECHEAT # note"));
        assert!(!cheat_string("abc,FOO"));
        assert!(!cheat_string("92 FOO"));
    }
}
