//! Parser for `.inj` INI directive files
//!
//! A directive names an ini file, a section and one `key=value` pair, plus
//! whether the value replaces the existing one or is merged into it:
//!
//! ```text
//! Merge
//! ModelVariations.ini
//! [Settings]
//! Flags = night
//!
//! Replace {
//!     vehicles.ini
//!     [LANDSTAL]
//!     Handling=sporty
//!     [INFERNUS]
//!     Handling=race
//! }
//!
//! ; legacy form, an implicit Replace block
//! peds.ini
//! [MALE01]
//! Voice=gang
//! ```

use crate::error::Result;
use crate::files::read_text;
use crate::ini::{is_comment_or_blank, parse_section_header, split_key_value};
use crate::scanner::walk_files;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of directive files
pub const DIRECTIVE_EXTENSION: &str = "inj";

/// How a directive's value combines with the existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Replace,
    Merge,
}

/// One key assignment parsed from a directive file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub modifier: Modifier,
    /// Ini file as written in the fragment (name, relative or absolute path)
    pub ini_file: String,
    pub section: String,
    pub key: String,
    pub value: String,
    /// Directive file this came from
    pub source: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Modifier,
    IniFile,
    Section,
    KeyValue,
}

/// `Replace`, `Merge`, optionally followed by `{`
fn parse_modifier_line(trimmed: &str) -> Option<(Modifier, bool)> {
    let (word, opens_block) = match trimmed.strip_suffix('{') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };

    if word.eq_ignore_ascii_case("Replace") {
        Some((Modifier::Replace, opens_block))
    } else if word.eq_ignore_ascii_case("Merge") {
        Some((Modifier::Merge, opens_block))
    } else {
        None
    }
}

/// Parse directive text; `source` is recorded on every directive
pub fn parse_directives(text: &str, source: &Path) -> Vec<Directive> {
    let mut directives = Vec::new();

    let mut state = State::Modifier;
    let mut modifier = Modifier::Replace;
    let mut in_block = false;
    let mut implicit_block = false;
    let mut ini_file = String::new();
    let mut section = String::new();

    for line in text.lines() {
        if is_comment_or_blank(line) {
            continue;
        }
        let trimmed = line.trim();

        // A keyword ends a legacy block and starts a fresh directive
        if implicit_block {
            if let Some((next, opens_block)) = parse_modifier_line(trimmed) {
                modifier = next;
                in_block = opens_block;
                implicit_block = false;
                state = State::IniFile;
                continue;
            }
        }

        if in_block && trimmed == "}" {
            in_block = false;
            implicit_block = false;
            state = State::Modifier;
            continue;
        }

        match state {
            State::Modifier => {
                if let Some((next, opens_block)) = parse_modifier_line(trimmed) {
                    modifier = next;
                    in_block = opens_block;
                    implicit_block = false;
                    state = State::IniFile;
                } else {
                    modifier = Modifier::Replace;
                    in_block = true;
                    implicit_block = true;
                    ini_file = trimmed.to_string();
                    state = State::Section;
                }
            }
            State::IniFile => {
                ini_file = trimmed.to_string();
                state = State::Section;
            }
            State::Section => {
                if let Some(name) = parse_section_header(trimmed) {
                    section = name.to_string();
                    state = State::KeyValue;
                } else if in_block {
                    ini_file = trimmed.to_string();
                    section.clear();
                }
            }
            State::KeyValue => {
                if let Some(name) = parse_section_header(trimmed) {
                    section = name.to_string();
                    continue;
                }

                let Some((key, value)) = split_key_value(line) else {
                    if in_block {
                        ini_file = trimmed.to_string();
                        section.clear();
                        state = State::Section;
                    } else {
                        state = State::Modifier;
                    }
                    continue;
                };

                if !ini_file.is_empty() && !section.is_empty() && !key.is_empty() {
                    directives.push(Directive {
                        modifier,
                        ini_file: ini_file.clone(),
                        section: section.clone(),
                        key: key.to_string(),
                        value: value.to_string(),
                        source: source.to_path_buf(),
                    });
                }

                if !in_block {
                    ini_file.clear();
                    section.clear();
                    state = State::Modifier;
                }
            }
        }
    }

    directives
}

/// Read and parse one directive file
pub fn parse_directive_file(path: &Path) -> Result<Vec<Directive>> {
    Ok(parse_directives(&read_text(path)?, path))
}

/// Every `.inj` file below `dir`, in walk order
pub fn collect_directive_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    walk_files(dir)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DIRECTIVE_EXTENSION))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<Directive> {
        parse_directives(text, Path::new("mods/test.inj"))
    }

    fn summary(d: &Directive) -> (Modifier, &str, &str, &str, &str) {
        (
            d.modifier,
            d.ini_file.as_str(),
            d.section.as_str(),
            d.key.as_str(),
            d.value.as_str(),
        )
    }

    #[test]
    fn test_single_directive() {
        let directives = parse("Merge\nModelVariations.ini\n[Settings]\nFlags =  night\n");

        assert_eq!(directives.len(), 1);
        assert_eq!(
            summary(&directives[0]),
            (Modifier::Merge, "ModelVariations.ini", "Settings", "Flags", "night")
        );
        assert_eq!(directives[0].source, PathBuf::from("mods/test.inj"));
    }

    #[test]
    fn test_single_directive_resets_after_one_key() {
        let directives = parse("Replace\na.ini\n[S]\nK=1\nL=2\n");

        // `L=2` arrives in Modifier state and opens a legacy block named `L=2`
        assert_eq!(directives.len(), 1);
        assert_eq!(summary(&directives[0]), (Modifier::Replace, "a.ini", "S", "K", "1"));
    }

    #[test]
    fn test_block_with_section_switch() {
        let text = "replace {\n  vehicles.ini\n  [LANDSTAL]\n  Handling=sporty\n  Color=red\n  [INFERNUS]\n  Handling=race\n}\n";
        let directives = parse(text);

        let summaries: Vec<_> = directives.iter().map(summary).collect();
        assert_eq!(
            summaries,
            vec![
                (Modifier::Replace, "vehicles.ini", "LANDSTAL", "Handling", "sporty"),
                (Modifier::Replace, "vehicles.ini", "LANDSTAL", "Color", "red"),
                (Modifier::Replace, "vehicles.ini", "INFERNUS", "Handling", "race"),
            ]
        );
    }

    #[test]
    fn test_block_switches_ini_file() {
        let text = "Merge {\na.ini\n[S]\nK=1\nb.ini\n[T]\nK=2\n}\n";
        let directives = parse(text);

        assert_eq!(directives.len(), 2);
        assert_eq!(summary(&directives[1]), (Modifier::Merge, "b.ini", "T", "K", "2"));
    }

    #[test]
    fn test_legacy_implicit_replace_block() {
        let text = "peds.ini\n[MALE01]\nVoice=gang\nWalk=cool\nMerge\nother.ini\n[X]\nY=z\n";
        let directives = parse(text);

        let summaries: Vec<_> = directives.iter().map(summary).collect();
        assert_eq!(
            summaries,
            vec![
                (Modifier::Replace, "peds.ini", "MALE01", "Voice", "gang"),
                (Modifier::Replace, "peds.ini", "MALE01", "Walk", "cool"),
                (Modifier::Merge, "other.ini", "X", "Y", "z"),
            ]
        );
    }

    #[test]
    fn test_comments_and_missing_section() {
        let text = "; header\n// also a comment\nReplace\na.ini\nK=1\n";
        // `K=1` is not a section header, and outside a block it is ignored
        assert!(parse(text).is_empty());
    }

    #[test]
    fn test_modifier_line() {
        assert_eq!(parse_modifier_line("Merge {"), Some((Modifier::Merge, true)));
        assert_eq!(parse_modifier_line("REPLACE"), Some((Modifier::Replace, false)));
        assert_eq!(parse_modifier_line("Merged"), None);
    }
}
