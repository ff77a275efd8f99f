//! INI line grammar shared by the directive engine, the variation engine and
//! the settings reader

use crate::error::Result;
use crate::files::read_text;
use std::collections::BTreeMap;
use std::path::Path;

/// Keys of one section, ordered by name
pub type IniSection = BTreeMap<String, String>;

/// Sections of a document, ordered by name
pub type IniData = BTreeMap<String, IniSection>;

/// True for blank lines and lines whose first non-whitespace is `;`, `#` or `//`
pub fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty()
        || trimmed.starts_with(';')
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
}

/// Section name of a `[Section]` line, trimmed. Empty names are rejected.
pub fn parse_section_header(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.len() < 3 || !trimmed.starts_with('[') || !trimmed.ends_with(']') {
        return None;
    }

    let name = trimmed[1..trimmed.len() - 1].trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Split `key = value` at the first `=`; key trimmed, value left-trimmed
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim_start()))
}

/// Parse a plain INI document. Names keep their case; values are trimmed;
/// keys outside any section are ignored.
pub fn parse_ini(text: &str) -> IniData {
    let mut data = IniData::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if is_comment_or_blank(line) {
            continue;
        }

        if let Some(name) = parse_section_header(line) {
            data.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        let (Some(section), Some((key, value))) = (&current, split_key_value(line)) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        data.entry(section.clone())
            .or_default()
            .insert(key.to_string(), value.trim_end().to_string());
    }

    data
}

/// Read and parse an INI file
pub fn read_ini(path: &Path) -> Result<IniData> {
    Ok(parse_ini(&read_text(path)?))
}
