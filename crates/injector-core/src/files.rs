//! File helpers shared by every engine
//!
//! Reads go through `read_text` so that an unreadable file always surfaces as
//! `Error::FileRead` with its path. Writes go through `write_atomic`: the new
//! content lands in `<target>.tmp` first and is renamed over the target only
//! once it is fully on disk.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Append a raw suffix to the full file name (`a.dat` + `.back` -> `a.dat.back`)
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a whole text file. Invalid UTF-8 is replaced rather than rejected,
/// game data files are plain ASCII in practice.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read a text file as lines, without line terminators
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(read_text(path)?.lines().map(str::to_string).collect())
}

/// Check whether any line of the file contains `needle`. Unreadable files
/// count as not containing it.
pub fn file_contains(path: &Path, needle: &str) -> bool {
    match read_text(path) {
        Ok(text) => text.lines().any(|line| line.contains(needle)),
        Err(_) => false,
    }
}

/// Replace `target` with `contents` via a sibling temp file and a rename.
///
/// On failure the temp file is removed and `target` is left as it was.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let temp = with_suffix(target, ".tmp");

    if let Err(source) = fs::write(&temp, contents) {
        let _ = fs::remove_file(&temp);
        return Err(Error::FileWrite { path: temp, source });
    }

    if let Err(source) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(Error::Rename {
            from: temp,
            to: target.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Copy `from` over `to`, creating parent directories of `to` as needed
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let copy_err = |source| Error::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(copy_err)?;
        }
    }
    fs::copy(from, to).map_err(copy_err)?;
    Ok(())
}

/// Join lines with `\n`, terminating every line
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
