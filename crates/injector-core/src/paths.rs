//! Game directory layout and reference-tree path translation

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the mod root folder under the game directory
pub const MODLOADER_DIR: &str = "modloader";

/// Name of the pristine reference tree under the plugin directory
pub const REFERENCE_DIR: &str = "injector";

/// Settings file read from the plugin directory
pub const SETTINGS_FILE: &str = "comp.injector.ini";

/// Plugin log file written to the plugin directory
pub const LOG_FILE: &str = "comp.injector.log";

/// Resolved locations for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePaths {
    /// Game installation directory
    pub game_root: PathBuf,
    /// `<game>/modloader`
    pub modloader_root: PathBuf,
    /// Directory the plugin lives in (settings, log, reference tree)
    pub plugin_dir: PathBuf,
    /// Parallel tree holding pristine copies of files we rewrite
    pub reference_root: PathBuf,
}

impl GamePaths {
    /// Layout for a game directory with the plugin installed at its root
    pub fn new(game_root: impl Into<PathBuf>) -> Self {
        let game_root = game_root.into();
        let modloader_root = game_root.join(MODLOADER_DIR);
        let plugin_dir = game_root.clone();
        let reference_root = plugin_dir.join(REFERENCE_DIR);
        Self {
            game_root,
            modloader_root,
            plugin_dir,
            reference_root,
        }
    }

    /// Move the plugin directory; the reference tree follows it
    pub fn with_plugin_dir(mut self, plugin_dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = plugin_dir.into();
        self.reference_root = self.plugin_dir.join(REFERENCE_DIR);
        self
    }

    /// Point the reference tree somewhere else entirely
    pub fn with_reference_root(mut self, reference_root: impl Into<PathBuf>) -> Self {
        self.reference_root = reference_root.into();
        self
    }

    /// Map a game-relative path such as `data/cheatStrings.dat` to an absolute one
    pub fn game_path(&self, relative: &str) -> PathBuf {
        self.game_root.join(relative)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.plugin_dir.join(SETTINGS_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.plugin_dir.join(LOG_FILE)
    }

    /// Where the pristine copy of `target` lives in the reference tree
    ///
    /// Relative paths are taken as game-relative. Absolute paths under the
    /// game root keep their game-relative layout, except that files inside a
    /// mod (`modloader/<mod>/...`) lose the `modloader/<mod>` prefix. Anything
    /// else falls back to the bare file name.
    pub fn reference_path_for(&self, target: &Path) -> PathBuf {
        if target.is_relative() {
            return self.reference_root.join(target);
        }

        if let Ok(relative) = target.strip_prefix(&self.game_root) {
            if relative.components().next().is_some() {
                if let Some(trimmed) = trim_modloader_prefix(relative) {
                    return self.reference_root.join(trimmed);
                }
                return self.reference_root.join(relative);
            }
        }

        match target.file_name() {
            Some(name) => self.reference_root.join(name),
            None => self.reference_root.clone(),
        }
    }
}

/// `modloader/<mod>/a/b.ini` -> `a/b.ini`; None if the path is not inside a mod
fn trim_modloader_prefix(relative: &Path) -> Option<PathBuf> {
    let mut components = relative.components();

    match components.next() {
        Some(Component::Normal(first))
            if first.to_string_lossy().eq_ignore_ascii_case(MODLOADER_DIR) => {}
        _ => return None,
    }

    // mod folder name
    components.next()?;

    let rest: PathBuf = components.collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}
