//! C FFI bindings for injector-core
//!
//! Entry points for a plugin host (the game-side loader) that runs the merge
//! pass at startup, before the game reads its data files.

use injector_core::{logging, DataKind, GamePaths, Settings};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the log writer alive for the lifetime of the host process
static LOG_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

unsafe fn path_arg(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }
    let path = CStr::from_ptr(ptr).to_str().ok()?;
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Run the full merge pass
///
/// Returns 0 when every file was processed, 1 when some files failed (see
/// the log), and -1 on invalid arguments. The plugin log is opened on the
/// first call.
///
/// # Safety
/// - `game_dir` must be a valid C string
/// - `plugin_dir` must be a valid C string or null (null means `game_dir`)
#[no_mangle]
pub unsafe extern "C" fn comp_injector_run(game_dir: *const c_char, plugin_dir: *const c_char) -> i32 {
    let Some(game_dir) = path_arg(game_dir) else {
        return -1;
    };

    let mut paths = GamePaths::new(game_dir);
    if let Some(plugin_dir) = path_arg(plugin_dir) {
        paths = paths.with_plugin_dir(plugin_dir);
    }

    LOG_GUARD.get_or_init(|| match logging::init(&paths.log_file(), "info", false) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("comp.injector: {}", e);
            None
        }
    });

    let settings = match Settings::load(paths.settings_file()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("could not read settings, using defaults: {}", e);
            Settings::default()
        }
    };

    let report = injector_core::run(&paths, &settings);
    if report.failures() == 0 {
        0
    } else {
        1
    }
}

/// Check a fragment line against one kind's grammar
///
/// `kind` is a kind name such as `weapon_config`. Returns 1 if accepted,
/// 0 if rejected and -1 on invalid arguments or an unknown kind.
///
/// # Safety
/// - `kind` and `line` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn comp_injector_validate_line(kind: *const c_char, line: *const c_char) -> i32 {
    if kind.is_null() || line.is_null() {
        return -1;
    }

    let Ok(kind) = CStr::from_ptr(kind).to_str() else {
        return -1;
    };
    let Ok(kind) = kind.parse::<DataKind>() else {
        return -1;
    };
    let line = CStr::from_ptr(line).to_string_lossy();

    i32::from(kind.validate(&line))
}
