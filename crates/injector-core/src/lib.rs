//! injector-core: merge engine for mod-supplied game data
//!
//! This library provides functionality to:
//! - Collect data fragments from the mod tree and validate them per file kind
//! - Regenerate line-oriented data files from a pristine baseline plus fragments
//! - Apply `.inj` directives to ini files
//! - Merge `.mva` model variation fragments by mod priority

pub mod baseline;
pub mod directive;
pub mod error;
pub mod files;
pub mod ini;
pub mod kinds;
pub mod logging;
pub mod merger;
pub mod patch;
pub mod paths;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod settings;
pub mod validate;
pub mod variation;

pub use baseline::BaselineStrategy;
pub use directive::{parse_directives, Directive, Modifier};
pub use error::{Error, Result};
pub use kinds::{DataKind, KindDescriptor};
pub use merger::{regenerate, render_merged, MergeOutcome};
pub use patch::{process_directives, DirectiveReport};
pub use paths::GamePaths;
pub use report::{KindOutcome, KindReport, RunReport};
pub use runner::run;
pub use scanner::{collect_fragments, FragmentPool};
pub use settings::Settings;
pub use variation::{process_variations, VariationReport};
