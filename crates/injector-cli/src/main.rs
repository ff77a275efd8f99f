//! Comp.Injector CLI
//!
//! Command-line tool for running the merge pass over a game directory and
//! inspecting what the mod tree contributes.

use clap::{Parser, Subcommand};
use injector_core::baseline::restore_tree;
use injector_core::directive::collect_directive_files;
use injector_core::files::read_lines;
use injector_core::ini::is_comment_or_blank;
use injector_core::logging::{self, WorkerGuard};
use injector_core::report::KindOutcome;
use injector_core::variation::collect_variation_files;
use injector_core::{collect_fragments, DataKind, GamePaths, RunReport, Settings};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "injector-cli")]
#[command(about = "Merge mod-supplied data into game files", long_about = None)]
#[command(version)]
struct Cli {
    /// Game installation directory
    #[arg(short, long, global = true, default_value = ".")]
    game_dir: PathBuf,

    /// Plugin directory holding settings, log and reference tree
    /// (defaults to the game directory)
    #[arg(short, long, global = true)]
    plugin_dir: Option<PathBuf>,

    /// Reference tree with pristine copies (defaults to <plugin-dir>/injector)
    #[arg(long, global = true)]
    reference_dir: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full merge pass
    Run {
        /// Save the run report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Show what the mod tree contributes without writing anything
    Scan,

    /// Validate a fragment file and show which kinds accept each line
    Check {
        /// Fragment file to check
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the effective settings as JSON
    Settings,

    /// Reset every ini under the mod root from the reference tree
    Restore,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> injector_core::Result<()> {
    let cli = Cli::parse();
    let paths = game_paths(&cli);

    match cli.command {
        Commands::Run { report } => cmd_run(&paths, cli.verbose, report.as_deref()),
        Commands::Scan => cmd_scan(&paths),
        Commands::Check { file } => cmd_check(&file),
        Commands::Settings => cmd_settings(&paths),
        Commands::Restore => cmd_restore(&paths, cli.verbose),
    }
}

fn game_paths(cli: &Cli) -> GamePaths {
    let mut paths = GamePaths::new(&cli.game_dir);
    if let Some(plugin_dir) = &cli.plugin_dir {
        paths = paths.with_plugin_dir(plugin_dir);
    }
    if let Some(reference_dir) = &cli.reference_dir {
        paths = paths.with_reference_root(reference_dir);
    }
    paths
}

fn init_logging(paths: &GamePaths, verbose: bool) -> injector_core::Result<WorkerGuard> {
    let level = if verbose { "debug" } else { "info" };
    logging::init(&paths.log_file(), level, true)
}

fn cmd_run(paths: &GamePaths, verbose: bool, report_path: Option<&Path>) -> injector_core::Result<()> {
    let _guard = init_logging(paths, verbose)?;

    let settings = Settings::load(paths.settings_file())?;
    let report = injector_core::run(paths, &settings);

    print_summary(&report);

    if let Some(path) = report_path {
        report.save(path)?;
        println!();
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("Data files:");
    for kind in &report.kinds {
        let outcome = match &kind.outcome {
            KindOutcome::Disabled => "disabled".to_string(),
            KindOutcome::Skipped => "untouched".to_string(),
            KindOutcome::Refreshed => "reset to baseline".to_string(),
            KindOutcome::Updated {
                written,
                duplicates,
            } => format!("{} entries written, {} duplicates", written, duplicates),
            KindOutcome::MissingBaseline => "base file missing".to_string(),
            KindOutcome::Failed(msg) => format!("failed: {}", msg),
        };
        println!("  {:<24} {:>5} collected  {}", kind.kind, kind.entries, outcome);
    }

    if let Some(directives) = &report.directives {
        println!();
        println!(
            "Directives: {} from {} files, {} ini files updated, {} already current, {} restored",
            directives.directives,
            directives.files.len(),
            directives.updated.len(),
            directives.current.len(),
            directives.restored
        );
        for name in &directives.unresolved {
            println!("  not found: {}", name);
        }
        for (path, error) in &directives.errors {
            println!("  failed: {}: {}", path.display(), error);
        }
    }

    if let Some(variations) = &report.variations {
        println!();
        println!(
            "Variations: {} fragments for {} files, {} updated, {} restored",
            variations.sources,
            variations.targets,
            variations.updated.len(),
            variations.restored
        );
        for name in &variations.missing_targets {
            println!("  not found: {}", name);
        }
        for (path, error) in &variations.errors {
            println!("  failed: {}: {}", path.display(), error);
        }
    }

    println!();
    println!(
        "{} files written, {} failures",
        report.files_written(),
        report.failures()
    );
}

fn cmd_scan(paths: &GamePaths) -> injector_core::Result<()> {
    let root = &paths.modloader_root;
    let pool = collect_fragments(root, &DataKind::ALL);

    println!("Mod root: {}", root.display());
    println!(
        "Read {} fragment files and {} mirror files ({} lines rejected)",
        pool.fragment_files, pool.mirror_files, pool.rejected_lines
    );
    println!();

    for kind in DataKind::ALL {
        let descriptor = kind.descriptor();
        println!(
            "  {:<24} {:>5} entries -> {}",
            kind,
            pool.entries(kind).len(),
            descriptor.target
        );
    }

    println!();
    println!("Directive files: {}", collect_directive_files(root).len());
    println!("Variation files: {}", collect_variation_files(root).len());

    Ok(())
}

fn cmd_check(file: &Path) -> injector_core::Result<()> {
    let lines = read_lines(file)?;

    let mut rejected = 0;
    for (number, line) in lines.iter().enumerate() {
        if is_comment_or_blank(line) {
            continue;
        }

        let kinds: Vec<&str> = DataKind::ALL
            .into_iter()
            .filter(|kind| kind.validate(line))
            .map(DataKind::name)
            .collect();

        if kinds.is_empty() {
            rejected += 1;
            println!("{:>5}: {}  -> rejected", number + 1, line);
        } else {
            println!("{:>5}: {}  -> {}", number + 1, line, kinds.join(", "));
        }
    }

    println!();
    println!("{} lines rejected", rejected);
    Ok(())
}

fn cmd_settings(paths: &GamePaths) -> injector_core::Result<()> {
    let settings = Settings::load(paths.settings_file())?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn cmd_restore(paths: &GamePaths, verbose: bool) -> injector_core::Result<()> {
    let _guard = init_logging(paths, verbose)?;

    let restored = restore_tree(paths, &paths.modloader_root, "RESTORE");
    println!(
        "Restored {} ini files from {}",
        restored,
        paths.reference_root.display()
    );
    Ok(())
}
