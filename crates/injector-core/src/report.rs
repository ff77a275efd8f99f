//! Run report
//!
//! Records what every engine did during one pass so it can be inspected
//! afterwards or saved as JSON.

use crate::error::{Error, Result};
use crate::kinds::DataKind;
use crate::merger::MergeOutcome;
use crate::patch::DirectiveReport;
use crate::variation::VariationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one line-oriented data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindOutcome {
    /// Loader switched off in the settings
    Disabled,
    /// No entries and nothing merged before
    Skipped,
    /// Reset to its baseline
    Refreshed,
    Updated { written: usize, duplicates: usize },
    /// Neither a baseline nor the target exists
    MissingBaseline,
    Failed(String),
}

impl From<MergeOutcome> for KindOutcome {
    fn from(outcome: MergeOutcome) -> Self {
        match outcome {
            MergeOutcome::Skipped => KindOutcome::Skipped,
            MergeOutcome::Refreshed => KindOutcome::Refreshed,
            MergeOutcome::Updated {
                written,
                duplicates,
            } => KindOutcome::Updated {
                written,
                duplicates,
            },
        }
    }
}

/// Outcome for one data kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindReport {
    pub kind: DataKind,
    /// Entries collected for the kind before deduplication
    pub entries: usize,
    pub outcome: KindOutcome,
}

/// Everything one pass did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub game_dir: PathBuf,
    pub kinds: Vec<KindReport>,
    /// `None` when the directive loader is switched off
    pub directives: Option<DirectiveReport>,
    /// `None` when the variation loader is switched off
    pub variations: Option<VariationReport>,
}

impl RunReport {
    /// Start a report for a pass over `game_dir`
    pub fn new(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            game_dir: game_dir.into(),
            kinds: Vec::new(),
            directives: None,
            variations: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcome recorded for a kind
    pub fn kind(&self, kind: DataKind) -> Option<&KindReport> {
        self.kinds.iter().find(|report| report.kind == kind)
    }

    /// Number of files written by all engines
    pub fn files_written(&self) -> usize {
        let kinds = self
            .kinds
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    KindOutcome::Refreshed | KindOutcome::Updated { .. }
                )
            })
            .count();
        let directives = self.directives.as_ref().map_or(0, |d| d.updated.len());
        let variations = self.variations.as_ref().map_or(0, |v| v.updated.len());
        kinds + directives + variations
    }

    /// Number of files that could not be processed
    pub fn failures(&self) -> usize {
        let kinds = self
            .kinds
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    KindOutcome::Failed(_) | KindOutcome::MissingBaseline
                )
            })
            .count();
        let directives = self.directives.as_ref().map_or(0, |d| d.errors.len());
        let variations = self.variations.as_ref().map_or(0, |v| v.errors.len());
        kinds + directives + variations
    }

    /// Load a report saved with `save`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
