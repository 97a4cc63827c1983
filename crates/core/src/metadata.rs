use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Embedded,
    FileCreated,
    FileChanged,
}

/// One matched file as it moves through the pipeline.
///
/// Owned by exactly one stage at a time: the scanner creates it, a worker
/// fills in `date` and `new_path`, and it is dropped once reported.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    original_path: PathBuf,
    pub new_path: Option<PathBuf>,
    pub date: Option<DateTime<Local>>,
    pub date_source: Option<DateSource>,
    pub processable: bool,
}

impl ImageDescriptor {
    pub fn new(original_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            new_path: None,
            date: None,
            date_source: None,
            processable: true,
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}

/// Result record emitted for every scanned file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Planned {
        original_path: PathBuf,
        new_path: PathBuf,
        date_source: DateSource,
        warning: Option<String>,
    },
    Renamed {
        original_path: PathBuf,
        new_path: PathBuf,
        date_source: DateSource,
        warning: Option<String>,
    },
    Unchanged {
        original_path: PathBuf,
        date_source: DateSource,
        warning: Option<String>,
    },
    Skipped {
        original_path: PathBuf,
        reason: String,
    },
    Failed {
        original_path: PathBuf,
        new_path: Option<PathBuf>,
        reason: String,
    },
}

impl RenameOutcome {
    pub fn original_path(&self) -> &Path {
        match self {
            Self::Planned { original_path, .. }
            | Self::Renamed { original_path, .. }
            | Self::Unchanged { original_path, .. }
            | Self::Skipped { original_path, .. }
            | Self::Failed { original_path, .. } => original_path,
        }
    }

    pub fn new_path(&self) -> Option<&Path> {
        match self {
            Self::Planned { new_path, .. } | Self::Renamed { new_path, .. } => Some(new_path),
            Self::Failed { new_path, .. } => new_path.as_deref(),
            Self::Unchanged { .. } | Self::Skipped { .. } => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Planned { warning, .. }
            | Self::Renamed { warning, .. }
            | Self::Unchanged { warning, .. } => warning.as_deref(),
            Self::Skipped { .. } | Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned: usize,
    pub planned: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub fallbacks: usize,
}

impl RenameStats {
    pub fn record(&mut self, outcome: &RenameOutcome) {
        self.scanned += 1;
        match outcome {
            RenameOutcome::Planned { .. } => self.planned += 1,
            RenameOutcome::Renamed { .. } => self.renamed += 1,
            RenameOutcome::Unchanged { .. } => self.unchanged += 1,
            RenameOutcome::Skipped { .. } => self.skipped += 1,
            RenameOutcome::Failed { .. } => self.failed += 1,
        }
        if outcome.warning().is_some() {
            self.fallbacks += 1;
        }
    }
}
