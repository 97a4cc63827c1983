use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a run as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read root directory {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no image files found under {}", .0.display())]
    NoFilesFound(PathBuf),
    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("directory scanner thread panicked")]
    ScannerPanicked,
    #[error("run was cancelled")]
    Cancelled,
}

/// Item-level failures that make a file unprocessable.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown file type: {}, skipping", .0.display())]
    UnknownType(PathBuf),
    #[error("no usable timestamp for {}: {source}", .path.display())]
    Timestamps {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddedDateError {
    #[error("cannot read EXIF: {0}")]
    Exif(String),
    #[error("no capture date tag present")]
    Missing,
    #[error("unparseable capture date: {0:?}")]
    Unparseable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("no date extracted for {}", .0.display())]
    MissingDate(PathBuf),
    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("no target name computed for {}", .0.display())]
    MissingTarget(PathBuf),
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("cannot read permissions of {}: {source}", .path.display())]
    SourcePermissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot move {} -> {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}
