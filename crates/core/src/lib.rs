mod cancel;
mod config;
mod error;
mod exif_reader;
mod extractor;
mod metadata;
mod naming;
mod pattern;
mod pipeline;
mod registry;
mod renamer;
mod scanner;

pub use cancel::CancelToken;
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths};
pub use error::{EmbeddedDateError, ExtractError, NamingError, PipelineError, RenameError};
pub use exif_reader::{read_embedded_date, sniff_image_kind, ImageKind};
pub use extractor::{extract_date, ExifProbe, Extraction, MetadataProbe, Probe};
pub use metadata::{DateSource, ImageDescriptor, RenameOutcome, RenameStats};
pub use naming::generate_name;
pub use pattern::NamingPattern;
pub use pipeline::{run, Pipeline, RunOptions, DEFAULT_WORKERS};
pub use registry::NameRegistry;
pub use renamer::{inherited_dir_mode, RenameAction, Renamer};
pub use scanner::{check_root, spawn_scanner, ImageScanner};
