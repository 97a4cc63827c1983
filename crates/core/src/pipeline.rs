use crate::cancel::CancelToken;
use crate::error::PipelineError;
use crate::extractor::{extract_date, ExifProbe, MetadataProbe};
use crate::metadata::{ImageDescriptor, RenameOutcome, RenameStats};
use crate::naming::generate_name;
use crate::pattern::NamingPattern;
use crate::registry::NameRegistry;
use crate::renamer::{RenameAction, Renamer};
use crate::scanner::{check_root, spawn_scanner, ImageScanner};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub pattern: String,
    pub workers: usize,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            pattern: NamingPattern::default().as_str().to_string(),
            workers: DEFAULT_WORKERS,
            dry_run: true,
        }
    }
}

/// A running rename job.
///
/// One scanner thread hands descriptors to `workers` pool threads over a
/// zero-capacity channel. Every worker sends its outcomes into one shared
/// channel, which this type drains as an iterator; the channel closes once
/// the last worker has exited. Outcomes arrive in completion order.
pub struct Pipeline {
    root: PathBuf,
    results: Receiver<RenameOutcome>,
    scanner: Option<JoinHandle<usize>>,
    cancel: CancelToken,
    registry: Arc<NameRegistry>,
    stats: RenameStats,
    _pool: rayon::ThreadPool,
}

impl Pipeline {
    pub fn start(options: &RunOptions) -> Result<Self, PipelineError> {
        Self::start_with_probe(options, Arc::new(ExifProbe))
    }

    pub fn start_with_probe(
        options: &RunOptions,
        probe: Arc<dyn MetadataProbe>,
    ) -> Result<Self, PipelineError> {
        if options.workers == 0 {
            return Err(PipelineError::InvalidWorkerCount(options.workers));
        }
        check_root(&options.root)?;

        let pattern = NamingPattern::parse_or_default(&options.pattern);
        let renamer = Renamer::new(options.dry_run);
        let registry = Arc::new(NameRegistry::new());
        let cancel = CancelToken::new();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("rename-worker-{i}"))
            .panic_handler(|_| error!("rename worker panicked"))
            .build()?;

        let (job_tx, job_rx) = bounded::<ImageDescriptor>(0);
        let (result_tx, result_rx) = bounded::<RenameOutcome>(0);

        for id in 0..options.workers {
            let worker = Worker {
                id,
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                cancel: cancel.clone(),
                registry: Arc::clone(&registry),
                probe: Arc::clone(&probe),
                pattern,
                renamer,
            };
            pool.spawn(move || worker.run());
        }
        // only workers may hold channel ends, so closing follows their exit
        drop(job_rx);
        drop(result_tx);

        let scanner = ImageScanner::new(&options.root, Arc::clone(&registry));
        let scanner = spawn_scanner(scanner, job_tx, cancel.clone())?;

        info!(
            root = %options.root.display(),
            %pattern,
            workers = options.workers,
            dry_run = options.dry_run,
            "rename run started"
        );

        Ok(Self {
            root: options.root.clone(),
            results: result_rx,
            scanner: Some(scanner),
            cancel,
            registry,
            stats: RenameStats::default(),
            _pool: pool,
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Drains what is left, waits for every thread and reports how the run
    /// ended. A scan that matched nothing is an error, not an empty success.
    pub fn finish(mut self) -> Result<RenameStats, PipelineError> {
        self.by_ref().for_each(drop);

        let scanned = match self.scanner.take() {
            Some(handle) => handle.join().map_err(|_| PipelineError::ScannerPanicked)?,
            None => 0,
        };
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if scanned == 0 {
            return Err(PipelineError::NoFilesFound(self.root.clone()));
        }

        info!(
            scanned,
            renamed = self.stats.renamed,
            planned = self.stats.planned,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "rename run finished"
        );
        Ok(std::mem::take(&mut self.stats))
    }
}

impl Iterator for Pipeline {
    type Item = RenameOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let outcome = self.results.recv().ok()?;
        self.stats.record(&outcome);
        Some(outcome)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // abandoned before `finish`: release blocked threads
        if self.scanner.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Starts a run and feeds every outcome to `on_outcome` until it completes.
pub fn run<F>(options: &RunOptions, mut on_outcome: F) -> Result<RenameStats, PipelineError>
where
    F: FnMut(&RenameOutcome),
{
    let mut pipeline = Pipeline::start(options)?;
    for outcome in pipeline.by_ref() {
        on_outcome(&outcome);
    }
    pipeline.finish()
}

struct Worker {
    id: usize,
    jobs: Receiver<ImageDescriptor>,
    results: Sender<RenameOutcome>,
    cancel: CancelToken,
    registry: Arc<NameRegistry>,
    probe: Arc<dyn MetadataProbe>,
    pattern: NamingPattern,
    renamer: Renamer,
}

impl Worker {
    fn run(self) {
        loop {
            let mut desc = select! {
                recv(self.cancel.receiver()) -> _ => break,
                recv(self.jobs) -> job => match job {
                    Ok(desc) => desc,
                    Err(_) => break,
                },
            };

            let Some(outcome) = self.process(&mut desc) else {
                break;
            };

            select! {
                recv(self.cancel.receiver()) -> _ => break,
                send(self.results, outcome) -> sent => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(worker = self.id, "worker exiting");
    }

    /// Extract, name, rename. `None` when cancelled before touching the file.
    fn process(&self, desc: &mut ImageDescriptor) -> Option<RenameOutcome> {
        let original_path = desc.original_path().to_path_buf();

        let extraction = match extract_date(desc, self.probe.as_ref()) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(path = %original_path.display(), error = %err, "skipping file");
                return Some(RenameOutcome::Skipped {
                    original_path,
                    reason: err.to_string(),
                });
            }
        };
        if let Some(reason) = &extraction.fallback {
            warn!(path = %original_path.display(), %reason, "no embedded capture date");
        }

        let new_path = match generate_name(desc, self.pattern, &self.registry) {
            Ok(path) => path,
            Err(err) => {
                return Some(RenameOutcome::Failed {
                    original_path,
                    new_path: None,
                    reason: err.to_string(),
                });
            }
        };

        if self.cancel.is_cancelled() {
            return None;
        }

        let date_source = extraction.source;
        let warning = extraction.fallback;
        let outcome = match self.renamer.apply_tracked(desc, &self.registry) {
            Ok(RenameAction::DryRun) => RenameOutcome::Planned {
                original_path,
                new_path,
                date_source,
                warning,
            },
            Ok(RenameAction::Moved) => RenameOutcome::Renamed {
                original_path,
                new_path,
                date_source,
                warning,
            },
            Ok(RenameAction::Unchanged) => RenameOutcome::Unchanged {
                original_path,
                date_source,
                warning,
            },
            Err(err) => {
                error!(path = %original_path.display(), error = %err, "rename failed");
                RenameOutcome::Failed {
                    original_path,
                    new_path: Some(new_path),
                    reason: err.to_string(),
                }
            }
        };
        Some(outcome)
    }
}
