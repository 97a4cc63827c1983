use crate::cancel::CancelToken;
use crate::error::PipelineError;
use crate::metadata::ImageDescriptor;
use crate::registry::NameRegistry;
use crossbeam_channel::{select, Sender};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "heif"];

/// Lazy, single-pass walk yielding one descriptor per image file.
///
/// Unreadable entries are skipped. Files that this run has moved into place
/// are skipped too, so nested layouts are not picked up twice. With a cancel
/// token attached the walk ends as soon as the token fires.
pub struct ImageScanner {
    walker: walkdir::IntoIter,
    registry: Arc<NameRegistry>,
    cancel: Option<CancelToken>,
}

impl ImageScanner {
    pub fn new(root: &Path, registry: Arc<NameRegistry>) -> Self {
        Self {
            walker: WalkDir::new(root).into_iter(),
            registry,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl Iterator for ImageScanner {
    type Item = ImageDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.walker.by_ref() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return None;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_image(entry.path()) {
                continue;
            }
            if self.registry.is_reserved(entry.path()) {
                trace!(path = %entry.path().display(), "skipping file renamed in this run");
                continue;
            }
            return Some(ImageDescriptor::new(entry.into_path()));
        }
        None
    }
}

/// Fails when the root cannot be listed at all.
pub fn check_root(root: &Path) -> Result<(), PipelineError> {
    fs::read_dir(root)
        .map(|_| ())
        .map_err(|source| PipelineError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })
}

/// Feeds the scanner into `jobs` from a dedicated thread. Each send waits for
/// a worker to take the item, or for cancellation. Yields the number of
/// descriptors handed over.
pub fn spawn_scanner(
    scanner: ImageScanner,
    jobs: Sender<ImageDescriptor>,
    cancel: CancelToken,
) -> Result<JoinHandle<usize>, PipelineError> {
    thread::Builder::new()
        .name("image-scanner".to_string())
        .spawn(move || {
            let mut emitted = 0usize;
            for desc in scanner.with_cancel(cancel.clone()) {
                select! {
                    recv(cancel.receiver()) -> _ => break,
                    send(jobs, desc) -> sent => {
                        if sent.is_err() {
                            break;
                        }
                        emitted += 1;
                    }
                }
            }
            debug!(emitted, "scan finished");
            emitted
        })
        .map_err(PipelineError::Spawn)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn list_images(root: &Path) -> Vec<PathBuf> {
        ImageScanner::new(root, Arc::new(NameRegistry::new()))
            .map(|desc| desc.original_path().to_path_buf())
            .collect()
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, b"x").expect("write");
    }

    #[test]
    fn is_image_matches_extensions_case_insensitively() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("a.JPEG")));
        assert!(is_image(Path::new("a.HeIc")));
        assert!(!is_image(Path::new("a.png")));
        assert!(!is_image(Path::new("jpg")));
    }

    #[test]
    fn walks_recursively_and_filters() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("a.JPG"));
        touch(&temp.path().join("nested/deeper/b.heic"));
        touch(&temp.path().join("nested/notes.txt"));
        fs::create_dir_all(temp.path().join("dir.jpg")).expect("mkdir");

        let found: HashSet<PathBuf> = list_images(temp.path()).into_iter().collect();
        let expected: HashSet<PathBuf> = [
            temp.path().join("a.JPG"),
            temp.path().join("nested/deeper/b.heic"),
        ]
        .into_iter()
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn skips_reserved_targets() {
        let temp = tempdir().expect("tempdir");
        let renamed = temp.path().join("2024-05-01_0000.jpg");
        touch(&renamed);
        touch(&temp.path().join("b.jpg"));

        let registry = Arc::new(NameRegistry::new());
        registry.reserve_target(renamed);
        let found: Vec<PathBuf> = ImageScanner::new(temp.path(), registry)
            .map(|d| d.original_path().to_path_buf())
            .collect();
        assert_eq!(found, vec![temp.path().join("b.jpg")]);
    }

    #[test]
    fn cancelled_walk_stops_without_reaching_images() {
        let temp = tempdir().expect("tempdir");
        for i in 0..20 {
            touch(&temp.path().join(format!("notes/{i}.txt")));
        }
        touch(&temp.path().join("z/last.jpg"));

        let cancel = CancelToken::new();
        let mut scanner = ImageScanner::new(temp.path(), Arc::new(NameRegistry::new()))
            .with_cancel(cancel.clone());
        cancel.cancel();
        assert!(scanner.next().is_none());

        let uncancelled = ImageScanner::new(temp.path(), Arc::new(NameRegistry::new()))
            .with_cancel(CancelToken::new());
        assert_eq!(uncancelled.count(), 1);
    }

    #[test]
    fn check_root_rejects_missing_directory() {
        let temp = tempdir().expect("tempdir");
        let err = check_root(&temp.path().join("missing")).expect_err("missing root");
        assert!(matches!(err, PipelineError::RootUnreadable { .. }));
        check_root(temp.path()).expect("existing root");
    }

    #[test]
    fn scanner_thread_stops_on_cancel() {
        let temp = tempdir().expect("tempdir");
        for i in 0..10 {
            touch(&temp.path().join(format!("{i}.jpg")));
        }
        let (tx, rx) = bounded(0);
        let cancel = CancelToken::new();
        let scanner = ImageScanner::new(temp.path(), Arc::new(NameRegistry::new()));
        let handle = spawn_scanner(scanner, tx, cancel.clone()).expect("spawn");

        rx.recv().expect("first item");
        cancel.cancel();
        let emitted = handle.join().expect("scanner thread");
        assert!(emitted < 10);
    }

    #[test]
    fn scanner_thread_hands_over_everything() {
        let temp = tempdir().expect("tempdir");
        for i in 0..5 {
            touch(&temp.path().join(format!("{i}.jpeg")));
        }
        let (tx, rx) = bounded(0);
        let scanner = ImageScanner::new(temp.path(), Arc::new(NameRegistry::new()));
        let handle = spawn_scanner(scanner, tx, CancelToken::new()).expect("spawn");

        let received: Vec<ImageDescriptor> = rx.iter().collect();
        assert_eq!(received.len(), 5);
        assert_eq!(handle.join().expect("scanner thread"), 5);
    }
}
