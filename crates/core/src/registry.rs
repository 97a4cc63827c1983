use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RegistryState {
    counts: HashMap<String, u32>,
    targets: HashSet<PathBuf>,
}

/// Per-run record of the names handed out so far.
///
/// For every base name the issued sequences are exactly `0..count`, each
/// once, no matter how many workers ask at the same time. Lock sections only
/// cover the map updates; callers format names before and after.
#[derive(Debug, Default)]
pub struct NameRegistry {
    state: Mutex<RegistryState>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next free sequence number for `base`.
    pub fn next_sequence(&self, base: &str) -> u32 {
        let mut state = self.lock();
        let count = state.counts.entry(base.to_string()).or_insert(0);
        let seq = *count;
        *count += 1;
        seq
    }

    pub fn count(&self, base: &str) -> u32 {
        self.lock().counts.get(base).copied().unwrap_or(0)
    }

    /// Remembers a path that this run is about to move a file to.
    pub fn reserve_target(&self, path: PathBuf) {
        self.lock().targets.insert(path);
    }

    /// Forgets a reservation whose move did not happen.
    pub fn release_target(&self, path: &Path) {
        self.lock().targets.remove(path);
    }

    pub fn is_reserved(&self, path: &Path) -> bool {
        self.lock().targets.contains(path)
    }

    // Every mutation is a single insert or increment, so a panic in another
    // holder cannot leave the maps half-updated.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::NameRegistry;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sequences_start_at_zero_per_base() {
        let registry = NameRegistry::new();
        assert_eq!(registry.next_sequence("2024-05-01"), 0);
        assert_eq!(registry.next_sequence("2024-05-01"), 1);
        assert_eq!(registry.next_sequence("2024-05-02"), 0);
        assert_eq!(registry.next_sequence("2024-05-01"), 2);
        assert_eq!(registry.count("2024-05-01"), 3);
        assert_eq!(registry.count("1999-01-01"), 0);
    }

    #[test]
    fn concurrent_requests_cover_sequence_range_exactly_once() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 250;

        let registry = Arc::new(NameRegistry::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let mut same = Vec::with_capacity(PER_THREAD);
                    for _ in 0..PER_THREAD {
                        same.push(registry.next_sequence("2024-05-01"));
                        registry.next_sequence(&format!("other-{}", i % 4));
                    }
                    same
                })
            })
            .collect();

        let mut issued: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("worker thread"))
            .collect();
        issued.sort_unstable();

        let expected: Vec<u32> = (0..(THREADS * PER_THREAD) as u32).collect();
        assert_eq!(issued, expected);
        assert_eq!(registry.count("2024-05-01"), (THREADS * PER_THREAD) as u32);
        for i in 0..4 {
            assert_eq!(
                registry.count(&format!("other-{i}")),
                (THREADS / 4 * PER_THREAD) as u32
            );
        }
    }

    #[test]
    fn reserved_targets_are_remembered() {
        let registry = NameRegistry::new();
        registry.reserve_target(PathBuf::from("/p/2024-05-01_0000.jpg"));
        assert!(registry.is_reserved(Path::new("/p/2024-05-01_0000.jpg")));
        assert!(!registry.is_reserved(Path::new("/p/2024-05-01_0001.jpg")));

        registry.release_target(Path::new("/p/2024-05-01_0000.jpg"));
        assert!(!registry.is_reserved(Path::new("/p/2024-05-01_0000.jpg")));
    }
}
