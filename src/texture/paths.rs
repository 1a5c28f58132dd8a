use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Output texture paths already known to exist, shared by every map worker
/// of one coordinator. Seeded lazily, exactly once, from a listing of the
/// output directory; grown as composites are written.
pub struct GeneratedPaths {
    paths: Mutex<Option<HashSet<PathBuf>>>,
}

impl GeneratedPaths {
    pub fn new() -> Self {
        Self { paths: Mutex::new(None) }
    }

    /// Atomically test-and-insert: returns true when the path was unknown
    /// and the caller now owns writing that file. A missing output
    /// directory seeds an empty set.
    pub fn claim(&self, output_dir: &Path, path: &Path) -> io::Result<bool> {
        let mut guard = lock(&self.paths);
        if guard.is_none() {
            *guard = Some(list_bitmaps(output_dir)?);
        }
        let set = guard.get_or_insert_with(HashSet::new);
        Ok(set.insert(path.to_path_buf()))
    }

    /// Give a claim back after a failed write, so another worker can retry
    /// the file instead of trusting a composite that never landed on disk.
    pub fn release(&self, path: &Path) {
        if let Some(set) = lock(&self.paths).as_mut() {
            set.remove(path);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.paths)
            .as_ref()
            .map(|set| set.contains(path))
            .unwrap_or(false)
    }
}

impl Default for GeneratedPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(mutex: &Mutex<Option<HashSet<PathBuf>>>) -> MutexGuard<'_, Option<HashSet<PathBuf>>> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn list_bitmaps(dir: &Path) -> io::Result<HashSet<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(err) => return Err(err),
    };
    let mut set = HashSet::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("bmp")) {
            set.insert(path);
        }
    }
    Ok(set)
}
