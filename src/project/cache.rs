//! Decoded-table cache.
//!
//! Entries are keyed by path and namespace pair and stay valid while the
//! file's modification time is unchanged. Directory trees are dated by
//! their newest entry. The cache is an ordinary value:
//! whoever runs stacks owns it and decides how long it lives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::base::Name;
use crate::interchange::{MappingError, MappingModel};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    from: Name,
    to: Name,
}

#[derive(Debug)]
struct CacheEntry {
    modified: Option<SystemTime>,
    model: Arc<MappingModel>,
}

/// Shared cache of decoded mapping tables.
#[derive(Debug, Default)]
pub struct MappingsCache {
    entries: Mutex<FxHashMap<CacheKey, CacheEntry>>,
}

impl MappingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached `from` → `to` table of `path`, decoding it with
    /// `load` when absent or when the file changed since it was cached.
    pub fn get_or_load<F>(
        &self,
        path: &Path,
        from: &str,
        to: &str,
        load: F,
    ) -> Result<Arc<MappingModel>, MappingError>
    where
        F: FnOnce() -> Result<MappingModel, MappingError>,
    {
        let modified = last_modified(path)?;
        let key = CacheKey {
            path: path.to_path_buf(),
            from: Name::new(from),
            to: Name::new(to),
        };

        {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(entry) if modified.is_some() && entry.modified == modified => {
                    tracing::debug!("cache hit for {}", path.display());
                    return Ok(Arc::clone(&entry.model));
                }
                Some(_) => {
                    entries.retain(|k, _| k.path != key.path);
                }
                None => {}
            }
        }

        // Decoding happens outside the lock.
        let model = Arc::new(load()?);
        self.entries.lock().insert(
            key,
            CacheEntry {
                modified,
                model: Arc::clone(&model),
            },
        );
        Ok(model)
    }

    /// Drop every entry for `path`.
    pub fn invalidate(&self, path: &Path) {
        self.entries.lock().retain(|k, _| k.path != path);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Modification time of `path`, or of the newest entry below it for
/// directories.
fn last_modified(path: &Path) -> std::io::Result<Option<SystemTime>> {
    let metadata = std::fs::metadata(path)?;
    let mut newest = metadata.modified().ok();
    if metadata.is_dir() {
        for entry in std::fs::read_dir(path)? {
            newest = newest.max(last_modified(&entry?.path())?);
        }
    }
    Ok(newest)
}
