use crate::oracle::Classification;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type CacheKey = (PathBuf, String);

/// Memoized managed-status answers, keyed by app directory and package.
///
/// Each key owns a `OnceCell`, so concurrent lookups of the same package share
/// one in-flight probe and the answer is computed at most once per run.
#[derive(Debug, Clone, Default)]
pub struct ManagedCache {
    cells: Arc<Mutex<HashMap<CacheKey, Arc<OnceCell<Classification>>>>>,
}

impl ManagedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cell(&self, app_dir: &Path, package: &str) -> Arc<OnceCell<Classification>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            cells
                .entry((app_dir.to_path_buf(), package.to_owned()))
                .or_default(),
        )
    }

    /// A completed answer, if one exists.
    pub fn get(&self, app_dir: &Path, package: &str) -> Option<Classification> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells
            .get(&(app_dir.to_path_buf(), package.to_owned()))
            .and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|c| c.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Basis;

    #[tokio::test(flavor = "current_thread")]
    async fn cell_is_shared_per_key() {
        let cache = ManagedCache::new();
        let app = Path::new("/ws/apps/mobile");
        let a = cache.cell(app, "expo-image");
        let b = cache.cell(app, "expo-image");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());

        a.get_or_init(|| async { Classification::new(true, Basis::Authority) })
            .await;
        assert_eq!(cache.len(), 1);
        assert!(cache.get(app, "expo-image").unwrap().managed);
    }

    #[test]
    fn keys_are_scoped_by_app() {
        let cache = ManagedCache::new();
        let a = cache.cell(Path::new("/a"), "zod");
        let b = cache.cell(Path::new("/b"), "zod");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.get(Path::new("/a"), "zod").is_none());
    }
}
