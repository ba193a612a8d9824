//! Image asset cache.
//!
//! Records what is known about each catalog reference: decoded dimensions or
//! the reason it failed to load. Local files are probed on demand, remote
//! ones only become known once the preloader or the fetcher has fetched
//! them. Every fetched result is announced to subscribers so the display
//! can redraw an image that was still loading.

pub mod download;
pub mod preload;

pub use preload::{preload, spawn_fetcher};

use crate::catalog::ImageRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Pending update notifications per subscriber before it starts lagging
const UPDATE_CAPACITY: usize = 64;

/// Load outcome for one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Ready { width: u32, height: u32 },
    Failed(String),
}

/// Shared cache handle; clones see the same entries
#[derive(Clone)]
pub struct AssetCache {
    root: Arc<PathBuf>,
    entries: Arc<RwLock<HashMap<ImageRef, AssetStatus>>>,
    updates: broadcast::Sender<ImageRef>,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            entries: Arc::new(RwLock::new(HashMap::new())),
            updates: broadcast::channel(UPDATE_CAPACITY).0,
        }
    }

    /// Filesystem path of a local reference
    pub fn resolve_path(&self, reference: &ImageRef) -> PathBuf {
        self.root.join(reference.as_str())
    }

    pub fn get(&self, reference: &ImageRef) -> Option<AssetStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
    }

    /// Record a fetched result and announce it
    pub fn insert(&self, reference: ImageRef, status: AssetStatus) {
        self.store(reference.clone(), status);
        // No subscribers is fine
        let _ = self.updates.send(reference);
    }

    /// References whose status changed through `insert`
    pub fn subscribe(&self) -> broadcast::Receiver<ImageRef> {
        self.updates.subscribe()
    }

    fn store(&self, reference: ImageRef, status: AssetStatus) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference, status);
    }

    /// Cached status, probing local files on first use.
    ///
    /// `None` means a remote image that has not been fetched yet.
    pub fn lookup(&self, reference: &ImageRef) -> Option<AssetStatus> {
        if let Some(status) = self.get(reference) {
            return Some(status);
        }
        if reference.is_remote() {
            return None;
        }

        // The caller is drawing this very reference, nobody needs telling
        let status = probe_local(&self.resolve_path(reference));
        self.store(reference.clone(), status.clone());
        Some(status)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Read just enough of a local image to learn its format and dimensions
pub fn probe_local(path: &Path) -> AssetStatus {
    let probed = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.into_dimensions());

    match probed {
        Ok((width, height)) => AssetStatus::Ready { width, height },
        Err(e) => AssetStatus::Failed(format!("{}: {}", path.display(), e)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh scratch directory under the system temp dir
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("signage-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        image::RgbImage::new(width, height)
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_lookup_probes_local_once() {
        let dir = scratch_dir("cache-probe");
        write_png(&dir, "slide.png", 4, 3);
        let cache = AssetCache::new(&dir);

        let reference = ImageRef::new("slide.png");
        assert_eq!(
            cache.lookup(&reference),
            Some(AssetStatus::Ready { width: 4, height: 3 })
        );
        assert_eq!(cache.len(), 1);

        // Cached result survives the file going away
        std::fs::remove_file(dir.join("slide.png")).unwrap();
        assert!(matches!(cache.lookup(&reference), Some(AssetStatus::Ready { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_fails() {
        let cache = AssetCache::new(scratch_dir("cache-missing"));
        assert!(matches!(
            cache.lookup(&ImageRef::new("nope.jpg")),
            Some(AssetStatus::Failed(_))
        ));
    }

    #[test]
    fn test_garbage_file_fails() {
        let dir = scratch_dir("cache-garbage");
        std::fs::write(dir.join("broken.jpg"), b"not an image").unwrap();
        let cache = AssetCache::new(&dir);
        assert!(matches!(
            cache.lookup(&ImageRef::new("broken.jpg")),
            Some(AssetStatus::Failed(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_remote_unknown_until_fetched() {
        let cache = AssetCache::new(".");
        let reference = ImageRef::new("https://example.com/a.jpg");
        assert_eq!(cache.lookup(&reference), None);

        cache.insert(reference.clone(), AssetStatus::Failed("HTTP error: 404".into()));
        assert!(matches!(cache.lookup(&reference), Some(AssetStatus::Failed(_))));
    }

    #[test]
    fn test_insert_notifies_lookup_does_not() {
        let dir = scratch_dir("cache-updates");
        write_png(&dir, "local.png", 2, 2);
        let cache = AssetCache::new(&dir);
        let mut updates = cache.subscribe();

        cache.lookup(&ImageRef::new("local.png"));
        assert!(updates.try_recv().is_err());

        let remote = ImageRef::new("https://example.com/b.jpg");
        cache.insert(remote.clone(), AssetStatus::Ready { width: 1, height: 1 });
        assert_eq!(updates.try_recv(), Ok(remote));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
