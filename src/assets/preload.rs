//! Startup preloader and on-demand fetcher.
//!
//! The preloader walks the flattened catalog once and records every image
//! in the cache. The fetcher loads single references the display asked for
//! before the preloader got to them. Failures are logged and recorded, never
//! fatal.

use super::download::download_image;
use super::{AssetCache, AssetStatus, probe_local};
use crate::catalog::ImageRef;
use tokio::sync::mpsc;

/// Outcome of a preload pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub ready: usize,
    pub failed: usize,
}

/// Fetch every reference into `cache`
pub async fn preload(references: Vec<ImageRef>, cache: AssetCache) -> PreloadReport {
    tracing::info!("Preloading {} images", references.len());

    let mut report = PreloadReport::default();

    for reference in references {
        let status = fetch(&reference, &cache).await;

        match &status {
            AssetStatus::Ready { width, height } => {
                tracing::debug!("Preloaded {} ({}x{})", reference, width, height);
                report.ready += 1;
            }
            AssetStatus::Failed(reason) => {
                tracing::error!("Error preloading {}: {}", reference, reason);
                report.failed += 1;
            }
        }

        cache.insert(reference, status);
    }

    tracing::info!(
        "Preload complete: {} ready, {} failed",
        report.ready,
        report.failed
    );
    report
}

/// Spawn a task that fetches requested references into `cache`.
///
/// Requests for references the cache already knows are skipped, so asking
/// twice is harmless. The task ends once every sender is dropped.
pub fn spawn_fetcher(cache: AssetCache) -> mpsc::UnboundedSender<ImageRef> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ImageRef>();

    tokio::spawn(async move {
        while let Some(reference) = rx.recv().await {
            if cache.get(&reference).is_some() {
                continue;
            }

            tracing::debug!("Fetching {}", reference);
            let status = fetch(&reference, &cache).await;
            if let AssetStatus::Failed(reason) = &status {
                tracing::error!("Error fetching {}: {}", reference, reason);
            }
            cache.insert(reference, status);
        }
        tracing::debug!("Fetcher stopped");
    });

    tx
}

async fn fetch(reference: &ImageRef, cache: &AssetCache) -> AssetStatus {
    if reference.is_remote() {
        return match download_image(reference.as_str()).await {
            Ok(img) => AssetStatus::Ready {
                width: img.width(),
                height: img.height(),
            },
            Err(e) => AssetStatus::Failed(e.to_string()),
        };
    }

    let path = cache.resolve_path(reference);
    tokio::task::spawn_blocking(move || probe_local(&path))
        .await
        .unwrap_or_else(|e| AssetStatus::Failed(format!("probe task failed: {}", e)))
}
