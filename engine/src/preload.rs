use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::story::Catalog;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported asset location {0:?}")]
    UnsupportedLocation(String),
    #[error("asset request failed: {0}")]
    Request(String),
    #[error("asset server answered with status {0}")]
    Status(u16),
    #[error("asset body was empty")]
    EmptyBody,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fetches the bytes behind a media URL far enough to know the asset is displayable.
pub trait AssetLoader: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<(), AssetError>> + Send;
}

/// Every preload resolves; a failed fetch never blocks the adjacent-preload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    Ready,
    /// The fetch failed. The pipeline moves on, but the story is not marked ready: only the
    /// renderer's own ready signal can clear loading for it.
    ReadyAfterFailure,
    /// The index was outside the catalog; nothing was fetched.
    Skipped,
}

impl PreloadOutcome {
    /// Whether the asset is known to be displayable.
    pub fn is_ready(self) -> bool {
        matches!(self, PreloadOutcome::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadReport {
    pub index: usize,
    pub outcome: PreloadOutcome,
}

#[derive(Debug)]
pub struct Preloader<L> {
    catalog: Catalog,
    loader: Arc<L>,
}

impl<L> Clone for Preloader<L> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<L: AssetLoader> Preloader<L> {
    pub fn new(catalog: Catalog, loader: L) -> Self {
        Self::with_shared_loader(catalog, Arc::new(loader))
    }

    pub fn with_shared_loader(catalog: Catalog, loader: Arc<L>) -> Self {
        Self { catalog, loader }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn preload(&self, index: usize) -> PreloadReport {
        let Some(item) = self.catalog.get(index) else {
            return PreloadReport {
                index,
                outcome: PreloadOutcome::Skipped,
            };
        };

        let outcome = match self.loader.fetch(&item.media_url).await {
            Ok(()) => {
                debug!("preloaded story {index} ({})", item.media_url);
                PreloadOutcome::Ready
            }
            Err(err) => {
                warn!("preload of story {index} ({}) failed: {err}", item.media_url);
                PreloadOutcome::ReadyAfterFailure
            }
        };
        PreloadReport { index, outcome }
    }
}

/// Indices to preload around `current`, in request order: current, next, previous.
/// Anything already in `preloaded` is skipped.
pub fn adjacent_preloads(current: usize, len: usize, preloaded: &BTreeSet<usize>) -> Vec<usize> {
    let mut wanted = Vec::with_capacity(3);
    if current < len {
        wanted.push(current);
    }
    if current + 1 < len {
        wanted.push(current + 1);
    }
    if current > 0 && current - 1 < len {
        wanted.push(current - 1);
    }
    wanted.retain(|index| !preloaded.contains(index));
    wanted
}
