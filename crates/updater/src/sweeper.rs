//! Image cleanup.
//!
//! After a pass the sweeper prunes unused images so superseded layers do
//! not accumulate on disk. The prune uses `dangling=false`, which also
//! removes tagged images nothing references anymore; that matches what
//! an update leaves behind when a container moves to a new image id.

use std::sync::Arc;

use tracing::{debug, info};

use crate::docker::DockerClient;
use crate::error::UpdaterError;

/// Prunes unused images after update passes.
pub struct CleanupSweeper<C> {
    docker: Arc<C>,
    dry_run: bool,
}

impl<C: DockerClient> CleanupSweeper<C> {
    /// Creates a sweeper; in dry-run mode it never prunes.
    pub fn new(docker: Arc<C>, dry_run: bool) -> Self {
        Self { docker, dry_run }
    }

    /// Prunes unused images and returns the bytes reclaimed.
    ///
    /// In dry-run mode this returns zero without calling Docker.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::Prune` if the prune call fails.
    pub async fn sweep(&self) -> Result<u64, UpdaterError> {
        if self.dry_run {
            debug!("dry-run: skipping image prune");
            return Ok(0);
        }

        let reclaimed = self.docker.prune_images().await?;
        if reclaimed > 0 {
            info!(reclaimed_bytes = reclaimed, "pruned unused images");
        } else {
            debug!("image prune reclaimed nothing");
        }
        Ok(reclaimed)
    }
}
