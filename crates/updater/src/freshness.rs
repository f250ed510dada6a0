//! Image freshness checking.
//!
//! A container is stale when pulling its image reference resolves to a
//! different image id than the one it is running. The check pulls first
//! and compares ids afterwards, so the comparison always reflects what
//! the registry serves right now.
//!
//! In dry-run mode no pull happens at all; every image is reported as
//! newer with a sentinel id, which lets a dry-run pass exercise the full
//! decision path without touching the Docker daemon.

use tracing::debug;

use crate::docker::DockerClient;
use crate::error::UpdaterError;

/// Image id reported for every container in dry-run mode.
pub const SIMULATED_IMAGE_ID: &str = "simulated";

/// Result of a freshness check for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessReport {
    /// Image reference that was checked.
    pub image: String,
    /// Image id the reference resolves to (sentinel in dry-run).
    pub latest_id: String,
    /// Whether the resolved id differs from the running one.
    pub newer: bool,
}

/// Checks whether an image reference has a newer id than a running
/// container uses.
#[derive(Debug, Clone)]
pub struct FreshnessChecker {
    dry_run: bool,
}

impl FreshnessChecker {
    /// Creates a checker; in dry-run mode it never pulls.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Checks `image` against the id a running container uses.
    ///
    /// In dry-run mode this returns `newer: true` with
    /// [`SIMULATED_IMAGE_ID`] without calling Docker. Otherwise the image
    /// is pulled and its resolved id compared to `current_id`.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::ImagePull` if the live pull fails.
    pub async fn check<C: DockerClient>(
        &self,
        client: &C,
        image: &str,
        current_id: &str,
    ) -> Result<FreshnessReport, UpdaterError> {
        if self.dry_run {
            debug!(image, "dry-run: simulating newer image");
            return Ok(FreshnessReport {
                image: image.to_owned(),
                latest_id: SIMULATED_IMAGE_ID.to_owned(),
                newer: true,
            });
        }

        let latest_id = client.pull_image(image).await?;
        let newer = latest_id != current_id;
        debug!(image, %latest_id, newer, "image freshness checked");

        Ok(FreshnessReport {
            image: image.to_owned(),
            latest_id,
            newer,
        })
    }
}
