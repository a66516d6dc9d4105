//! Assembly of tiled sub-requests into one raster

use super::planner::TileDescriptor;
use crate::cancel::CancelToken;
use crate::fetch::{FetchError, ImageFetcher};
use futures::future::join_all;
use image::{RgbaImage, imageops};

/// A planned tile together with the URL that fetches it
#[derive(Debug, Clone, PartialEq)]
pub struct TileJob {
    pub tile: TileDescriptor,
    pub url: String,
}

/// Result of compositing a tiled request
#[derive(Debug, Clone)]
pub struct TileComposite {
    pub image: RgbaImage,
    /// Number of tiles whose fetch failed and were left blank
    pub failed: usize,
    pub total: usize,
}

impl TileComposite {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Fetch every tile concurrently and draw it at its offset.
///
/// Completes only after all fetches have settled. A failed tile leaves its
/// region transparent instead of failing the whole composite; the number of
/// such tiles is reported in [`TileComposite::failed`]. Cancellation discards
/// whatever is still in flight.
pub async fn composite_tiles(
    fetcher: &dyn ImageFetcher,
    width: u32,
    height: u32,
    jobs: &[TileJob],
    cancel: &CancelToken,
) -> Result<TileComposite, FetchError> {
    let fetches = jobs.iter().map(|job| async move {
        let result = fetcher.fetch(&job.url).await;
        (job, result)
    });

    let settled = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        settled = join_all(fetches) => settled,
    };

    let mut canvas = RgbaImage::new(width, height);
    let mut failed = 0;

    for (job, result) in settled {
        match result {
            Ok(tile_image) => {
                let tile = &job.tile;
                let mut rgba = tile_image.to_rgba8();
                if rgba.dimensions() != (tile.width, tile.height) {
                    log::debug!(
                        "Tile at ({}, {}) returned {:?}, expected {}x{}; resampling",
                        tile.x_offset,
                        tile.y_offset,
                        rgba.dimensions(),
                        tile.width,
                        tile.height
                    );
                    rgba = imageops::resize(
                        &rgba,
                        tile.width,
                        tile.height,
                        imageops::FilterType::Triangle,
                    );
                }
                imageops::replace(
                    &mut canvas,
                    &rgba,
                    i64::from(tile.x_offset),
                    i64::from(tile.y_offset),
                );
            }
            Err(e) => {
                log::warn!("Tile {} failed to load: {}", job.url, e);
                failed += 1;
            }
        }
    }

    Ok(TileComposite {
        image: canvas,
        failed,
        total: jobs.len(),
    })
}
