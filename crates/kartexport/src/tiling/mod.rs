//! Tiling of image requests that exceed the server's size limit
//!
//! - `planner`: pure grid partitioning and bounding box interpolation
//! - `compositor`: concurrent tile fetching onto one raster

mod compositor;
mod planner;

pub use compositor::{TileComposite, TileJob, composite_tiles};
pub use planner::{TileDescriptor, plan_tiles};

use crate::wms::WmsRequest;

/// Plan a request and attach a fetchable URL to every tile
pub fn plan_request(
    request: &WmsRequest,
    axis_order: crate::wms::AxisOrder,
    max_tile_size: u32,
) -> crate::types::Result<Vec<TileJob>> {
    let tiles = plan_tiles(
        request.width,
        request.height,
        request.bbox,
        axis_order,
        max_tile_size,
    )?;

    Ok(tiles
        .into_iter()
        .map(|tile| TileJob {
            url: request.with_extent(tile.width, tile.height, tile.bbox).url(),
            tile,
        })
        .collect())
}
