//! Tile grid planning for oversized image requests
//!
//! A request larger than the server's maximum image size is split into a
//! grid of sub-requests. Columns run left to right, rows bottom to top,
//! and every tile gets a bounding box interpolated from the full request.

use crate::types::{PrintError, Result};
use crate::wms::AxisOrder;

/// One sub-request, in canvas pixel space (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDescriptor {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
    /// Bounding box in the same axis order as the full request
    pub bbox: [f64; 4],
}

impl TileDescriptor {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

// =============================================================================
// Grid Creation
// =============================================================================

/// Partition a `width × height` request into tiles no larger than `max_tile_size`.
///
/// # Arguments
/// * `width` - Target width of the full request in pixels
/// * `height` - Target height of the full request in pixels
/// * `bbox` - Bounding box of the full request, as sent on the wire
/// * `axis_order` - Axis order of `bbox` (see [`AxisOrder::for_version`])
/// * `max_tile_size` - Maximum tile edge length in pixels
pub fn plan_tiles(
    width: u32,
    height: u32,
    bbox: [f64; 4],
    axis_order: AxisOrder,
    max_tile_size: u32,
) -> Result<Vec<TileDescriptor>> {
    if max_tile_size == 0 {
        return Err(PrintError::Config(
            "Maximum tile size must be greater than zero".to_string(),
        ));
    }

    let rates = PixelRates::new(width, height, bbox, axis_order);
    let mut tiles = Vec::new();

    let mut covered_width = 0;
    while covered_width < width {
        let tile_width = (width - covered_width).min(max_tile_size);

        let mut covered_height = 0;
        while covered_height < height {
            let tile_height = (height - covered_height).min(max_tile_size);
            let y_offset = height - covered_height - tile_height;

            tiles.push(TileDescriptor {
                x_offset: covered_width,
                y_offset,
                width: tile_width,
                height: tile_height,
                bbox: rates.tile_bbox(covered_width, y_offset, tile_width, tile_height),
            });

            covered_height += tile_height;
        }

        covered_width += tile_width;
    }

    Ok(tiles)
}

// =============================================================================
// Bounding Box Interpolation
// =============================================================================

/// Map units per pixel along both axes of the full request
struct PixelRates {
    bbox: [f64; 4],
    height: f64,
    northing_per_px: f64,
    easting_per_px: f64,
    axis_order: AxisOrder,
}

impl PixelRates {
    fn new(width: u32, height: u32, bbox: [f64; 4], axis_order: AxisOrder) -> Self {
        let (width, height) = (f64::from(width), f64::from(height));
        let (northing_per_px, easting_per_px) = match axis_order {
            AxisOrder::Neu => ((bbox[2] - bbox[0]) / height, (bbox[3] - bbox[1]) / width),
            AxisOrder::Enu => ((bbox[3] - bbox[1]) / height, (bbox[2] - bbox[0]) / width),
        };
        Self {
            bbox,
            height,
            northing_per_px,
            easting_per_px,
            axis_order,
        }
    }

    fn tile_bbox(&self, x: u32, y: u32, w: u32, h: u32) -> [f64; 4] {
        let (x, y, w, h) = (f64::from(x), f64::from(y), f64::from(w), f64::from(h));
        let bbox = &self.bbox;
        let bottom = self.height - y - h;
        let top = self.height - y;

        match self.axis_order {
            AxisOrder::Neu => [
                bbox[0] + self.northing_per_px * bottom,
                bbox[1] + self.easting_per_px * x,
                bbox[0] + self.northing_per_px * top,
                bbox[1] + self.easting_per_px * (x + w),
            ],
            AxisOrder::Enu => [
                bbox[0] + self.easting_per_px * x,
                bbox[1] + self.northing_per_px * bottom,
                bbox[0] + self.easting_per_px * (x + w),
                bbox[1] + self.northing_per_px * top,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_request_is_single_tile() {
        let bbox = [0.0, 0.0, 100.0, 50.0];
        let tiles = plan_tiles(200, 100, bbox, AxisOrder::Enu, 4096).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].x_offset, 0);
        assert_eq!(tiles[0].y_offset, 0);
        assert_eq!(tiles[0].bbox, bbox);
    }

    #[test]
    fn test_rows_run_bottom_to_top() {
        let tiles = plan_tiles(100, 250, [0.0, 0.0, 100.0, 250.0], AxisOrder::Enu, 100).unwrap();
        let offsets: Vec<(u32, u32)> = tiles.iter().map(|t| (t.y_offset, t.height)).collect();
        assert_eq!(offsets, vec![(150, 100), (50, 100), (0, 50)]);

        // The bottom tile covers the southern end of the extent
        assert_eq!(tiles[0].bbox, [0.0, 0.0, 100.0, 100.0]);
        assert_eq!(tiles[2].bbox, [0.0, 200.0, 100.0, 250.0]);
    }

    #[test]
    fn test_neu_interpolates_northing_first() {
        // 1.3.0 style: [miny, minx, maxy, maxx]
        let tiles = plan_tiles(256, 128, [48.0, 0.0, 52.0, 8.0], AxisOrder::Neu, 128).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].bbox, [48.0, 0.0, 52.0, 4.0]);
        assert_eq!(tiles[1].bbox, [48.0, 4.0, 52.0, 8.0]);
    }

    #[test]
    fn test_zero_max_tile_size_is_rejected() {
        assert!(plan_tiles(10, 10, [0.0; 4], AxisOrder::Enu, 0).is_err());
    }

    #[test]
    fn test_empty_request_has_no_tiles() {
        let tiles = plan_tiles(0, 10, [0.0; 4], AxisOrder::Enu, 8).unwrap();
        assert!(tiles.is_empty());
    }
}
