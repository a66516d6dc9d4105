//! Shared constants for map printing
//!
//! This module centralizes magic numbers and constants used throughout
//! the print pipeline.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Meters per inch, used for scale ⇄ resolution conversion
pub const METERS_PER_INCH: f64 = 0.0254;

/// PDF points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Map resolution (map units per pixel) needed to print at `scale` and `dpi`
#[inline]
pub fn resolution_for_scale(scale: f64, dpi: u32, meters_per_unit: f64) -> f64 {
    scale * METERS_PER_INCH / (f64::from(dpi) * meters_per_unit)
}

// =============================================================================
// Tiling & Compositing
// =============================================================================

/// Default maximum edge length of a single WMS image request (pixels)
pub const DEFAULT_MAX_TILE_SIZE: u32 = 2048;

/// Default pause between render completion and canvas capture (ms)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// Default finest resolution the print view accepts (map units per pixel)
pub const DEFAULT_MIN_PRINT_RESOLUTION: f64 = 0.001;

/// Highest DPI a job may request
pub const MAX_PRINT_DPI: u32 = 1200;

/// Largest print canvas a job may request, in pixels (about 1 GB as RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 250_000_000;

// =============================================================================
// Page Furnishing
// =============================================================================

/// Margin width as a fraction of the paper diagonal
pub const MARGIN_DIAGONAL_FACTOR: f32 = 0.015;

/// How much wider the top and bottom margins are in text/icons mode
pub const TEXT_MARGIN_FACTOR: f32 = 3.0;

/// Paper diagonal of A4 in points; furnishing sizes are scaled relative to it
pub const A4_DIAGONAL_PT: f32 = 1031.1;

/// Padding between overlays and the map edge / each other (points)
pub const OVERLAY_PADDING: f32 = 6.0;

/// Edge length of the QR code on A4 (points)
pub const QR_CODE_SIZE: f32 = 56.0;

/// Height of the logo on A4 (points)
pub const LOGO_HEIGHT: f32 = 36.0;

/// Height of the north arrow on A4 (points)
pub const NORTH_ARROW_HEIGHT: f32 = 40.0;

/// Title font size on A4 (points)
pub const TITLE_FONT_SIZE: f32 = 18.0;

/// Comment font size on A4 (points)
pub const COMMENT_FONT_SIZE: f32 = 11.0;

/// Date/copyright/disclaimer font size on A4 (points)
pub const FOOTER_FONT_SIZE: f32 = 7.0;

/// Line spacing as a multiple of the font size
pub const LINE_SPACING: f32 = 1.3;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Backdrop opacity drawn behind overlays placed on top of the map
pub const OVERLAY_BACKDROP_ALPHA: f32 = 0.8;

// =============================================================================
// Scale Bar
// =============================================================================

/// Curated scale bar lengths in meters, keyed by scale denominator
pub const SCALE_BAR_LENGTHS: &[(u64, f64)] = &[
    (200, 10.0),
    (500, 50.0),
    (1_000, 100.0),
    (2_000, 200.0),
    (2_500, 250.0),
    (5_000, 500.0),
    (10_000, 1_000.0),
    (15_000, 1_000.0),
    (20_000, 2_000.0),
    (25_000, 2_000.0),
    (50_000, 5_000.0),
    (100_000, 10_000.0),
    (200_000, 20_000.0),
    (250_000, 20_000.0),
    (500_000, 50_000.0),
    (1_000_000, 100_000.0),
];

/// Line width of the scale bar baseline and caps (points)
pub const SCALE_BAR_LINE_WIDTH: f32 = 1.0;

/// Height of the scale bar end caps (points)
pub const SCALE_BAR_CAP_HEIGHT: f32 = 8.0;

/// Height of the division ticks (points)
pub const SCALE_BAR_TICK_HEIGHT: f32 = 5.0;

/// Height of the one-fifth subdivision tick (points)
pub const SCALE_BAR_SUBTICK_HEIGHT: f32 = 3.0;

/// Font size of scale bar labels (points)
pub const SCALE_BAR_FONT_SIZE: f32 = 7.0;

/// Minimum room before the first tick to draw the subdivision tick (points)
pub const SCALE_BAR_MIN_SUBDIVISION_ROOM: f32 = 30.0;

// =============================================================================
// Rasterization
// =============================================================================

/// Rasterization multiplier for the requested DPI
pub fn raster_scale_for_dpi(dpi: u32) -> u32 {
    match dpi {
        72 => 1,
        150 => 2,
        300 => 3,
        _ => 3,
    }
}
