//! Page layout of the exported document
//!
//! The captured map fills the whole page. Margins are painted over it as
//! white borders, then corner overlays and text are placed on top. All
//! furnishing sizes are given for A4 and scaled with the paper diagonal.

use super::assets::PageAssets;
use crate::constants::*;
use crate::events::AssetKind;
use crate::options::{OverlayKind, PrintJobOptions};
use crate::render::{
    DrawingSurface, PathStyle, PdfSurface, Point, ScaleBarSpec, TextAlign, render_scale_bar,
};
use crate::types::{Color, Placement, Result};
use image::RgbaImage;
use lopdf::Document;

/// Width of the white border on each page edge, in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Page geometry derived from the job options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
    /// Furnishing size relative to A4
    pub style_scale: f32,
    /// Whether text sits in widened top/bottom margins instead of on the map
    pub text_in_margin: bool,
}

impl PageLayout {
    pub fn new(options: &PrintJobOptions) -> Self {
        let (width, height) = options.format.dimensions_pt(options.orientation);
        let diagonal = width.hypot(height);

        let margins = if options.use_margin {
            let base = diagonal * MARGIN_DIAGONAL_FACTOR;
            let wide = if options.text_in_margin() {
                base * TEXT_MARGIN_FACTOR
            } else {
                base
            };
            Margins {
                left: base,
                right: base,
                top: wide,
                bottom: wide,
            }
        } else {
            Margins::default()
        };

        Self {
            width,
            height,
            margins,
            style_scale: diagonal / A4_DIAGONAL_PT,
            text_in_margin: options.text_in_margin(),
        }
    }

    /// Margin width for the session, before text/icons widening
    pub fn margin_pt(&self) -> f32 {
        self.margins.left
    }

    fn padding(&self) -> f32 {
        OVERLAY_PADDING * self.style_scale
    }

    fn map_left(&self) -> f32 {
        self.margins.left
    }

    fn map_right(&self) -> f32 {
        self.width - self.margins.right
    }

    fn map_bottom(&self) -> f32 {
        self.margins.bottom
    }

    fn map_top(&self) -> f32 {
        self.height - self.margins.top
    }
}

/// Build the one-page PDF for a captured map
pub fn build_document(
    options: &PrintJobOptions,
    map_image: &RgbaImage,
    assets: &PageAssets,
) -> Result<Document> {
    let layout = PageLayout::new(options);
    let mut surface = PdfSurface::new(layout.width, layout.height);
    if !options.map_title.is_empty() {
        surface.set_title(options.map_title.clone());
    }
    draw_page(&mut surface, &layout, options, map_image, assets)?;
    surface.finish()
}

/// Draw map, margins, overlays and text onto `surface`
pub fn draw_page(
    surface: &mut dyn DrawingSurface,
    layout: &PageLayout,
    options: &PrintJobOptions,
    map_image: &RgbaImage,
    assets: &PageAssets,
) -> Result<()> {
    surface.image(
        map_image,
        Point::new(0.0, 0.0),
        layout.width,
        layout.height,
    )?;

    if options.use_margin {
        draw_margins(surface, layout);
    }

    let color = options.text_color();
    let mut bottom_right_width = 0.0;
    for placement in [Placement::BottomLeft, Placement::BottomRight, Placement::TopRight] {
        let width = draw_corner(surface, layout, options, assets, placement, color)?;
        if placement == Placement::BottomRight {
            bottom_right_width = width;
        }
    }

    draw_title(surface, layout, options, color);
    draw_footer(surface, layout, options, bottom_right_width, color);
    Ok(())
}

fn draw_margins(surface: &mut dyn DrawingSurface, layout: &PageLayout) {
    let white = PathStyle::filled(Color::WHITE);
    let m = layout.margins;
    let (w, h) = (layout.width, layout.height);

    surface.rect(Point::new(0.0, 0.0), w, m.bottom, white);
    surface.rect(Point::new(0.0, h - m.top), w, m.top, white);
    surface.rect(Point::new(0.0, 0.0), m.left, h, white);
    surface.rect(Point::new(w - m.right, 0.0), m.right, h, white);
}

// =============================================================================
// Corner Overlays
// =============================================================================

/// An overlay resolved to something drawable, with its size in points
enum Item<'a> {
    /// Bar, style scale it is drawn at, width, height
    ScaleBar(ScaleBarSpec, f32, f32, f32),
    Image(&'a RgbaImage, f32, f32),
}

impl Item<'_> {
    fn size(&self) -> (f32, f32) {
        match self {
            Item::ScaleBar(_, _, w, h) | Item::Image(_, w, h) => (*w, *h),
        }
    }
}

fn resolve_item<'a>(
    kind: OverlayKind,
    style_scale: f32,
    options: &PrintJobOptions,
    assets: &'a PageAssets,
) -> Option<Item<'a>> {
    let s = style_scale;
    let scaled_to_height = |image: &'a RgbaImage, height: f32| {
        let aspect = image.width() as f32 / image.height().max(1) as f32;
        Item::Image(image, height * aspect, height)
    };

    match kind {
        OverlayKind::ScaleBar => {
            let spec = ScaleBarSpec::compute(options.scale);
            let (w, h) = spec.footprint(s);
            Some(Item::ScaleBar(spec, s, w, h))
        }
        OverlayKind::Logo => assets
            .get(AssetKind::Logo)
            .map(|image| scaled_to_height(image, LOGO_HEIGHT * s)),
        OverlayKind::NorthArrow => assets
            .get(AssetKind::NorthArrow)
            .map(|image| scaled_to_height(image, NORTH_ARROW_HEIGHT * s)),
        OverlayKind::QrCode => assets
            .get(AssetKind::QrCode)
            .map(|image| Item::Image(image, QR_CODE_SIZE * s, QR_CODE_SIZE * s)),
    }
}

/// Resolve an overlay no taller than `max_height`, shrinking it if needed
fn resolve_fitted<'a>(
    kind: OverlayKind,
    layout: &PageLayout,
    options: &PrintJobOptions,
    assets: &'a PageAssets,
    max_height: Option<f32>,
) -> Option<Item<'a>> {
    let item = resolve_item(kind, layout.style_scale, options, assets)?;
    let (_, h) = item.size();
    match max_height {
        Some(max) if h > max && max > 0.0 => {
            resolve_item(kind, layout.style_scale * max / h, options, assets)
        }
        _ => Some(item),
    }
}

/// Draw the overlays anchored to one corner side by side.
///
/// With text and icons in the margin, overlays are centered in the top or
/// bottom band instead of sitting on the map. Returns the horizontal room
/// they take up, padding included.
fn draw_corner(
    surface: &mut dyn DrawingSurface,
    layout: &PageLayout,
    options: &PrintJobOptions,
    assets: &PageAssets,
    placement: Placement,
    color: Color,
) -> Result<f32> {
    let pad = layout.padding();
    let band = match placement {
        Placement::BottomLeft | Placement::BottomRight => layout.margins.bottom,
        Placement::TopRight => layout.margins.top,
    };
    let max_height = layout.text_in_margin.then(|| band - pad);

    let items: Vec<Item<'_>> = options
        .overlays_at(placement)
        .into_iter()
        .filter_map(|kind| resolve_fitted(kind, layout, options, assets, max_height))
        .collect();
    if items.is_empty() {
        return Ok(0.0);
    }

    let backdrop = PathStyle::filled(Color::WHITE).with_alpha(OVERLAY_BACKDROP_ALPHA);
    let mut used = pad;

    for item in &items {
        let (w, h) = item.size();
        let x = match placement {
            Placement::BottomLeft => layout.map_left() + used,
            Placement::BottomRight | Placement::TopRight => layout.map_right() - used - w,
        };
        let y = match (placement, layout.text_in_margin) {
            (Placement::BottomLeft | Placement::BottomRight, false) => layout.map_bottom() + pad,
            (Placement::TopRight, false) => layout.map_top() - pad - h,
            (Placement::BottomLeft | Placement::BottomRight, true) => (band - h) / 2.0,
            (Placement::TopRight, true) => layout.height - band + (band - h) / 2.0,
        };

        if !layout.text_in_margin {
            let half = pad / 2.0;
            surface.rect(
                Point::new(x - half, y - half),
                w + pad,
                h + pad,
                backdrop,
            );
        }

        match item {
            Item::ScaleBar(spec, style_scale, _, _) => {
                let (left, _) = spec.label_overhang(*style_scale);
                render_scale_bar(surface, spec, Point::new(x + left, y), *style_scale, color);
            }
            Item::Image(image, w, h) => surface.image(image, Point::new(x, y), *w, *h)?,
        }

        used += w + pad;
    }

    Ok(used)
}

// =============================================================================
// Text
// =============================================================================

fn draw_title(
    surface: &mut dyn DrawingSurface,
    layout: &PageLayout,
    options: &PrintJobOptions,
    color: Color,
) {
    let title = options.map_title.trim();
    let comment = options.print_comment.trim();
    if title.is_empty() && comment.is_empty() {
        return;
    }

    let s = layout.style_scale;
    let title_size = TITLE_FONT_SIZE * s;
    let comment_size = COMMENT_FONT_SIZE * s;
    let center = layout.width / 2.0;

    let mut lines: Vec<(&str, f32)> = Vec::new();
    if !title.is_empty() {
        lines.push((title, title_size));
    }
    if !comment.is_empty() {
        lines.push((comment, comment_size));
    }
    let block_height: f32 = lines.iter().map(|(_, size)| size * LINE_SPACING).sum();

    // Baseline of the first line
    let mut y = if layout.text_in_margin {
        let band = layout.margins.top;
        layout.height - (band - block_height) / 2.0 - lines[0].1
    } else {
        let pad = layout.padding();
        let top = layout.map_top() - pad;
        let width = lines
            .iter()
            .map(|(text, size)| surface.text_width(text, *size))
            .fold(0.0, f32::max);
        surface.rect(
            Point::new(center - width / 2.0 - pad, top - block_height - pad / 2.0),
            width + 2.0 * pad,
            block_height + pad,
            PathStyle::filled(Color::WHITE).with_alpha(OVERLAY_BACKDROP_ALPHA),
        );
        top - lines[0].1
    };

    for (text, size) in lines {
        surface.text(text, Point::new(center, y), size, TextAlign::Center, color);
        y -= size * LINE_SPACING;
    }
}

/// Date, copyright and disclaimer, right-aligned and stacked upwards
fn draw_footer(
    surface: &mut dyn DrawingSurface,
    layout: &PageLayout,
    options: &PrintJobOptions,
    bottom_right_width: f32,
    color: Color,
) {
    let lines: Vec<&str> = [&options.date_text, &options.copyright, &options.disclaimer]
        .into_iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    if lines.is_empty() {
        return;
    }

    let size = FOOTER_FONT_SIZE * layout.style_scale;
    let pad = layout.padding();
    let x = layout.map_right() - pad - bottom_right_width;
    let line_height = size * LINE_SPACING;
    let block_height = line_height * lines.len() as f32;

    let mut y = if layout.text_in_margin {
        ((layout.margins.bottom - block_height) / 2.0).max(0.0) + block_height - size
    } else {
        let width = lines
            .iter()
            .map(|text| surface.text_width(text, size))
            .fold(0.0, f32::max);
        let bottom = layout.map_bottom() + pad;
        surface.rect(
            Point::new(x - width - pad / 2.0, bottom - pad / 2.0),
            width + pad,
            block_height + pad / 2.0,
            PathStyle::filled(Color::WHITE).with_alpha(OVERLAY_BACKDROP_ALPHA),
        );
        bottom + block_height - size
    };

    for text in lines {
        surface.text(text, Point::new(x, y), size, TextAlign::Right, color);
        y -= line_height;
    }
}
