//! Page rendering
//!
//! This module provides the drawing primitives the print pipeline builds
//! documents with:
//! - `surface`: the [`DrawingSurface`] trait and its PDF implementation
//! - `scale_bar`: scale bar layout and drawing
//! - `raster`: conversion of finished PDFs into bitmaps

mod raster;
mod scale_bar;
mod surface;

pub use raster::{PageRasterizer, encode_png};
#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
pub use raster::{PdfiumRasterizer, init_pdfium};
pub use scale_bar::{ScaleBarSpec, fitting_scale_bar_length, render_scale_bar};
pub use surface::{DrawingSurface, PathStyle, PdfSurface, Point, TextAlign, encode_pdf};
