//! PDF to bitmap conversion for PNG and blob output

use crate::types::Result;
use image::RgbaImage;

/// Renders the first page of a serialized PDF into a bitmap.
///
/// Called from a blocking task; implementations may do heavy synchronous work.
pub trait PageRasterizer: Send + Sync {
    /// `scale` multiplies the page size in points (1 = 72 dpi)
    fn rasterize(&self, pdf: &[u8], scale: u32) -> Result<RgbaImage>;
}

#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
pub use pdfium::{PdfiumRasterizer, init_pdfium};

#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
mod pdfium {
    use super::PageRasterizer;
    use crate::types::{PrintError, Result};
    use image::RgbaImage;
    use pdfium_render::prelude::*;

    /// Bind Pdfium, trying the vendored library first, then the system one
    pub fn init_pdfium() -> std::result::Result<Pdfium, PdfiumError> {
        let vendor_path = std::env::current_dir().ok().and_then(|mut p| {
            p.push("vendor/pdfium/lib");
            if p.exists() { Some(p) } else { None }
        });

        if let Some(vendor_path) = vendor_path {
            if let Ok(binding) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&vendor_path))
            {
                return Ok(Pdfium::new(binding));
            }
        }

        Pdfium::bind_to_system_library().map(Pdfium::new)
    }

    /// Rasterizer backed by the Pdfium library
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PdfiumRasterizer;

    impl PdfiumRasterizer {
        pub fn new() -> Self {
            Self
        }
    }

    fn raster_error(e: PdfiumError) -> PrintError {
        PrintError::Encode(format!("Pdfium: {}", e))
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn rasterize(&self, pdf: &[u8], scale: u32) -> Result<RgbaImage> {
            let pdfium = init_pdfium().map_err(raster_error)?;
            let document = pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(raster_error)?;
            let page = document.pages().get(0).map_err(raster_error)?;

            let target_width = (page.width().value * scale as f32).round() as i32;
            let config = PdfRenderConfig::new().set_target_width(target_width);

            let bitmap = page.render_with_config(&config).map_err(raster_error)?;
            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;
            let rgba = bitmap.as_rgba_bytes().to_vec();

            log::debug!("Rasterized page at {}x: {}x{} px", scale, width, height);

            RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
                PrintError::Encode("Pdfium returned a bitmap of unexpected size".to_string())
            })
        }
    }
}

/// Encode a bitmap as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png)?;
    Ok(bytes.into_inner())
}
