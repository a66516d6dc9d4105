use crate::constants::{MM_PER_INCH, mm_to_pt};
use crate::fetch::FetchError;
use crate::map::MapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error(
        "Requested resolution {requested} is finer than the print view supports (minimum {minimum})"
    )]
    UnreachableResolution { requested: f64, minimum: f64 },
    #[error("Map error: {0}")]
    Map(#[from] MapError),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, PrintError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Portrait: height > width
    Portrait,
    /// Landscape: width > height (default for map prints)
    #[default]
    Landscape,
}

/// ISO 216 A-series paper formats offered for map export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PaperFormat {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
}

impl PaperFormat {
    /// Get base dimensions (always portrait: width < height)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperFormat::A0 => (841.0, 1189.0),
            PaperFormat::A1 => (594.0, 841.0),
            PaperFormat::A2 => (420.0, 594.0),
            PaperFormat::A3 => (297.0, 420.0),
            PaperFormat::A4 => (210.0, 297.0),
            PaperFormat::A5 => (148.0, 210.0),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Page size in PDF points with orientation applied
    pub fn dimensions_pt(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_with_orientation(orientation);
        (mm_to_pt(w), mm_to_pt(h))
    }

    /// Pixel size of the paper at the given resolution.
    ///
    /// This is the size the map canvas is set to while printing.
    pub fn pixel_size(self, orientation: Orientation, dpi: u32) -> Size {
        let (w, h) = self.dimensions_with_orientation(orientation);
        let px = |mm: f32| (f64::from(mm) * f64::from(dpi) / MM_PER_INCH).round() as u32;
        Size::new(px(w), px(h))
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
        }
    }
}

/// Corner of the page an overlay is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Placement {
    BottomLeft,
    BottomRight,
    TopRight,
}

/// Requested output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum OutputType {
    /// Vector PDF document, saved to disk
    #[default]
    Pdf,
    /// Rasterized page, saved to disk as PNG
    Png,
    /// Rasterized page returned to the caller only
    Blob,
}

impl OutputType {
    /// Whether the PDF page gets rasterized after serialization
    pub fn is_raster(self) -> bool {
        matches!(self, OutputType::Png | OutputType::Blob)
    }

    /// File extension used when the output is written to disk
    pub fn extension(self) -> &'static str {
        match self {
            OutputType::Pdf => "pdf",
            OutputType::Png | OutputType::Blob => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputType::Pdf => "application/pdf",
            OutputType::Png | OutputType::Blob => "image/png",
        }
    }
}

/// Pixel dimensions of a map canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 8-bit RGB color, parsed from `#rrggbb` / `#rgb` strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn parse_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || PrintError::Config(format!("Invalid color '{}'", value));
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        if !hex.is_ascii() {
            return Err(invalid());
        }

        match hex.len() {
            6 => Ok(Color {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Ok(Color {
                    r: expand(&hex[0..1])?,
                    g: expand(&hex[1..2])?,
                    b: expand(&hex[2..3])?,
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Components as PDF color operands (0.0..=1.0)
    pub fn to_pdf_components(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(px: image::Rgba<u8>) -> Self {
        Color {
            r: px[0],
            g: px[1],
            b: px[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_landscape_pixel_size_at_72_dpi() {
        let size = PaperFormat::A4.pixel_size(Orientation::Landscape, 72);
        assert_eq!(size, Size::new(842, 595));
    }

    #[test]
    fn test_portrait_swaps_dimensions() {
        let size = PaperFormat::A3.pixel_size(Orientation::Portrait, 150);
        assert_eq!(size.width, (297.0_f64 * 150.0 / 25.4).round() as u32);
        assert_eq!(size.height, (420.0_f64 * 150.0 / 25.4).round() as u32);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            Color::parse_hex("#ff8000").unwrap(),
            Color {
                r: 255,
                g: 128,
                b: 0
            }
        );
        assert_eq!(Color::parse_hex("fff").unwrap(), Color::WHITE);
        assert!(Color::parse_hex("#12").is_err());
        assert!(Color::parse_hex("#gggggg").is_err());
    }
}
