use crate::constants::{MAX_CANVAS_PIXELS, MAX_PRINT_DPI};
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An optional page furnishing and the corner it is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Overlay {
    pub enabled: bool,
    pub placement: Placement,
}

impl Overlay {
    pub const fn new(enabled: bool, placement: Placement) -> Self {
        Self { enabled, placement }
    }

    /// Placement if the overlay is drawn at all
    pub fn active_placement(&self) -> Option<Placement> {
        self.enabled.then_some(self.placement)
    }
}

/// Everything one print job needs to know
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrintJobOptions {
    // Paper
    pub format: PaperFormat,
    pub orientation: Orientation,
    /// Print resolution in dots per inch
    pub resolution: u32,
    /// Map scale denominator (1:`scale`)
    pub scale: f64,

    // Margin
    pub use_margin: bool,
    /// Only meaningful together with `use_margin`
    pub use_text_icons_in_margin: bool,

    // Furnishings
    pub logo: Overlay,
    pub north_arrow: Overlay,
    pub scale_bar: Overlay,
    pub qr_code: Overlay,

    // Text
    pub map_title: String,
    pub print_comment: String,
    pub date_text: String,
    pub copyright: String,
    pub disclaimer: String,
    pub map_text_color: String,

    // Output
    pub save_as: OutputType,
}

impl Default for PrintJobOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            orientation: Orientation::Landscape,
            resolution: 150,
            scale: 10_000.0,
            use_margin: true,
            use_text_icons_in_margin: false,
            logo: Overlay::new(false, Placement::BottomLeft),
            north_arrow: Overlay::new(false, Placement::TopRight),
            scale_bar: Overlay::new(true, Placement::BottomLeft),
            qr_code: Overlay::new(false, Placement::BottomRight),
            map_title: String::new(),
            print_comment: String::new(),
            date_text: String::new(),
            copyright: String::new(),
            disclaimer: String::new(),
            map_text_color: "#000000".to_string(),
            save_as: OutputType::Pdf,
        }
    }
}

impl PrintJobOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| PrintError::Config(format!("Failed to parse job options: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PrintError::Config(format!("Failed to serialize job options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 || self.resolution > MAX_PRINT_DPI {
            return Err(PrintError::Config(format!(
                "Resolution must be between 1 and {} dpi, got {}",
                MAX_PRINT_DPI, self.resolution
            )));
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PrintError::Config(format!(
                "Scale must be a positive number, got {}",
                self.scale
            )));
        }

        let size = self.target_size();
        if u64::from(size.width) * u64::from(size.height) > MAX_CANVAS_PIXELS {
            return Err(PrintError::Config(format!(
                "{} at {} dpi needs a {}x{} canvas, above the limit of {} pixels",
                self.format.name(),
                self.resolution,
                size.width,
                size.height,
                MAX_CANVAS_PIXELS
            )));
        }

        Color::parse_hex(&self.map_text_color)?;

        Ok(())
    }

    /// Parsed text color
    pub fn text_color(&self) -> Color {
        Color::parse_hex(&self.map_text_color).unwrap_or(Color::BLACK)
    }

    /// Whether titles, footer text and overlays move into a widened margin
    pub fn text_in_margin(&self) -> bool {
        self.use_margin && self.use_text_icons_in_margin
    }

    /// Pixel size of the print canvas
    pub fn target_size(&self) -> Size {
        self.format.pixel_size(self.orientation, self.resolution)
    }

    /// Overlays anchored to `placement`, in drawing order
    pub fn overlays_at(&self, placement: Placement) -> Vec<OverlayKind> {
        [
            (OverlayKind::ScaleBar, self.scale_bar),
            (OverlayKind::Logo, self.logo),
            (OverlayKind::NorthArrow, self.north_arrow),
            (OverlayKind::QrCode, self.qr_code),
        ]
        .into_iter()
        .filter(|(_, overlay)| overlay.active_placement() == Some(placement))
        .map(|(kind, _)| kind)
        .collect()
    }
}

/// The page furnishings that can be anchored to a corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    ScaleBar,
    Logo,
    NorthArrow,
    QrCode,
}
