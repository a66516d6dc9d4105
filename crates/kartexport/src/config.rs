//! Pipeline configuration shared by all print jobs
//!
//! Unlike [`PrintJobOptions`](crate::PrintJobOptions), these settings belong to
//! the deployment (server limits, branding assets, output location) and rarely
//! change between jobs.

use crate::constants::*;
use crate::types::*;
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrintConfig {
    /// Largest edge (pixels) a single WMS request may have before it is tiled
    pub max_tile_size: u32,
    /// Pause between render completion and canvas capture
    pub settle_delay_ms: u64,
    /// Finest resolution (map units per pixel) the print view accepts
    pub min_print_resolution: f64,
    /// Location of the logo image (URL or local path)
    pub logo_url: Option<String>,
    /// Location of the north arrow image (URL or local path)
    pub north_arrow_url: Option<String>,
    /// Directory saved files go to; the working directory when unset
    pub output_dir: Option<PathBuf>,
    /// File name prefix of saved exports
    pub file_prefix: String,
    /// `chrono` format string of the timestamp in saved file names
    pub timestamp_format: String,
    /// Canvas background used when the map does not report one
    pub background: String,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            max_tile_size: DEFAULT_MAX_TILE_SIZE,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            min_print_resolution: DEFAULT_MIN_PRINT_RESOLUTION,
            logo_url: None,
            north_arrow_url: None,
            output_dir: None,
            file_prefix: "Kartexport".to_string(),
            timestamp_format: "%d.%m.%Y %H-%M-%S".to_string(),
            background: "#ffffff".to_string(),
        }
    }
}

impl PrintConfig {
    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config = serde_json::from_slice(&bytes)
            .map_err(|e| PrintError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PrintError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tile_size == 0 {
            return Err(PrintError::Config(
                "max_tile_size must be greater than zero".to_string(),
            ));
        }
        if self.min_print_resolution.is_nan() || self.min_print_resolution <= 0.0 {
            return Err(PrintError::Config(
                "min_print_resolution must be positive".to_string(),
            ));
        }
        Color::parse_hex(&self.background)?;
        let invalid =
            StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error));
        if invalid {
            return Err(PrintError::Config(format!(
                "Invalid timestamp_format '{}'",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn background_color(&self) -> Color {
        Color::parse_hex(&self.background).unwrap_or(Color::WHITE)
    }

    /// File name for an export finished at `timestamp`
    pub fn file_name(
        &self,
        timestamp: &chrono::DateTime<chrono::Local>,
        output: OutputType,
    ) -> Result<String> {
        let mut name = String::new();
        write!(
            name,
            "{} - {}.{}",
            self.file_prefix,
            timestamp.format(&self.timestamp_format),
            output.extension()
        )
        .map_err(|_| {
            PrintError::Config(format!(
                "Cannot format timestamp with '{}'",
                self.timestamp_format
            ))
        })?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_uses_prefix_and_extension() {
        let config = PrintConfig::default();
        let ts = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap();
        assert_eq!(
            config.file_name(&ts, OutputType::Pdf).unwrap(),
            "Kartexport - 09.03.2024 14-05-07.pdf"
        );
        assert!(
            config
                .file_name(&ts, OutputType::Blob)
                .unwrap()
                .ends_with(".png")
        );
    }

    #[test]
    fn test_unknown_timestamp_specifier_rejected() {
        let config = PrintConfig {
            timestamp_format: "%d.%m.%Y %Q".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PrintError::Config(_))));

        let ts = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap();
        assert!(matches!(
            config.file_name(&ts, OutputType::Pdf),
            Err(PrintError::Config(_))
        ));
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let config = PrintConfig {
            max_tile_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PrintError::Config(_))));
    }
}
