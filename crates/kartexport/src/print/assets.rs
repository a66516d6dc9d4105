//! Images placed on the page next to the map
//!
//! Each asset loads independently. A failure only drops that asset from the
//! page and is reported as [`PrintEvent::ErrorLoadingImage`].

use crate::config::PrintConfig;
use crate::events::{AssetKind, EventSender, PrintEvent, notify};
use crate::fetch::ImageFetcher;
use crate::options::PrintJobOptions;
use image::{Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};

/// Modules of white border around a QR code
const QR_QUIET_ZONE: usize = 4;

/// Pixels per QR module
const QR_MODULE_PX: usize = 8;

/// Successfully loaded page images
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    pub logo: Option<RgbaImage>,
    pub north_arrow: Option<RgbaImage>,
    pub qr_code: Option<RgbaImage>,
}

impl PageAssets {
    pub fn get(&self, kind: AssetKind) -> Option<&RgbaImage> {
        match kind {
            AssetKind::Logo => self.logo.as_ref(),
            AssetKind::NorthArrow => self.north_arrow.as_ref(),
            AssetKind::QrCode => self.qr_code.as_ref(),
        }
    }
}

/// Load every enabled asset, concurrently
pub async fn load_assets(
    fetcher: &dyn ImageFetcher,
    config: &PrintConfig,
    options: &PrintJobOptions,
    permalink: Option<&str>,
    events: Option<&EventSender>,
) -> PageAssets {
    let logo = async {
        if !options.logo.enabled {
            return None;
        }
        let result = match config.logo_url.as_deref() {
            Some(url) => fetch_asset(fetcher, url).await,
            None => Err("no logo configured".to_string()),
        };
        contain(result, AssetKind::Logo, events)
    };

    let north_arrow = async {
        if !options.north_arrow.enabled {
            return None;
        }
        let result = match config.north_arrow_url.as_deref() {
            Some(url) => fetch_asset(fetcher, url).await,
            None => Err("no north arrow configured".to_string()),
        };
        contain(result, AssetKind::NorthArrow, events)
    };

    let (logo, north_arrow) = futures::join!(logo, north_arrow);

    let qr_code = if options.qr_code.enabled {
        let result = match permalink {
            Some(link) => qr_code_image(link),
            None => Err("the map has no shareable link".to_string()),
        };
        contain(result, AssetKind::QrCode, events)
    } else {
        None
    };

    PageAssets {
        logo,
        north_arrow,
        qr_code,
    }
}

async fn fetch_asset(fetcher: &dyn ImageFetcher, url: &str) -> Result<RgbaImage, String> {
    fetcher
        .fetch(url)
        .await
        .map(|image| image.to_rgba8())
        .map_err(|e| e.to_string())
}

fn contain(
    result: Result<RgbaImage, String>,
    asset: AssetKind,
    events: Option<&EventSender>,
) -> Option<RgbaImage> {
    match result {
        Ok(image) => Some(image),
        Err(error) => {
            log::warn!("Could not load {}: {}", asset, error);
            notify(events, PrintEvent::ErrorLoadingImage { error, asset });
            None
        }
    }
}

/// Render `data` as a black-on-white QR code bitmap
pub fn qr_code_image(data: &str) -> Result<RgbaImage, String> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| format!("QR code generation failed: {}", e))?;

    let modules = code.width();
    let colors = code.to_colors();
    let side = (modules + 2 * QR_QUIET_ZONE) * QR_MODULE_PX;
    let mut image = RgbaImage::from_pixel(side as u32, side as u32, Rgba([255, 255, 255, 255]));

    for (index, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let qx = index % modules + QR_QUIET_ZONE;
        let qy = index / modules + QR_QUIET_ZONE;
        for py in qy * QR_MODULE_PX..(qy + 1) * QR_MODULE_PX {
            for px in qx * QR_MODULE_PX..(qx + 1) * QR_MODULE_PX {
                image.put_pixel(px as u32, py as u32, Rgba([0, 0, 0, 255]));
            }
        }
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::options::Overlay;
    use crate::types::Placement;
    use futures::future::BoxFuture;
    use image::DynamicImage;
    use tokio::sync::mpsc;

    struct FailingFetcher;

    impl ImageFetcher for FailingFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DynamicImage, FetchError>> {
            Box::pin(async move {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            })
        }
    }

    #[test]
    fn test_qr_code_has_quiet_zone() {
        let image = qr_code_image("https://example.org/map#center=1,2").unwrap();
        assert_eq!(image.width(), image.height());
        assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        // Top-left finder pattern starts right after the quiet zone
        let corner = (QR_QUIET_ZONE * QR_MODULE_PX) as u32;
        assert_eq!(*image.get_pixel(corner, corner), Rgba([0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_failed_logo_is_reported_and_skipped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = PrintConfig {
            logo_url: Some("https://example.org/logo.png".to_string()),
            ..Default::default()
        };
        let options = PrintJobOptions {
            logo: Overlay::new(true, Placement::BottomLeft),
            qr_code: Overlay::new(true, Placement::BottomRight),
            ..Default::default()
        };

        let assets = load_assets(
            &FailingFetcher,
            &config,
            &options,
            Some("https://example.org/map"),
            Some(&tx),
        )
        .await;

        assert!(assets.logo.is_none());
        assert!(assets.qr_code.is_some());
        match rx.try_recv() {
            Ok(PrintEvent::ErrorLoadingImage { asset, .. }) => assert_eq!(asset, AssetKind::Logo),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
