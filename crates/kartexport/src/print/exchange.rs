//! Substitution of interactive WMS layers by print-tuned ones
//!
//! Interactive layers request images sized for the screen (tiles, hiDPI,
//! a ratio larger than the viewport). While printing, each visible WMS layer
//! is hidden and a single-image twin is inserted at the same draw-order index.
//! The twin requests exactly the print canvas at the print DPI, splitting the
//! request into tiles when it exceeds the server's size limit.

use super::session::{LayerSubstitution, MapMutation, PrintSession};
use crate::cancel::CancelToken;
use crate::events::{EventSender, PrintEvent, notify};
use crate::fetch::{FetchError, ImageFetcher};
use crate::map::{ImageLoader, LayerId, LayerSource, LayerSpec, MapHost, Projection, WmsSource};
use crate::tiling::{composite_tiles, plan_request};
use crate::wms::WmsRequest;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Print Image Loading
// =============================================================================

/// Image loading routine installed on print layers
pub struct PrintImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    dpi: u32,
    max_tile_size: u32,
    projection: Projection,
    layer_name: String,
    cancel: CancelToken,
    events: Option<EventSender>,
}

impl fmt::Debug for PrintImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintImageLoader")
            .field("dpi", &self.dpi)
            .field("max_tile_size", &self.max_tile_size)
            .field("layer_name", &self.layer_name)
            .finish_non_exhaustive()
    }
}

impl PrintImageLoader {
    /// Add the resolution hints understood by QGIS, MapServer and GeoServer
    pub fn prepare_request(&self, request: &WmsRequest) -> WmsRequest {
        let mut request = request.clone();
        let dpi = self.dpi.to_string();
        request.set_param("DPI", dpi.clone());
        request.set_param("MAP_RESOLUTION", dpi);
        request.set_param("FORMAT_OPTIONS", format!("dpi:{}", self.dpi));
        request
    }

    fn needs_tiling(&self, request: &WmsRequest) -> bool {
        request.width > self.max_tile_size || request.height > self.max_tile_size
    }

    async fn load_tiled(&self, request: &WmsRequest) -> Result<RgbaImage, FetchError> {
        let axis_order = self.projection.wms_axis_order(request.version());
        let jobs = plan_request(request, axis_order, self.max_tile_size).map_err(|e| {
            FetchError::Request {
                url: request.base_url.clone(),
                message: e.to_string(),
            }
        })?;

        log::debug!(
            "Layer '{}': {}x{} exceeds {}px, fetching {} tiles",
            self.layer_name,
            request.width,
            request.height,
            self.max_tile_size,
            jobs.len()
        );

        let composite = composite_tiles(
            self.fetcher.as_ref(),
            request.width,
            request.height,
            &jobs,
            &self.cancel,
        )
        .await?;

        if !composite.is_complete() {
            log::warn!(
                "Layer '{}': {} of {} tiles failed, printing with gaps",
                self.layer_name,
                composite.failed,
                composite.total
            );
            notify(
                self.events.as_ref(),
                PrintEvent::TilesIncomplete {
                    layer: self.layer_name.clone(),
                    failed: composite.failed,
                    total: composite.total,
                },
            );
        }

        Ok(composite.image)
    }

    async fn load_single(&self, request: &WmsRequest) -> Result<RgbaImage, FetchError> {
        let url = request.url();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            image = self.fetcher.fetch(&url) => Ok(image?.to_rgba8()),
        }
    }
}

impl ImageLoader for PrintImageLoader {
    fn load<'a>(&'a self, request: &'a WmsRequest) -> BoxFuture<'a, Result<RgbaImage, FetchError>> {
        Box::pin(async move {
            let request = self.prepare_request(request);
            if self.needs_tiling(&request) {
                self.load_tiled(&request).await
            } else {
                self.load_single(&request).await
            }
        })
    }
}

// =============================================================================
// Layer Exchange
// =============================================================================

/// Swaps visible WMS layers for print layers and records each swap
pub struct LayerExchanger {
    fetcher: Arc<dyn ImageFetcher>,
    max_tile_size: u32,
    events: Option<EventSender>,
}

impl LayerExchanger {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        max_tile_size: u32,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            fetcher,
            max_tile_size: max_tile_size.max(1),
            events,
        }
    }

    /// Replace every visible tiled or single-image WMS layer.
    ///
    /// Returns the number of substitutions made. All changes are journaled
    /// in `session`; nothing here needs undoing by hand.
    pub fn exchange<M: MapHost + ?Sized>(
        &self,
        map: &mut M,
        session: &mut PrintSession,
        dpi: u32,
    ) -> usize {
        let candidates: Vec<LayerId> = map
            .layers()
            .iter()
            .filter(|layer| layer.is_printable_wms())
            .map(|layer| layer.id)
            .collect();

        let projection = map.view().projection.clone();

        for original_id in &candidates {
            let Some(index) = map.layer_index(*original_id) else {
                continue;
            };
            let original = map.layers()[index].clone();
            let Some(source) = original.source.wms() else {
                continue;
            };

            let replacement = LayerSpec {
                id: map.next_layer_id(),
                name: format!("{} (print)", original.name),
                visible: true,
                opacity: original.opacity,
                z_index: original.z_index,
                source: LayerSource::ImageWms(self.print_source(
                    source,
                    &original.name,
                    &projection,
                    dpi,
                    session.cancel_token().clone(),
                )),
            };
            let substitution = LayerSubstitution {
                original: original.id,
                replacement: replacement.id,
            };

            session.apply(map, MapMutation::HideLayer { layer: original.id });
            session.apply(
                map,
                MapMutation::AddLayer {
                    index,
                    layer: replacement,
                },
            );
            session.record_substitution(substitution);

            log::debug!(
                "Swapped layer '{}' ({}) for print layer {}",
                original.name,
                substitution.original,
                substitution.replacement
            );
        }

        candidates.len()
    }

    fn print_source(
        &self,
        source: &WmsSource,
        layer_name: &str,
        projection: &Projection,
        dpi: u32,
        cancel: CancelToken,
    ) -> WmsSource {
        let loader = PrintImageLoader {
            fetcher: Arc::clone(&self.fetcher),
            dpi,
            max_tile_size: self.max_tile_size,
            projection: projection.clone(),
            layer_name: layer_name.to_string(),
            cancel,
            events: self.events.clone(),
        };

        WmsSource {
            url: source.url.clone(),
            params: source.params.clone(),
            ratio: 1.0,
            hidpi: false,
            projection: source.projection.clone(),
            loader: Some(Arc::new(loader)),
        }
    }
}
