//! A map host without a UI
//!
//! Renders each visible WMS layer with one GetMap request for the current
//! view and keeps the resulting images as canvas layers. Used by the command
//! line tool and as a reference implementation of [`MapHost`].

use super::*;
use crate::fetch::ImageFetcher;
use crate::types::{Color, PrintError, Result};
use crate::wms::WmsRequest;
use futures::future::join_all;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Serializable description of a map
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapDescription {
    pub view: View,
    pub size: Size,
    #[cfg_attr(feature = "serde", serde(default))]
    pub layers: Vec<LayerSpec>,
    /// Background color behind all layers, e.g. `#000000` for a black basemap
    #[cfg_attr(feature = "serde", serde(default))]
    pub background: Option<String>,
    /// Base URL of shareable map links
    #[cfg_attr(feature = "serde", serde(default))]
    pub permalink_base: Option<String>,
    /// Device pixel ratio applied to hiDPI sources
    #[cfg_attr(feature = "serde", serde(default = "default_pixel_ratio"))]
    pub pixel_ratio: f64,
}

#[cfg(feature = "serde")]
fn default_pixel_ratio() -> f64 {
    1.0
}

pub struct HeadlessMap {
    view: View,
    size: Size,
    layers: Vec<LayerSpec>,
    canvases: Vec<CanvasLayer>,
    fetcher: Arc<dyn ImageFetcher>,
    background: Option<Rgba<u8>>,
    permalink_base: Option<String>,
    pixel_ratio: f64,
    preview_visible: bool,
    render_count: usize,
}

impl HeadlessMap {
    pub fn new(view: View, size: Size, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            view,
            size,
            layers: Vec::new(),
            canvases: Vec::new(),
            fetcher,
            background: None,
            permalink_base: None,
            pixel_ratio: 1.0,
            preview_visible: true,
            render_count: 0,
        }
    }

    pub fn from_description(
        description: MapDescription,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Result<Self> {
        if description.pixel_ratio <= 0.0 {
            return Err(PrintError::Config(
                "pixel_ratio must be positive".to_string(),
            ));
        }
        let background = description
            .background
            .as_deref()
            .map(Color::parse_hex)
            .transpose()?
            .map(Color::to_rgba);

        let mut map = Self::new(description.view, description.size, fetcher);
        map.layers = description.layers;
        map.background = background;
        map.permalink_base = description.permalink_base;
        map.pixel_ratio = description.pixel_ratio;
        Ok(map)
    }

    /// Load a map description from a JSON file
    #[cfg(feature = "serde")]
    pub async fn load(
        path: impl AsRef<std::path::Path>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let description: MapDescription = serde_json::from_slice(&bytes)
            .map_err(|e| PrintError::Config(format!("Failed to parse map description: {}", e)))?;
        Self::from_description(description, fetcher)
    }

    pub fn add_layer(&mut self, layer: LayerSpec) {
        self.layers.push(layer);
    }

    pub fn set_permalink_base(&mut self, base: impl Into<String>) {
        self.permalink_base = Some(base.into());
    }

    pub fn preview_visible(&self) -> bool {
        self.preview_visible
    }

    /// Number of completed renders
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    async fn render_wms(
        &self,
        layer: &LayerSpec,
        source: &WmsSource,
    ) -> std::result::Result<CanvasLayer, MapError> {
        let ratio = match layer.source {
            LayerSource::ImageWms(_) => source.ratio.max(1.0),
            _ => 1.0,
        };
        let pixel_ratio = if source.hidpi { self.pixel_ratio } else { 1.0 };

        // Requested extent in viewport pixels, before device scaling
        let css_width = (f64::from(self.size.width) * ratio).round();
        let css_height = (f64::from(self.size.height) * ratio).round();
        let extent = self
            .view
            .extent(Size::new(css_width as u32, css_height as u32));

        let crs = source
            .projection
            .clone()
            .unwrap_or_else(|| self.view.projection.code.clone());
        let mut request = WmsRequest::get_map(
            &source.url,
            &source.params,
            &crs,
            (css_width * pixel_ratio).round() as u32,
            (css_height * pixel_ratio).round() as u32,
            extent,
        );
        request.bbox = self
            .view
            .projection
            .wms_axis_order(request.version())
            .order_extent(extent);

        let image = match &source.loader {
            Some(loader) => loader.load(&request).await?,
            None => self.fetcher.fetch(&request.url()).await?.to_rgba8(),
        };

        let dx = -(css_width - f64::from(self.size.width)) / 2.0;
        let dy = -(css_height - f64::from(self.size.height)) / 2.0;
        let transform =
            Affine::translate(dx, dy).then(&Affine::scale(1.0 / pixel_ratio, 1.0 / pixel_ratio));

        Ok(CanvasLayer {
            layer: layer.id,
            image,
            opacity: layer.opacity,
            transform,
        })
    }
}

impl MapHost for HeadlessMap {
    fn view(&self) -> &View {
        &self.view
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layers.iter_mut().find(|layer| layer.id == id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    fn insert_layer(&mut self, index: usize, layer: LayerSpec) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
    }

    fn remove_layer(&mut self, id: LayerId) -> Option<LayerSpec> {
        let index = self.layer_index(id)?;
        Some(self.layers.remove(index))
    }

    fn render(&mut self) -> BoxFuture<'_, std::result::Result<(), MapError>> {
        Box::pin(async move {
            let mut visible: Vec<&LayerSpec> =
                self.layers.iter().filter(|layer| layer.visible).collect();
            visible.sort_by_key(|layer| layer.z_index);

            let this = &*self;
            let renders = visible.into_iter().filter_map(|layer| {
                let source = layer.source.wms()?;
                Some(async move { (layer.id, this.render_wms(layer, source).await) })
            });
            let results = join_all(renders).await;

            let mut canvases = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(canvas) => canvases.push(canvas),
                    Err(e) => log::warn!("Layer {} failed to render: {}", id, e),
                }
            }

            self.canvases = canvases;
            self.render_count += 1;
            Ok(())
        })
    }

    fn canvas_layers(&self) -> &[CanvasLayer] {
        &self.canvases
    }

    fn background(&self) -> Option<Rgba<u8>> {
        self.background
    }

    fn permalink(&self) -> Option<String> {
        let base = self.permalink_base.as_ref()?;
        let layers = self
            .layers
            .iter()
            .filter(|layer| layer.visible)
            .map(|layer| layer.id.0.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Some(format!(
            "{}#center={:.2},{:.2}&resolution={}&layers={}",
            base, self.view.center[0], self.view.center[1], self.view.resolution, layers
        ))
    }

    fn set_preview_visible(&mut self, visible: bool) {
        self.preview_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use image::DynamicImage;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        urls: Mutex<Vec<String>>,
    }

    impl ImageFetcher for RecordingFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
        ) -> BoxFuture<'a, std::result::Result<DynamicImage, FetchError>> {
            Box::pin(async move {
                self.urls.lock().unwrap().push(url.to_string());
                Ok(DynamicImage::new_rgba8(4, 4))
            })
        }
    }

    fn hidpi_map(fetcher: Arc<RecordingFetcher>) -> HeadlessMap {
        let mut source = WmsSource::new("https://wms.example.org/service")
            .with_param("LAYERS", "ortho");
        source.ratio = 1.5;
        source.hidpi = true;

        let description = MapDescription {
            view: View::new([0.0, 0.0], 1.0, Projection::new("EPSG:25832", 1.0)),
            size: Size::new(400, 300),
            layers: vec![LayerSpec::new(
                LayerId(1),
                "Ortho",
                LayerSource::ImageWms(source),
            )],
            background: None,
            permalink_base: None,
            pixel_ratio: 2.0,
        };
        HeadlessMap::from_description(description, fetcher).unwrap()
    }

    #[tokio::test]
    async fn test_enlarged_hidpi_request_is_mapped_back_to_viewport() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let mut map = hidpi_map(fetcher.clone());
        map.render().await.unwrap();

        // 400x300 viewport, ratio 1.5, device pixel ratio 2
        let urls = fetcher.urls.lock().unwrap().clone();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("WIDTH=1200"), "{}", urls[0]);
        assert!(urls[0].contains("HEIGHT=900"), "{}", urls[0]);

        let canvas = &map.canvas_layers()[0];
        assert_eq!(canvas.transform.apply(0.0, 0.0), (-100.0, -75.0));
        assert_eq!(canvas.transform.apply(1200.0, 900.0), (500.0, 375.0));
        assert_eq!(map.render_count(), 1);
    }

    #[tokio::test]
    async fn test_tiled_source_ignores_ratio() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let mut map = hidpi_map(fetcher.clone());
        let mut layer = map.remove_layer(LayerId(1)).unwrap();
        layer.source = match layer.source {
            LayerSource::ImageWms(source) => LayerSource::TileWms(source),
            other => other,
        };
        map.add_layer(layer);
        map.render().await.unwrap();

        let urls = fetcher.urls.lock().unwrap().clone();
        assert!(urls[0].contains("WIDTH=800"), "{}", urls[0]);
        let canvas = &map.canvas_layers()[0];
        assert_eq!(canvas.transform.apply(0.0, 0.0), (0.0, 0.0));
        assert_eq!(canvas.transform.apply(800.0, 600.0), (400.0, 300.0));
    }

    #[test]
    fn test_zero_pixel_ratio_rejected() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let description = MapDescription {
            view: View::new([0.0, 0.0], 1.0, Projection::new("EPSG:25832", 1.0)),
            size: Size::new(10, 10),
            layers: Vec::new(),
            background: None,
            permalink_base: None,
            pixel_ratio: 0.0,
        };
        assert!(HeadlessMap::from_description(description, fetcher).is_err());
    }
}
