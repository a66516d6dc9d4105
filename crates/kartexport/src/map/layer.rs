use crate::fetch::FetchError;
use crate::wms::WmsRequest;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identity of a layer within one map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Custom image loading routine attached to a WMS source.
///
/// When present, the map hands every GetMap request of the layer to the
/// loader instead of fetching the URL itself.
pub trait ImageLoader: Send + Sync + fmt::Debug {
    fn load<'a>(&'a self, request: &'a WmsRequest) -> BoxFuture<'a, Result<RgbaImage, FetchError>>;
}

/// Connection details of a WMS-backed layer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WmsSource {
    pub url: String,
    /// Extra GetMap parameters (`LAYERS`, `STYLES`, `VERSION`, ...)
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: BTreeMap<String, String>,
    /// Requested extent relative to the viewport (1.0 = exactly the viewport)
    #[cfg_attr(feature = "serde", serde(default = "default_ratio"))]
    pub ratio: f64,
    /// Whether requests are scaled by the device pixel ratio
    #[cfg_attr(feature = "serde", serde(default))]
    pub hidpi: bool,
    /// CRS of the source; the view projection when unset
    #[cfg_attr(feature = "serde", serde(default))]
    pub projection: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub loader: Option<Arc<dyn ImageLoader>>,
}

#[cfg(feature = "serde")]
fn default_ratio() -> f64 {
    1.0
}

impl WmsSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: BTreeMap::new(),
            ratio: 1.0,
            hidpi: false,
            projection: None,
            loader: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_ascii_uppercase(), value.into());
        self
    }
}

/// Where a layer's pixels come from
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum LayerSource {
    /// Tiled WMS (grid of fixed-size requests)
    TileWms(WmsSource),
    /// Single-image WMS (one request per render)
    ImageWms(WmsSource),
    /// Any other source; left untouched by printing
    Other { kind: String },
}

impl LayerSource {
    pub fn wms(&self) -> Option<&WmsSource> {
        match self {
            LayerSource::TileWms(source) | LayerSource::ImageWms(source) => Some(source),
            LayerSource::Other { .. } => None,
        }
    }
}

/// A layer in the map's collection
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSpec {
    pub id: LayerId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_visible"))]
    pub visible: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_opacity"))]
    pub opacity: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub z_index: i32,
    pub source: LayerSource,
}

#[cfg(feature = "serde")]
fn default_visible() -> bool {
    true
}

#[cfg(feature = "serde")]
fn default_opacity() -> f32 {
    1.0
}

impl LayerSpec {
    pub fn new(id: LayerId, name: impl Into<String>, source: LayerSource) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            opacity: 1.0,
            z_index: 0,
            source,
        }
    }

    /// Visible tiled or single-image WMS layers are swapped while printing
    pub fn is_printable_wms(&self) -> bool {
        self.visible && self.source.wms().is_some()
    }
}
