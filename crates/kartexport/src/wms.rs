//! WMS GetMap request model
//!
//! Requests keep their query parameters in a sorted map with upper-case keys,
//! so parameters added by the print pipeline (`DPI`, `BBOX`, ...) replace
//! whatever the layer's source configuration carried.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// WMS version assumed when a layer does not specify one
pub const DEFAULT_WMS_VERSION: &str = "1.3.0";

/// Axis order of the four BBOX numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AxisOrder {
    /// Easting first: `minx,miny,maxx,maxy`
    Enu,
    /// Northing first: `miny,minx,maxy,maxx`
    Neu,
}

impl AxisOrder {
    /// Axis order implied by the WMS protocol version alone.
    ///
    /// Only "1.3.0" is treated as northing-first; every other version
    /// behaves like 1.1.1.
    pub fn for_version(version: &str) -> Self {
        if version == "1.3.0" {
            AxisOrder::Neu
        } else {
            AxisOrder::Enu
        }
    }

    /// Arrange an easting/northing extent `[minx, miny, maxx, maxy]` for the wire
    pub fn order_extent(self, extent: [f64; 4]) -> [f64; 4] {
        match self {
            AxisOrder::Enu => extent,
            AxisOrder::Neu => [extent[1], extent[0], extent[3], extent[2]],
        }
    }
}

/// A single GetMap request
#[derive(Debug, Clone, PartialEq)]
pub struct WmsRequest {
    pub base_url: String,
    pub params: BTreeMap<String, String>,
    pub width: u32,
    pub height: u32,
    /// BBOX in the request's axis order
    pub bbox: [f64; 4],
}

impl WmsRequest {
    /// Build a GetMap request from a layer's base URL and source parameters
    pub fn get_map(
        base_url: &str,
        source_params: &BTreeMap<String, String>,
        crs: &str,
        width: u32,
        height: u32,
        bbox: [f64; 4],
    ) -> Self {
        let mut request = Self {
            base_url: base_url.to_string(),
            params: BTreeMap::new(),
            width,
            height,
            bbox,
        };
        request.set_param("SERVICE", "WMS");
        request.set_param("REQUEST", "GetMap");
        request.set_param("VERSION", DEFAULT_WMS_VERSION);
        request.set_param("FORMAT", "image/png");
        request.set_param("TRANSPARENT", "TRUE");
        request.set_param("STYLES", "");
        for (key, value) in source_params {
            request.set_param(key, value);
        }
        let crs_key = if request.version() == "1.3.0" {
            "CRS"
        } else {
            "SRS"
        };
        request.set_param(crs_key, crs);
        request
    }

    /// Insert or replace a parameter (keys are case-insensitive)
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(key.to_ascii_uppercase(), value.into());
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn version(&self) -> &str {
        self.param("VERSION").unwrap_or(DEFAULT_WMS_VERSION)
    }

    /// Copy of this request for a sub-rectangle
    pub fn with_extent(&self, width: u32, height: u32, bbox: [f64; 4]) -> Self {
        Self {
            width,
            height,
            bbox,
            ..self.clone()
        }
    }

    /// Full request URL including `WIDTH`, `HEIGHT` and `BBOX`
    pub fn url(&self) -> String {
        let mut params = self.params.clone();
        params.insert("WIDTH".to_string(), self.width.to_string());
        params.insert("HEIGHT".to_string(), self.height.to_string());
        params.insert(
            "BBOX".to_string(),
            self.bbox
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if !self.base_url.contains('?') {
            "?"
        } else if self.base_url.ends_with('?') || self.base_url.ends_with('&') {
            ""
        } else {
            "&"
        };
        format!("{}{}{}", self.base_url, separator, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> WmsRequest {
        let mut source = BTreeMap::new();
        source.insert("layers".to_string(), "roads".to_string());
        WmsRequest::get_map(
            "https://maps.example.org/wms",
            &source,
            "EPSG:25832",
            256,
            128,
            [0.0, 0.0, 10.0, 5.0],
        )
    }

    #[test]
    fn test_url_contains_extent_and_source_params() {
        let url = request().url();
        assert!(url.starts_with("https://maps.example.org/wms?"));
        assert!(url.contains("LAYERS=roads"));
        assert!(url.contains("WIDTH=256"));
        assert!(url.contains("HEIGHT=128"));
        assert!(url.contains("BBOX=0%2C0%2C10%2C5"));
        assert!(url.contains("CRS=EPSG%3A25832"));
    }

    #[test]
    fn test_existing_query_is_extended() {
        let mut req = request();
        req.base_url = "https://maps.example.org/wms?map=base".to_string();
        assert!(req.url().starts_with("https://maps.example.org/wms?map=base&"));
    }

    #[test]
    fn test_old_versions_use_srs() {
        let mut source = BTreeMap::new();
        source.insert("VERSION".to_string(), "1.1.1".to_string());
        let req = WmsRequest::get_map("u", &source, "EPSG:4326", 1, 1, [0.0; 4]);
        assert_eq!(req.param("srs"), Some("EPSG:4326"));
        assert_eq!(req.param("CRS"), None);
    }

    #[test]
    fn test_axis_order_for_version() {
        assert_eq!(AxisOrder::for_version("1.3.0"), AxisOrder::Neu);
        assert_eq!(AxisOrder::for_version("1.1.1"), AxisOrder::Enu);
        assert_eq!(AxisOrder::for_version("1.1.0"), AxisOrder::Enu);
        assert_eq!(
            AxisOrder::Neu.order_extent([1.0, 2.0, 3.0, 4.0]),
            [2.0, 1.0, 4.0, 3.0]
        );
    }
}
