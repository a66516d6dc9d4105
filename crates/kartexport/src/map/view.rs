use crate::types::Size;
use crate::wms::AxisOrder;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a view object; copies of a view share it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

impl ViewId {
    pub fn next() -> Self {
        ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::next()
    }
}

/// Map projection as far as printing cares about it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Projection {
    /// CRS identifier sent to WMS servers, e.g. `EPSG:25832`
    pub code: String,
    /// Meters per map unit (1.0 for metric projections)
    #[cfg_attr(feature = "serde", serde(default = "default_meters_per_unit"))]
    pub meters_per_unit: f64,
    /// Axis order WMS 1.3.0 servers expect for this CRS, when known
    #[cfg_attr(feature = "serde", serde(default))]
    pub axis_order: Option<AxisOrder>,
}

#[cfg(feature = "serde")]
fn default_meters_per_unit() -> f64 {
    1.0
}

impl Projection {
    pub fn new(code: impl Into<String>, meters_per_unit: f64) -> Self {
        Self {
            code: code.into(),
            meters_per_unit,
            axis_order: None,
        }
    }

    /// Axis order of BBOX values for a request of the given WMS version.
    ///
    /// 1.3.0 requests default to northing-first unless the projection says
    /// otherwise; older versions are always easting-first.
    pub fn wms_axis_order(&self, version: &str) -> AxisOrder {
        match AxisOrder::for_version(version) {
            AxisOrder::Neu => self.axis_order.unwrap_or(AxisOrder::Neu),
            AxisOrder::Enu => AxisOrder::Enu,
        }
    }
}

/// Center, resolution and projection of a map
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct View {
    #[cfg_attr(feature = "serde", serde(skip))]
    id: ViewId,
    pub center: [f64; 2],
    /// Map units per pixel
    pub resolution: f64,
    /// Finest resolution this view may be set to
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_resolution: f64,
    pub projection: Projection,
}

impl View {
    pub fn new(center: [f64; 2], resolution: f64, projection: Projection) -> Self {
        Self {
            id: ViewId::next(),
            center,
            resolution,
            min_resolution: 0.0,
            projection,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// A distinct view object sharing projection and position with `self`
    pub fn derive(&self, min_resolution: f64) -> View {
        View {
            id: ViewId::next(),
            center: self.center,
            resolution: self.resolution,
            min_resolution,
            projection: self.projection.clone(),
        }
    }

    /// Visible extent `[minx, miny, maxx, maxy]` for a viewport of `size`
    pub fn extent(&self, size: Size) -> [f64; 4] {
        let half_w = f64::from(size.width) * self.resolution / 2.0;
        let half_h = f64::from(size.height) * self.resolution / 2.0;
        [
            self.center[0] - half_w,
            self.center[1] - half_h,
            self.center[0] + half_w,
            self.center[1] + half_h,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_view_is_distinct_object() {
        let view = View::new([10.0, 20.0], 2.0, Projection::new("EPSG:3857", 1.0));
        let copy = view.clone();
        let derived = view.derive(0.01);
        assert_eq!(copy.id(), view.id());
        assert_ne!(derived.id(), view.id());
        assert_eq!(derived.center, view.center);
        assert_eq!(derived.projection, view.projection);
    }

    #[test]
    fn test_extent_is_centered() {
        let view = View::new([100.0, 50.0], 0.5, Projection::new("EPSG:25832", 1.0));
        assert_eq!(view.extent(Size::new(40, 20)), [90.0, 45.0, 110.0, 55.0]);
    }

    #[test]
    fn test_projection_can_override_neu() {
        let mut proj = Projection::new("EPSG:3857", 1.0);
        assert_eq!(proj.wms_axis_order("1.3.0"), AxisOrder::Neu);
        proj.axis_order = Some(AxisOrder::Enu);
        assert_eq!(proj.wms_axis_order("1.3.0"), AxisOrder::Enu);
        assert_eq!(proj.wms_axis_order("1.1.1"), AxisOrder::Enu);
    }
}
