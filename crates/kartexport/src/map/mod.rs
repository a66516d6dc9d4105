//! The map the pipeline prints from
//!
//! The print pipeline never owns the interactive map. It talks to it through
//! [`MapHost`], which exposes the current view, the pixel size, the layer
//! collection, a render-complete future and the rendered canvas layers.
//! [`HeadlessMap`] is a self-contained host that renders WMS layers without
//! any UI.

mod headless;
mod layer;
mod view;

pub use headless::{HeadlessMap, MapDescription};
pub use layer::*;
pub use view::*;

use crate::fetch::FetchError;
use crate::types::Size;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error("Layer image failed to load: {0}")]
    Fetch(#[from] FetchError),
}

/// One rendered layer canvas, as the map would draw it
#[derive(Debug, Clone)]
pub struct CanvasLayer {
    pub layer: LayerId,
    pub image: RgbaImage,
    pub opacity: f32,
    /// Maps canvas pixel coordinates onto map viewport pixel coordinates
    pub transform: Affine,
}

/// 2D affine transform in CSS `matrix(a, b, c, d, e, f)` order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(pub [f64; 6]);

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(dx: f64, dy: f64) -> Self {
        Affine([1.0, 0.0, 0.0, 1.0, dx, dy])
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Affine([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// `self` applied after `other`
    pub fn then(&self, other: &Affine) -> Affine {
        let [a1, b1, c1, d1, e1, f1] = other.0;
        let [a2, b2, c2, d2, e2, f2] = self.0;
        Affine([
            a2 * a1 + c2 * b1,
            b2 * a1 + d2 * b1,
            a2 * c1 + c2 * d1,
            b2 * c1 + d2 * d1,
            a2 * e1 + c2 * f1 + e2,
            b2 * e1 + d2 * f1 + f2,
        ])
    }

    pub fn invert(&self) -> Option<Affine> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        Some(Affine([
            d / det,
            -b / det,
            -c / det,
            a / det,
            (c * f - d * e) / det,
            (b * e - a * f) / det,
        ]))
    }
}

/// The interactive map, as seen by the print pipeline.
///
/// Every mutation the pipeline performs through this trait is journaled and
/// undone when the job ends; implementations only need to apply them.
pub trait MapHost {
    /// The currently active view
    fn view(&self) -> &View;

    /// Replace the active view
    fn set_view(&mut self, view: View);

    /// Pixel size of the map viewport
    fn size(&self) -> Size;

    fn set_size(&mut self, size: Size);

    /// Layers in draw order (first drawn first)
    fn layers(&self) -> &[LayerSpec];

    /// Returns `false` if no layer has that id
    fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool;

    /// Insert a layer at `index` in draw order (clamped to the collection length)
    fn insert_layer(&mut self, index: usize, layer: LayerSpec);

    fn remove_layer(&mut self, id: LayerId) -> Option<LayerSpec>;

    /// Render the current state; resolves when the render has completed
    fn render(&mut self) -> BoxFuture<'_, Result<(), MapError>>;

    /// Canvases produced by the last completed render, in draw order
    fn canvas_layers(&self) -> &[CanvasLayer];

    /// Background color currently shown behind all layers, if any
    fn background(&self) -> Option<Rgba<u8>> {
        None
    }

    /// Shareable URL reproducing the current map state
    fn permalink(&self) -> Option<String> {
        None
    }

    /// Show or hide the print extent preview feature
    fn set_preview_visible(&mut self, _visible: bool) {}

    fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers().iter().position(|layer| layer.id == id)
    }

    /// An id no current layer uses
    fn next_layer_id(&self) -> LayerId {
        LayerId(
            self.layers()
                .iter()
                .map(|layer| layer.id.0)
                .max()
                .map_or(1, |max| max + 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_invert_roundtrip() {
        let t = Affine::translate(10.0, -4.0).then(&Affine::scale(2.0, 0.5));
        let inv = t.invert().unwrap();
        let (x, y) = t.apply(3.0, 7.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 3.0).abs() < 1e-9);
        assert!((by - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_then_applies_other_first() {
        let t = Affine::translate(5.0, 0.0).then(&Affine::scale(2.0, 2.0));
        assert_eq!(t.apply(1.0, 1.0), (7.0, 2.0));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        assert!(Affine::scale(0.0, 1.0).invert().is_none());
    }
}
