//! The dedicated print view
//!
//! Interactive views clamp their resolution to what the zoom controls offer.
//! Printing at an arbitrary scale and DPI needs finer steps, so jobs swap in
//! a separate view that shares projection and center with the interactive
//! one but has its own resolution floor.

use super::session::{MapMutation, PrintSession};
use crate::constants::resolution_for_scale;
use crate::map::{MapHost, View};
use crate::options::PrintJobOptions;
use crate::types::{PrintError, Result};

#[derive(Debug)]
pub struct ViewStateManager {
    min_print_resolution: f64,
    print_view: Option<View>,
}

impl ViewStateManager {
    pub fn new(min_print_resolution: f64) -> Self {
        Self {
            min_print_resolution,
            print_view: None,
        }
    }

    /// The print view as left by the last job, if any
    pub fn print_view(&self) -> Option<&View> {
        self.print_view.as_ref()
    }

    /// Resolution (map units per pixel) needed for the job's scale and DPI
    pub fn print_resolution(view: &View, options: &PrintJobOptions) -> f64 {
        resolution_for_scale(
            options.scale,
            options.resolution,
            view.projection.meters_per_unit,
        )
    }

    /// Copy center and resolution of `current` into the print view.
    ///
    /// The print view is created on first use and recreated whenever the
    /// interactive projection changes.
    pub fn sync(&mut self, current: &View) -> &View {
        let min_resolution = self.min_print_resolution;
        let view = match self.print_view.take() {
            Some(mut view) if view.projection == current.projection => {
                view.center = current.center;
                view.resolution = current.resolution;
                view
            }
            _ => current.derive(min_resolution),
        };
        self.print_view.insert(view)
    }

    /// Fail if the job needs a finer resolution than the print view allows
    pub fn check_resolution(&mut self, current: &View, options: &PrintJobOptions) -> Result<f64> {
        let requested = Self::print_resolution(current, options);
        let minimum = self.sync(current).min_resolution;
        if requested < minimum {
            return Err(PrintError::UnreachableResolution { requested, minimum });
        }
        Ok(requested)
    }

    /// Resize the map to the paper, swap in the print view and hide the
    /// print extent preview. Every step is journaled in `session`.
    pub fn apply<M: MapHost + ?Sized>(
        &mut self,
        map: &mut M,
        session: &mut PrintSession,
        options: &PrintJobOptions,
    ) -> Result<()> {
        let resolution = self.check_resolution(map.view(), options)?;
        let target = options.target_size();

        let mut replacement = self.sync(map.view()).clone();
        replacement.resolution = resolution;
        self.print_view = Some(replacement.clone());

        log::debug!(
            "Print view: {}x{} px at {} units/px (1:{} @ {} dpi)",
            target.width,
            target.height,
            resolution,
            options.scale,
            options.resolution
        );

        let original_size = map.size();
        let original_view = map.view().clone();
        session.apply(
            map,
            MapMutation::Resize {
                original: original_size,
                target,
            },
        );
        session.apply(
            map,
            MapMutation::SwapView {
                original: original_view,
                replacement,
            },
        );
        session.apply(map, MapMutation::HidePreview);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Projection;

    fn view() -> View {
        View::new([500.0, 800.0], 2.0, Projection::new("EPSG:25832", 1.0))
    }

    #[test]
    fn test_sync_keeps_print_view_identity() {
        let mut manager = ViewStateManager::new(0.001);
        let first = manager.sync(&view()).id();

        let mut moved = view();
        moved.center = [1.0, 2.0];
        let synced = manager.sync(&moved);
        assert_eq!(synced.id(), first);
        assert_eq!(synced.center, [1.0, 2.0]);
        assert_eq!(synced.min_resolution, 0.001);
    }

    #[test]
    fn test_projection_change_recreates_print_view() {
        let mut manager = ViewStateManager::new(0.001);
        let first = manager.sync(&view()).id();
        let other = View::new([0.0, 0.0], 1.0, Projection::new("EPSG:3857", 1.0));
        assert_ne!(manager.sync(&other).id(), first);
    }

    #[test]
    fn test_unreachable_resolution() {
        let mut manager = ViewStateManager::new(0.5);
        let options = PrintJobOptions {
            scale: 100.0,
            resolution: 300,
            ..Default::default()
        };
        // 100 * 0.0254 / 300 ≈ 0.0085 units/px, finer than 0.5
        assert!(matches!(
            manager.check_resolution(&view(), &options),
            Err(PrintError::UnreachableResolution { .. })
        ));
    }

    #[test]
    fn test_resolution_for_scale_and_dpi() {
        let options = PrintJobOptions {
            scale: 10_000.0,
            resolution: 254,
            ..Default::default()
        };
        let resolution = ViewStateManager::print_resolution(&view(), &options);
        assert!((resolution - 1.0).abs() < 1e-9);
    }
}
