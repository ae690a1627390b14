//! Zoom limits, clamping and percentage stepping
//!
//! Raw zoom is the engine's viewport zoom. The normalized percentage is raw
//! zoom relative to the native (one image pixel per screen pixel) zoom, which
//! is also the maximum zoom.

use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::engine::{Viewer, Viewport, World};
use crate::error::GeometryError;

/// Share of the surface the content fills at default zoom
pub const DEFAULT_FILL_RATIO: f64 = 0.9;
/// Percentage points per zoom step
pub const DEFAULT_ZOOM_STEP: f64 = 10.0;
/// Entries kept by the percentage memo
pub const DEFAULT_PERCENT_CACHE_SIZE: usize = 32;

/// Zoom bounds applied to the viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ZoomLimits {
    /// Limits in effect before the first content is measured
    pub const UNBOUNDED: ZoomLimits = ZoomLimits {
        min: f64::MIN_POSITIVE,
        max: f64::MAX,
        default: 1.0,
    };

    #[must_use]
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Direction of a zoom step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

impl ZoomStep {
    fn sign(self) -> f64 {
        match self {
            ZoomStep::In => 1.0,
            ZoomStep::Out => -1.0,
        }
    }
}

/// How pages are fitted when content opens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Whole spread visible
    #[default]
    Bounds,
    /// Spread height fills the surface
    Vertical,
    /// Spread width fills the surface
    Horizontal,
}

impl FitMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Bounds => "bounds",
            FitMode::Vertical => "vertical",
            FitMode::Horizontal => "horizontal",
        }
    }
}

/// Zoom fields pushed to the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomReport {
    pub current_zoom: u32,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
}

/// Cache key for percentage conversions (exact bit patterns)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PercentKey {
    zoom_bits: u64,
    max_bits: u64,
}

/// Convert a percentage of `max` back into a raw zoom
#[must_use]
pub fn percent_to_zoom(percent: f64, max: f64) -> f64 {
    percent / 100.0 * max
}

fn zoom_to_percent(zoom: f64, max: f64) -> f64 {
    zoom / max * 100.0
}

/// Derives and applies zoom limits, converts between raw zoom and percent
pub struct ZoomController {
    fill_ratio: f64,
    step: f64,
    percents: LruCache<PercentKey, f64>,
    /// Last limits measured from real geometry
    limits: Option<ZoomLimits>,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(DEFAULT_FILL_RATIO, DEFAULT_ZOOM_STEP, DEFAULT_PERCENT_CACHE_SIZE)
    }
}

impl ZoomController {
    #[must_use]
    pub fn new(fill_ratio: f64, step: f64, cache_size: usize) -> Self {
        Self {
            fill_ratio,
            step,
            percents: LruCache::new(NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN)),
            limits: None,
        }
    }

    /// Limits from the last successful measurement, `None` before one
    pub fn limits(&self) -> Option<ZoomLimits> {
        self.limits
    }

    /// Largest viewport zoom at which some page shows `scale` screen pixels
    /// per image pixel. `None` for an empty world.
    pub fn target_zoom<W: World + ?Sized>(&self, world: &W, scale: f64) -> Option<f64> {
        (0..world.item_count())
            .filter_map(|index| world.image_to_viewport_zoom(index, scale))
            .filter(|zoom| zoom.is_finite())
            .reduce(f64::max)
    }

    /// Compute limits for the current world and viewport without applying them
    pub fn compute_limits<V: Viewer + ?Sized>(
        &self,
        viewer: &V,
    ) -> Result<ZoomLimits, GeometryError> {
        let world_bounds = viewer.world().home_bounds();
        let viewport_bounds = viewer.viewport().bounds();

        let content_aspect = world_bounds.aspect_ratio().ok_or(GeometryError::EmptyWorld {
            width: world_bounds.width,
            height: world_bounds.height,
        })?;
        let surface_aspect = viewport_bounds.aspect_ratio().ok_or(GeometryError::EmptyViewport {
            width: viewport_bounds.width,
            height: viewport_bounds.height,
        })?;
        let native = self
            .target_zoom(viewer.world(), 1.0)
            .ok_or(GeometryError::NoNativeZoom)?;

        let aspect_factor = content_aspect / surface_aspect;
        let zoom_factor = aspect_factor.min(1.0) * self.fill_ratio;
        let fit = zoom_factor / world_bounds.width;
        let min = if native <= fit { native } else { fit };

        if !(min.is_finite() && native.is_finite() && min > 0.0 && native > 0.0) {
            return Err(GeometryError::InvalidLimits { min, max: native });
        }

        Ok(ZoomLimits {
            min,
            max: native,
            default: min,
        })
    }

    /// Recompute limits from the current geometry and pull the live zoom
    /// back inside them.
    ///
    /// Degenerate geometry leaves the previous limits in place; returns
    /// whether new limits were applied.
    pub fn update_zoom_limits<V: Viewer + ?Sized>(&mut self, viewer: &mut V) -> bool {
        match self.compute_limits(viewer) {
            Ok(limits) => {
                debug!(
                    "Zoom limits: min {:.5}, max {:.5}, default {:.5}",
                    limits.min, limits.max, limits.default
                );
                self.limits = Some(limits);
                viewer.viewport_mut().set_zoom_limits(limits);
                let current = viewer.viewport().zoom();
                self.clamp_and_apply_zoom(viewer, current);
                true
            }
            Err(e) => {
                debug!("Keeping previous zoom limits: {e}");
                false
            }
        }
    }

    /// Percentage of the maximum zoom, memoized per input pair
    pub fn percent(&mut self, zoom: f64, max: f64) -> f64 {
        let key = PercentKey {
            zoom_bits: zoom.to_bits(),
            max_bits: max.to_bits(),
        };
        if let Some(percent) = self.percents.get(&key) {
            return *percent;
        }
        let percent = zoom_to_percent(zoom, max);
        self.percents.put(key, percent);
        percent
    }

    /// Clamp a raw zoom into the current limits, apply it and keep the
    /// content in view. Zero or non-finite values are ignored.
    pub fn clamp_and_apply_zoom<V: Viewer + ?Sized>(&self, viewer: &mut V, raw: f64) {
        if raw == 0.0 || !raw.is_finite() {
            return;
        }
        let home = viewer.world().home_bounds();
        let viewport = viewer.viewport_mut();
        let zoom = viewport.zoom_limits().clamp(raw);
        viewport.zoom_to(zoom);
        viewport.ensure_visible(home);
    }

    /// Move the zoom one step in percentage space. No-op until limits
    /// have been measured.
    pub fn step_zoom<V: Viewer + ?Sized>(&mut self, viewer: &mut V, step: ZoomStep) {
        let Some(limits) = self.limits else {
            debug!("Zoom step ignored, limits not measured yet");
            return;
        };
        let zoom = viewer.viewport().zoom();
        let percent = self.percent(zoom, limits.max) + step.sign() * self.step;
        self.clamp_and_apply_zoom(viewer, percent_to_zoom(percent, limits.max));
    }

    /// Zoom to an absolute percentage of the maximum zoom. No-op until
    /// limits have been measured.
    pub fn zoom_to_percent<V: Viewer + ?Sized>(&self, viewer: &mut V, percent: f64) {
        let Some(limits) = self.limits else {
            debug!("Zoom to {percent}% ignored, limits not measured yet");
            return;
        };
        self.clamp_and_apply_zoom(viewer, percent_to_zoom(percent, limits.max));
    }

    /// Jump to one image pixel per screen pixel
    pub fn zoom_to_native<V: Viewer + ?Sized>(&self, viewer: &mut V) {
        match self.target_zoom(viewer.world(), 1.0) {
            Some(native) => viewer.viewport_mut().zoom_to(native),
            None => debug!("No pages loaded, native zoom unavailable"),
        }
    }

    /// Build the host report for `zoom` against the current limits
    pub fn report<V: Viewer + ?Sized>(&mut self, viewer: &V, zoom: f64) -> ZoomReport {
        let limits = viewer.viewport().zoom_limits();
        let percent = self.percent(zoom, limits.max);
        let current_zoom = if percent.is_finite() {
            percent.round().max(0.0) as u32
        } else {
            0
        };
        ZoomReport {
            current_zoom,
            can_zoom_in: zoom < limits.max && current_zoom < 100,
            can_zoom_out: zoom > limits.min,
        }
    }

    /// Fit the spread on the surface
    pub fn fit_pages<V: Viewer + ?Sized>(&self, viewer: &mut V, mode: FitMode) {
        let home = viewer.world().home_bounds();
        debug!("Fitting pages ({})", mode.as_str());
        let viewport = viewer.viewport_mut();
        match mode {
            FitMode::Bounds => viewport.fit_bounds(home),
            FitMode::Vertical => viewport.fit_vertically(home),
            FitMode::Horizontal => viewport.fit_horizontally(home),
        }
    }

    /// Fit pages, refresh limits and settle on the default zoom
    pub fn fit_to_bounds<V: Viewer + ?Sized>(&mut self, viewer: &mut V, mode: FitMode) {
        self.fit_pages(viewer, mode);
        self.update_zoom_limits(viewer);
        let viewport = viewer.viewport_mut();
        let default = viewport.zoom_limits().default;
        viewport.zoom_to(default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PageSource;
    use crate::headless::HeadlessViewer;
    use crate::layout::{LayoutMode, layout};

    const EPSILON: f64 = 1e-9;

    /// Viewer with `sizes` opened and laid out as a book spread
    fn opened(container: (f64, f64), sizes: &[(u32, u32)]) -> HeadlessViewer {
        let mut viewer = HeadlessViewer::new(container.0, container.1);
        let sources: Vec<PageSource> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                let source = PageSource::new(format!("page-{i}"));
                viewer.register_image(&source.uri, w, h);
                source
            })
            .collect();
        viewer.open(&sources);
        layout(viewer.world_mut(), LayoutMode::BOOK);
        viewer
    }

    #[test]
    fn target_zoom_takes_maximum_across_pages() {
        let viewer = opened((1000.0, 1000.0), &[(2000, 2000), (500, 1000)]);
        let controller = ZoomController::default();

        // Page 0 grows to 2 units wide: 2000 px over 2 units needs 1.0.
        // Page 1 stays 1 unit wide: 500 px needs 0.5.
        let native = controller.target_zoom(viewer.world(), 1.0).unwrap();
        assert!((native - 1.0).abs() < EPSILON);
    }

    #[test]
    fn target_zoom_of_empty_world_is_none() {
        let viewer = HeadlessViewer::new(800.0, 600.0);
        assert_eq!(ZoomController::default().target_zoom(viewer.world(), 1.0), None);
    }

    #[test]
    fn equal_aspect_gives_default_equal_to_min() {
        // 4:3 page on a 4:3 surface
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();

        assert!(controller.update_zoom_limits(&mut viewer));
        let limits = viewer.viewport().zoom_limits();
        assert_eq!(limits.default, limits.min);
        assert!(limits.max >= limits.min);
        // 90% of the width at fit: 0.9 / world width 1
        assert!((limits.min - 0.9).abs() < EPSILON);
        // 4000 px on 800 px surface
        assert!((limits.max - 5.0).abs() < EPSILON);
    }

    #[test]
    fn min_never_exceeds_native_zoom() {
        // Tiny image: native zoom is below the fit zoom
        let mut viewer = opened((1000.0, 1000.0), &[(100, 100)]);
        let mut controller = ZoomController::default();

        controller.update_zoom_limits(&mut viewer);
        let limits = viewer.viewport().zoom_limits();
        assert!((limits.max - 0.1).abs() < EPSILON);
        assert_eq!(limits.min, limits.max);
    }

    #[test]
    fn tall_content_fits_by_height() {
        // 1:2 page on a square surface: aspect factor 0.5
        let mut viewer = opened((1000.0, 1000.0), &[(1000, 2000)]);
        let mut controller = ZoomController::default();

        controller.update_zoom_limits(&mut viewer);
        assert!((viewer.viewport().zoom_limits().min - 0.45).abs() < EPSILON);
    }

    #[test]
    fn zero_height_viewport_keeps_previous_limits() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);
        let before = viewer.viewport().zoom_limits();

        viewer.resize_container(800.0, 0.0);
        assert!(!controller.update_zoom_limits(&mut viewer));
        assert_eq!(viewer.viewport().zoom_limits(), before);
    }

    #[test]
    fn empty_world_keeps_previous_limits() {
        let mut viewer = HeadlessViewer::new(800.0, 600.0);
        let mut controller = ZoomController::default();

        assert_eq!(
            controller.compute_limits(&viewer),
            Err(GeometryError::EmptyWorld {
                width: 0.0,
                height: 0.0
            })
        );
        assert!(!controller.update_zoom_limits(&mut viewer));
        assert_eq!(viewer.viewport().zoom_limits(), ZoomLimits::UNBOUNDED);
    }

    #[test]
    fn clamp_applies_exact_bounds() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);
        let limits = viewer.viewport().zoom_limits();

        controller.clamp_and_apply_zoom(&mut viewer, limits.min / 3.0);
        assert_eq!(viewer.viewport().zoom(), limits.min);

        controller.clamp_and_apply_zoom(&mut viewer, limits.max * 3.0);
        assert_eq!(viewer.viewport().zoom(), limits.max);

        controller.clamp_and_apply_zoom(&mut viewer, limits.min);
        assert_eq!(viewer.viewport().zoom(), limits.min);
    }

    #[test]
    fn clamp_ignores_zero_and_nan() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);
        controller.clamp_and_apply_zoom(&mut viewer, 2.0);

        controller.clamp_and_apply_zoom(&mut viewer, 0.0);
        controller.clamp_and_apply_zoom(&mut viewer, f64::NAN);
        assert_eq!(viewer.viewport().zoom(), 2.0);
    }

    #[test]
    fn step_in_then_out_returns_to_start() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);

        // 2.3 / 5.0 = 46%, well inside the limits in both directions
        controller.clamp_and_apply_zoom(&mut viewer, 2.3);
        let start = viewer.viewport().zoom();

        controller.step_zoom(&mut viewer, ZoomStep::In);
        assert!((viewer.viewport().zoom() - 2.8).abs() < EPSILON);

        controller.step_zoom(&mut viewer, ZoomStep::Out);
        assert!((viewer.viewport().zoom() - start).abs() < EPSILON);
    }

    #[test]
    fn step_out_clamps_to_min() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);
        let limits = viewer.viewport().zoom_limits();

        // 20% of max is 1.0, min is 0.9
        controller.clamp_and_apply_zoom(&mut viewer, 1.0);
        controller.step_zoom(&mut viewer, ZoomStep::Out);
        assert_eq!(viewer.viewport().zoom(), limits.min);
    }

    #[test]
    fn zoom_to_percent_uses_max_zoom() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);

        controller.zoom_to_percent(&mut viewer, 50.0);
        assert!((viewer.viewport().zoom() - 2.5).abs() < EPSILON);
    }

    #[test]
    fn zoom_to_native_bypasses_percentages() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let controller = ZoomController::default();

        controller.zoom_to_native(&mut viewer);
        assert!((viewer.viewport().zoom() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn report_flags_follow_limits() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.update_zoom_limits(&mut viewer);
        let limits = viewer.viewport().zoom_limits();

        let at_min = controller.report(&viewer, limits.min);
        assert_eq!(at_min.current_zoom, 18);
        assert!(at_min.can_zoom_in);
        assert!(!at_min.can_zoom_out);

        let at_max = controller.report(&viewer, limits.max);
        assert_eq!(at_max.current_zoom, 100);
        assert!(!at_max.can_zoom_in);
        assert!(at_max.can_zoom_out);

        // Not clamped upwards
        let beyond = controller.report(&viewer, limits.max * 1.5);
        assert_eq!(beyond.current_zoom, 150);
    }

    #[test]
    fn percent_is_memoized() {
        let mut controller = ZoomController::new(DEFAULT_FILL_RATIO, DEFAULT_ZOOM_STEP, 2);
        assert_eq!(controller.percent(1.0, 4.0), 25.0);
        assert_eq!(controller.percent(1.0, 4.0), 25.0);
        assert_eq!(controller.percents.len(), 1);
    }

    #[test]
    fn fit_to_bounds_lands_on_default_zoom() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000), (4000, 3000)]);
        let mut controller = ZoomController::default();

        controller.fit_to_bounds(&mut viewer, FitMode::Bounds);
        let limits = viewer.viewport().zoom_limits();
        assert_eq!(viewer.viewport().zoom(), limits.default);
    }

    #[test]
    fn percent_zoom_waits_for_measured_limits() {
        // Zero-height surface: limits cannot be measured
        let mut viewer = opened((800.0, 0.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        assert!(!controller.update_zoom_limits(&mut viewer));
        assert_eq!(controller.limits(), None);

        controller.step_zoom(&mut viewer, ZoomStep::In);
        controller.zoom_to_percent(&mut viewer, 80.0);
        assert_eq!(viewer.viewport().zoom(), 1.0);
    }

    #[test]
    fn new_limits_pull_live_zoom_inside() {
        let mut viewer = opened((800.0, 600.0), &[(4000, 3000)]);
        let mut controller = ZoomController::default();
        controller.zoom_to_native(&mut viewer);
        controller.update_zoom_limits(&mut viewer);
        assert!((viewer.viewport().zoom() - 5.0).abs() < EPSILON);

        // Wider surface halves the native zoom
        viewer.resize_container(1600.0, 600.0);
        assert!(controller.update_zoom_limits(&mut viewer));
        let limits = controller.limits().unwrap();
        assert!((limits.max - 2.5).abs() < EPSILON);
        assert_eq!(viewer.viewport().zoom(), limits.max);
    }
}
