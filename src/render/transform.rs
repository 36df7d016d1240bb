//! View transform state and the coordinate pipeline.
//!
//! Three coordinate frames meet here:
//! - world: meters, the frame of robot pose and grid origin
//! - grid: fractional cell indices, row 0 at the top of the image but the
//!   bottom of the world Y axis
//! - surface: pixels on the drawing surface
//!
//! The base scale fits the grid into 80% of the surface at zoom 1 and
//! pan (0, 0); zoom and pan then act on top of it.

use crate::model::OccupancyGrid;

pub const ZOOM_MIN: f32 = 0.5;
pub const ZOOM_MAX: f32 = 5.0;

/// Multiplicative zoom step per discrete gesture (±10%)
const ZOOM_STEP_IN: f32 = 1.1;
const ZOOM_STEP_OUT: f32 = 0.9;

/// Fraction of the surface the grid is fitted into at zoom 1
const FIT_FRACTION: f32 = 0.8;

/// Drawing surface dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Zoom level and pan offset of the view.
/// Zoom is always clamped to [0.5, 5.0]; pan is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f32,
    pan: (f32, f32),
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP_IN);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP_OUT);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Accumulate a drag delta in surface pixels
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Restore zoom 1.0 and pan (0, 0)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Resolved mapping between grid/world coordinates and surface pixels for
/// one grid, view transform and viewport. Pure data; build it per render
/// pass or per click.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceMapping {
    origin_px: (f32, f32),
    scale: f32,
    base_scale: f32,
    grid_width: f32,
    grid_height: f32,
    resolution: f32,
    world_origin: (f32, f32),
}

impl SurfaceMapping {
    pub fn new(grid: &OccupancyGrid, view: &ViewTransform, viewport: Viewport) -> Self {
        let grid_width = grid.width() as f32;
        let grid_height = grid.height() as f32;
        let base_scale =
            (viewport.width / grid_width).min(viewport.height / grid_height) * FIT_FRACTION;
        let scale = base_scale * view.zoom();
        let (pan_x, pan_y) = view.pan();
        let origin_px = (
            viewport.width / 2.0 - grid_width * scale / 2.0 + pan_x,
            viewport.height / 2.0 - grid_height * scale / 2.0 + pan_y,
        );
        let origin = grid.origin();
        Self {
            origin_px,
            scale,
            base_scale,
            grid_width,
            grid_height,
            resolution: grid.resolution(),
            world_origin: (origin.x, origin.y),
        }
    }

    /// Surface pixel of grid cell (0, 0)
    pub fn origin_px(&self) -> (f32, f32) {
        self.origin_px
    }

    /// Pixels per grid cell after zoom
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pixels per grid cell at zoom 1
    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    /// Grid cell (fractional) to surface pixel
    pub fn grid_to_surface(&self, gx: f32, gy: f32) -> (f32, f32) {
        (
            self.origin_px.0 + gx * self.scale,
            self.origin_px.1 + gy * self.scale,
        )
    }

    /// World meters to fractional grid cell, Y flipped
    pub fn world_to_grid(&self, wx: f32, wy: f32) -> (f32, f32) {
        (
            (wx - self.world_origin.0) / self.resolution,
            self.grid_height - (wy - self.world_origin.1) / self.resolution,
        )
    }

    /// World meters to surface pixel
    pub fn world_to_surface(&self, wx: f32, wy: f32) -> (f32, f32) {
        let (gx, gy) = self.world_to_grid(wx, wy);
        self.grid_to_surface(gx, gy)
    }

    /// Surface pixel back to world meters (the click path)
    pub fn surface_to_world(&self, px: f32, py: f32) -> (f32, f32) {
        let gx = (px - self.origin_px.0) / self.scale;
        let gy = (py - self.origin_px.1) / self.scale;
        (
            gx * self.resolution + self.world_origin.0,
            (self.grid_height - gy) * self.resolution + self.world_origin.1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorldPoint;

    fn grid(width: u32, height: u32, resolution: f32, ox: f32, oy: f32) -> OccupancyGrid {
        OccupancyGrid::new(
            width,
            height,
            resolution,
            WorldPoint::new(ox, oy),
            vec![0i8; (width * height) as usize],
        )
        .unwrap()
    }

    const VIEWPORT: Viewport = Viewport::new(800.0, 600.0);

    #[test]
    fn zoom_clamps_to_range() {
        let mut view = ViewTransform::new();
        for _ in 0..100 {
            view.zoom_in();
        }
        assert_eq!(view.zoom(), ZOOM_MAX);
        for _ in 0..100 {
            view.zoom_out();
        }
        assert_eq!(view.zoom(), ZOOM_MIN);
    }

    #[test]
    fn zoom_steps_are_multiplicative() {
        let mut view = ViewTransform::new();
        view.zoom_in();
        assert!((view.zoom() - 1.1).abs() < 1e-6);
        view.zoom_out();
        assert!((view.zoom() - 0.99).abs() < 1e-6);
    }

    #[test]
    fn pan_accumulates_without_clamping() {
        let mut view = ViewTransform::new();
        view.pan_by(10_000.0, -10_000.0);
        view.pan_by(5.0, 5.0);
        assert_eq!(view.pan(), (10_005.0, -9_995.0));
    }

    #[test]
    fn reset_restores_identity() {
        let mut view = ViewTransform::new();
        view.zoom_in();
        view.pan_by(40.0, -20.0);
        view.reset();
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(view.pan(), (0.0, 0.0));
    }

    #[test]
    fn base_scale_fits_grid_into_eighty_percent() {
        let g = grid(10, 10, 0.1, 0.0, 0.0);
        let mapping = SurfaceMapping::new(&g, &ViewTransform::new(), VIEWPORT);
        // min(800/10, 600/10) * 0.8 = 48
        assert!((mapping.base_scale() - 48.0).abs() < 1e-4);
        assert_eq!(mapping.scale(), mapping.base_scale());
    }

    #[test]
    fn cell_anchors_at_identity_transform() {
        let g = grid(10, 8, 0.1, 0.0, 0.0);
        let mapping = SurfaceMapping::new(&g, &ViewTransform::new(), VIEWPORT);
        let origin = mapping.origin_px();

        let (px, py) = mapping.grid_to_surface(0.0, 0.0);
        assert_eq!((px, py), origin);

        let (px, py) = mapping.grid_to_surface(9.0, 7.0);
        let s = mapping.base_scale();
        assert!((px - (origin.0 + 9.0 * s)).abs() < 1e-3);
        assert!((py - (origin.1 + 7.0 * s)).abs() < 1e-3);
    }

    #[test]
    fn world_to_grid_flips_y() {
        let g = grid(4, 4, 1.0, 0.0, 0.0);
        let mapping = SurfaceMapping::new(&g, &ViewTransform::new(), VIEWPORT);
        let (gx, gy) = mapping.world_to_grid(2.0, 2.0);
        assert!((gx - 2.0).abs() < 1e-5);
        assert!((gy - 2.0).abs() < 1e-5);

        // World Y at grid origin maps to the bottom row
        let (_, gy) = mapping.world_to_grid(0.0, 0.0);
        assert!((gy - 4.0).abs() < 1e-5);
    }

    #[test]
    fn forward_inverse_roundtrip_across_zoom_and_pan() {
        let g = grid(32, 24, 0.05, -1.5, -2.0);
        let points = [(0.0f32, 0.0f32), (-1.2, -1.9), (0.1, -0.8), (-0.35, -1.1)];
        let zooms = [ZOOM_MIN, 0.9, 1.0, 2.7, ZOOM_MAX];
        let pans = [(0.0f32, 0.0f32), (150.0, -75.0), (-4000.0, 2500.0)];

        for &zoom in &zooms {
            for &(pan_x, pan_y) in &pans {
                let mut view = ViewTransform::new();
                view.set_zoom(zoom);
                view.pan_by(pan_x, pan_y);
                let mapping = SurfaceMapping::new(&g, &view, VIEWPORT);

                for &(wx, wy) in &points {
                    let (px, py) = mapping.world_to_surface(wx, wy);
                    let (bx, by) = mapping.surface_to_world(px, py);
                    assert!(
                        (bx - wx).abs() < 1e-3 && (by - wy).abs() < 1e-3,
                        "roundtrip failed at zoom {} pan ({}, {}): ({}, {}) -> ({}, {})",
                        zoom,
                        pan_x,
                        pan_y,
                        wx,
                        wy,
                        bx,
                        by
                    );
                }
            }
        }
    }

    #[test]
    fn pan_shifts_surface_positions_linearly() {
        let g = grid(10, 10, 0.1, 0.0, 0.0);
        let base = SurfaceMapping::new(&g, &ViewTransform::new(), VIEWPORT);
        let mut panned_view = ViewTransform::new();
        panned_view.pan_by(33.0, -12.0);
        let panned = SurfaceMapping::new(&g, &panned_view, VIEWPORT);

        let (x0, y0) = base.grid_to_surface(3.0, 4.0);
        let (x1, y1) = panned.grid_to_surface(3.0, 4.0);
        assert!((x1 - x0 - 33.0).abs() < 1e-4);
        assert!((y1 - y0 + 12.0).abs() < 1e-4);
    }
}
