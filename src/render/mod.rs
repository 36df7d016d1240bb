//! Spatial rendering pipeline.
//!
//! [`transform`] owns the view state and the forward/inverse coordinate
//! math, [`scene`] turns a map model into an ordered list of draw
//! commands, and [`svg`] is the thin adapter that writes those commands
//! out as pixels. Only the adapter touches a drawing backend; everything
//! upstream is pure and testable.

pub mod scene;
pub mod svg;
pub mod transform;

pub use scene::{render, DrawCommand, Palette, SceneConfig};
pub use transform::{SurfaceMapping, ViewTransform, Viewport, ZOOM_MAX, ZOOM_MIN};
