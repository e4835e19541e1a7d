//! Shared geometry primitives used by the window core and the renderer hooks.

pub mod geometry;

pub use geometry::{Geometry, Margins, Point, Size};
