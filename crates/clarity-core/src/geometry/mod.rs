//! Output sizing, viewport fitting, and per-orientation quad geometry.

pub mod extent;
pub mod orientation;
pub mod viewport;

pub use extent::{Extent, target_extent};
pub use orientation::{Orientation, QuadGeometry, QuadVertex};
pub use viewport::Viewport;
