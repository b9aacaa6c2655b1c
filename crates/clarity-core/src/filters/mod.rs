//! Declarative filter definitions and the catalogs that cycle through them.
//!
//! Two independent catalogs exist: video filters (ordered shader pass lists
//! applied after color conversion) and input filters (a color matrix applied
//! during the YUV→RGB pass). Both are loaded from one JSON document with
//! `"Video"` and `"Input"` collections.

pub mod catalog;
pub mod definition;
pub mod model;

pub use catalog::FilterCatalog;
pub use definition::{FilterDefinition, INVALID_FILTER_NAME, InputFilter, VideoFilter};
pub use model::FilterModel;
