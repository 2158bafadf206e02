pub mod colormap;
pub mod config;
pub mod error;
pub mod metric;
pub mod province;
pub mod render;
pub mod scene;

pub use config::RenderSettings;
pub use error::{MapError, Result};
pub use metric::MetricTable;
pub use render::ChoroplethRenderer;
pub use scene::{Scene, build_scene};
