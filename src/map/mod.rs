pub mod geometry;
pub mod globe;
pub mod projection;
pub mod renderer;
pub mod view;

pub use globe::Globe;
pub use projection::{ProjectionSampler, TileProjection};
pub use renderer::VectorOverlay;
pub use view::{Projection, ViewParams};
