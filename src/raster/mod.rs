mod canvas;

pub use canvas::{Canvas, TRANSPARENT};
