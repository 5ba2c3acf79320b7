//! Terminal globe viewer: scanline texture mapping of tiled planet imagery
//! and viewport-driven vector tile loading.

pub mod app;
pub mod demo;
pub mod error;
pub mod geo;
pub mod map;
pub mod model;
pub mod raster;
pub mod scene;
pub mod texture;
pub mod tile;
pub mod ui;
pub mod vector;

pub use error::{Error, Result};
pub use model::MapModel;
