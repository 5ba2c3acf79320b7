use std::sync::Arc;

use crossbeam_channel::Sender;
use geojson::GeoJson;
use tracing::{trace, warn};

use super::source::{decode_document, VectorTileSource};
use crate::error::Error;
use crate::tile::TileId;

/// A decoded vector tile, delivered once per tile and generation
#[derive(Debug)]
pub struct TileCompleted {
    pub id: TileId,
    pub document: GeoJson,
    pub format: String,
    /// Viewport generation the tile was requested for
    pub generation: u64,
}

/// One-shot load and decode of a single vector tile
pub struct RenderJob {
    pub id: TileId,
    pub generation: u64,
    source: Arc<dyn VectorTileSource>,
    sender: Sender<TileCompleted>,
}

impl RenderJob {
    pub fn new(id: TileId, generation: u64, source: Arc<dyn VectorTileSource>, sender: Sender<TileCompleted>) -> Self {
        Self {
            id,
            generation,
            source,
            sender,
        }
    }

    pub fn run(self) {
        let data = match self.source.load_vector_tile(self.id) {
            Ok(data) => data,
            Err(Error::TileUnavailable(id)) => {
                trace!(tile = %id, "no vector tile");
                return;
            }
            Err(e) => {
                warn!(tile = %self.id, error = %e, "failed to load vector tile");
                return;
            }
        };

        let format = data.format.clone();
        match decode_document(self.id, data) {
            Ok(document) => {
                let event = TileCompleted {
                    id: self.id,
                    document,
                    format,
                    generation: self.generation,
                };
                // receiver gone means the model was dropped
                let _ = self.sender.send(event);
            }
            Err(e) => warn!(tile = %self.id, error = %e, "failed to decode vector tile"),
        }
    }
}
