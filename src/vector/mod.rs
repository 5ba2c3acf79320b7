//! Vector tiles covering the viewport.
//!
//! [`VectorTileModel::set_viewport`] turns a bounding box and zoom level
//! into tile ranges and hands every newly requested tile to a bounded
//! worker pool. Decoded tiles come back as [`TileCompleted`] events on a
//! channel drained by the render loop.

mod job;
mod range;
mod source;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error};

use crate::error::Result;
use crate::geo::LatLonBox;
use crate::texture::level::{tile_level_for_radius, MAX_PROBED_LEVEL};
use crate::tile::{TileId, TileLayout};

pub use job::{RenderJob, TileCompleted};
pub use range::{lat2tile, lon2tile, tile2lat, tile2lon, tile_ranges, TileRange, MAX_TILE_LAT};
pub use source::{decode_document, DirVectorSource, VectorTileData, VectorTileSource};

/// Decrements the in-flight counter when a job finishes, panicking or not
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct VectorTileModel {
    source: Arc<dyn VectorTileSource>,
    layout: TileLayout,
    max_level: u32,
    pool: rayon::ThreadPool,
    sender: Sender<TileCompleted>,
    receiver: Receiver<TileCompleted>,
    level: Option<u32>,
    /// Tiles of the current viewport and the generation each was submitted in
    requested: HashMap<TileId, u64>,
    generation: u64,
    pending: Arc<AtomicUsize>,
}

impl VectorTileModel {
    /// Model decoding tiles on `threads` workers
    pub fn new(source: Arc<dyn VectorTileSource>, layout: TileLayout, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("vector-tile-{i}"))
            .panic_handler(|payload| {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                error!(panic = %msg, "vector tile job panicked");
            })
            .build()?;
        let (sender, receiver) = unbounded();

        Ok(Self {
            source,
            layout,
            max_level: MAX_PROBED_LEVEL,
            pool,
            sender,
            receiver,
            level: None,
            requested: HashMap::new(),
            generation: 0,
            pending: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn with_max_level(mut self, level: u32) -> Self {
        self.max_level = level.min(MAX_PROBED_LEVEL);
        self
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Level of the last viewport
    pub fn level(&self) -> Option<u32> {
        self.level
    }

    /// Zoom level matching a view radius in pixels
    pub fn tile_level_for(&self, radius: f64) -> u32 {
        tile_level_for_radius(&self.layout, radius).min(self.max_level)
    }

    /// Request the tiles covering `bbox` at `level`. Returns the number of
    /// jobs submitted; tiles already requested by the previous call at the
    /// same level are skipped.
    pub fn set_viewport(&mut self, bbox: &LatLonBox, level: u32) -> usize {
        let level_changed = self.level != Some(level);
        if level_changed {
            self.requested.clear();
            self.level = Some(level);
        }

        let ranges = tile_ranges(bbox, level, &self.layout);
        let tiles: Vec<TileId> = ranges.iter().flat_map(|r| r.tiles()).collect();
        let fresh: Vec<TileId> = tiles.iter().copied().filter(|id| !self.requested.contains_key(id)).collect();
        if level_changed || !fresh.is_empty() || tiles.len() != self.requested.len() {
            self.generation += 1;
        }

        for &id in &fresh {
            let job = RenderJob::new(id, self.generation, Arc::clone(&self.source), self.sender.clone());
            let pending = Arc::clone(&self.pending);
            pending.fetch_add(1, Ordering::SeqCst);
            self.pool.spawn(move || {
                let _guard = PendingGuard(pending);
                job.run();
            });
        }

        debug!(
            level,
            ranges = ranges.len(),
            tiles = tiles.len(),
            submitted = fresh.len(),
            generation = self.generation,
            "vector viewport"
        );
        let generation = self.generation;
        self.requested = tiles
            .into_iter()
            .map(|id| (id, self.requested.get(&id).copied().unwrap_or(generation)))
            .collect();
        fresh.len()
    }

    /// Whether a completed tile answers the request that is still live for
    /// its id. Events from an earlier request of a tile that left the view
    /// and came back are stale.
    pub fn is_current(&self, event: &TileCompleted) -> bool {
        self.requested.get(&event.id) == Some(&event.generation)
    }

    /// Whether `id` is part of the current viewport
    pub fn is_requested(&self, id: TileId) -> bool {
        self.requested.contains_key(&id)
    }

    /// Receiver for completion events
    pub fn completions(&self) -> Receiver<TileCompleted> {
        self.receiver.clone()
    }

    /// Completed tiles received so far, without blocking
    pub fn drain_completed(&self) -> Vec<TileCompleted> {
        self.receiver.try_iter().collect()
    }

    /// Jobs submitted and not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Block until every submitted job finished or `timeout` elapsed.
    /// Returns `true` if the pool went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.pending() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
