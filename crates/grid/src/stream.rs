use serde::{Deserialize, Serialize};

use crate::grid::{ChunkKey, VoxelGrid};

/// Streaming configuration: how many chunks around the tracked entity stay meshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Radius (in chunks, Chebyshev distance) of the view window.
    pub view_radius: i32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { view_radius: 1 }
    }
}

/// Tracks the chunk holding the primary entity and derives the view window.
///
/// Owned by the orchestrator; the grid itself stays a plain data store.
#[derive(Debug, Clone)]
pub struct StreamWindow {
    pub config: StreamConfig,
    recent: Option<ChunkKey>,
    stats: StreamStats,
}

/// Statistics from the last window change, for instrumentation.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub crossings: u64,
    pub view_chunk_count: usize,
}

impl StreamWindow {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            recent: None,
            stats: StreamStats::default(),
        }
    }

    /// The chunk recorded by the last [`StreamWindow::update_chunk`].
    pub fn recent_chunk(&self) -> Option<ChunkKey> {
        self.recent
    }

    /// Whether `key` differs from the recorded chunk.
    pub fn is_crossing(&self, key: ChunkKey) -> bool {
        self.recent != Some(key)
    }

    /// Record the chunk containing the tracked entity.
    pub fn update_chunk(&mut self, key: ChunkKey) {
        if self.recent.is_some() && self.is_crossing(key) {
            self.stats.crossings += 1;
        }
        tracing::debug!(?key, previous = ?self.recent, "stream window recentred");
        self.recent = Some(key);
    }

    /// Chunks inside the view window, in a stable order.
    ///
    /// Empty until a chunk has been recorded.
    pub fn view_chunks(&mut self, grid: &VoxelGrid) -> Vec<ChunkKey> {
        let _span = tracing::debug_span!("view_chunks").entered();
        let keys = match self.recent {
            Some(center) => grid.chunks_around(center, self.config.view_radius),
            None => Vec::new(),
        };
        self.stats.view_chunk_count = keys.len();
        keys
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}
