use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The provider accepts at most this many trackers per batch call.
pub const PROVIDER_MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_BUCKET_SIZE: usize = 35;
pub const DEFAULT_BUCKET_WINDOW: Duration = Duration::from_secs(5);
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 8;

/// Tuning for the synchronisation paths. Credentials are not part of this; they always come from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Orders are tracked when one of their payment gateways equals this name (case-insensitive)
    pub tracked_gateway: String,
    /// Chunk size for backfills. Never larger than [`PROVIDER_MAX_BATCH_SIZE`].
    pub batch_size: usize,
    /// Dispatcher calls admitted per window
    pub bucket_size: usize,
    pub bucket_window: Duration,
    /// Number of transaction lookups in flight at once during a backfill
    pub resolve_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tracked_gateway: "paypal".to_string(),
            batch_size: PROVIDER_MAX_BATCH_SIZE,
            bucket_size: DEFAULT_BUCKET_SIZE,
            bucket_window: DEFAULT_BUCKET_WINDOW,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }
}

impl SyncConfig {
    pub fn with_resolve_concurrency(mut self, concurrency: usize) -> Self {
        self.resolve_concurrency = concurrency.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// The batch size actually used: between 1 and [`PROVIDER_MAX_BATCH_SIZE`].
    pub fn chunk_size(&self) -> usize {
        self.batch_size.clamp(1, PROVIDER_MAX_BATCH_SIZE)
    }
}
