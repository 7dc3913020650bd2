//! Store factory
//!
//! Builds the configured throttle store behind a shared trait object so the
//! rest of the server does not care which bounding strategy is in use.

use crate::config::{StoreConfig, StoreType};
use std::sync::Arc;
use turnstile::{CappedStore, SweepStore, ThrottleStore};

/// Create the throttle store described by the configuration
pub fn build_store(config: &StoreConfig) -> Arc<dyn ThrottleStore> {
    match config.store_type {
        StoreType::Sweep => {
            let mut builder = SweepStore::builder()
                .capacity(config.capacity)
                .retention(config.retention)
                .sweep_interval(config.sweep_interval);
            if config.shards > 0 {
                builder = builder.shards(config.shards);
            }
            Arc::new(builder.build())
        }
        StoreType::Capped => {
            let mut builder = CappedStore::builder().capacity(config.capacity);
            if config.shards > 0 {
                builder = builder.shards(config.shards);
            }
            Arc::new(builder.build())
        }
    }
}
