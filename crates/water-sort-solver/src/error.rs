use std::path::PathBuf;

use crate::color::Color;
use crate::container::LAYERS;

/// Errors raised while building a container or a puzzle state.
#[derive(Debug, thiserror::Error)]
pub enum DealError {
    #[error("container has an empty layer {layer} below liquid (layers top-first: {layers:?})")]
    FloatingLiquid {
        layer: usize,
        layers: [Option<Color>; LAYERS],
    },

    #[error("puzzle must have between {min} and {max} containers, got {count}")]
    ContainerCount { count: usize, min: usize, max: usize },

    #[error("failed to read deal from {}: {source}", path.display())]
    DealRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse deal: {0}")]
    DealParse(#[from] serde_json::Error),
}

/// Errors raised by the node pool.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("could not reserve a slab of {nodes} nodes ({bytes} bytes)")]
    OutOfMemory { nodes: usize, bytes: usize },

    #[error("handle refers to slab {slab}, but only {slabs} slabs exist")]
    UnknownSlab { slab: u32, slabs: usize },

    #[error("handle refers to slot {slot} of slab {slab}, which was never handed out")]
    UnknownSlot { slab: u32, slot: u32 },

    #[error("slot {slot} of slab {slab} is not live (double release or stale handle)")]
    NotLive { slab: u32, slot: u32 },
}

/// Errors that abort a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("node pool error: {0}")]
    Pool(#[from] PoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_count_display() {
        let err = DealError::ContainerCount {
            count: 2,
            min: 3,
            max: 17,
        };
        assert_eq!(
            err.to_string(),
            "puzzle must have between 3 and 17 containers, got 2"
        );
    }

    #[test]
    fn test_search_error_wraps_pool_error() {
        let err = SearchError::from(PoolError::NotLive { slab: 0, slot: 4 });
        assert_eq!(
            err.to_string(),
            "node pool error: slot 4 of slab 0 is not live (double release or stale handle)"
        );
    }
}
