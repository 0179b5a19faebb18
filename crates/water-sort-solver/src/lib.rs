//! Water sort puzzle solver.
//!
//! States pack each 4-layer bottle into two bytes. A breadth-first search
//! over pours, deduplicated by a closed set, returns a shortest solution.
//! Search nodes live in a slab-backed pool that recycles freed slots.

pub mod color;
pub mod container;
pub mod error;
pub mod pool;
pub mod report;
pub mod search;
pub mod state;
pub mod tree;

// Re-export main types
pub use color::Color;
pub use container::{Container, LAYERS};
pub use error::{DealError, PoolError, SearchError};
pub use pool::{
    NodeHandle, NodePool, NoopObserver, PoolObserver, TracingObserver, DEFAULT_SLAB_NODES,
};
pub use report::{clock_format, describe_move, render_state, write_text_report, SolveOutput};
pub use search::{breadth_first_search, DedupMode, SearchConfig, SearchOutcome};
pub use state::{Action, Deal, Move, PuzzleState, MAX_CONTAINERS, MIN_CONTAINERS};
pub use tree::{SearchNode, SolutionPath, StateTree};
