//! Breadth-first graph search with a closed set.
//!
//! The frontier is FIFO, so the first victorious state dequeued sits at the
//! minimum depth. Every node lives in a pool-backed [`StateTree`]; nodes
//! found to be duplicates are released right away, closed nodes stay until
//! the search returns because their descendants point at them.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::error::SearchError;
use crate::pool::{NodeHandle, TracingObserver, DEFAULT_SLAB_NODES};
use crate::state::PuzzleState;
use crate::tree::{SolutionPath, StateTree};

/// How the closed set decides that a state was already seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Same hash and same contents
    #[default]
    Exact,
    /// Same hash only. A collision can prune a real path to the goal.
    HashOnly,
}

/// Configuration for the search
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub dedup: DedupMode,
    /// Nodes per pool slab
    pub slab_nodes: usize,
    /// Initial capacity of the closed set
    pub closed_capacity: usize,
    /// Log progress every this many examined states (0 disables)
    pub progress_interval: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dedup: DedupMode::Exact,
            slab_nodes: DEFAULT_SLAB_NODES,
            closed_capacity: 1 << 16,
            progress_interval: 1_000_000,
        }
    }
}

/// Result of a search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Path from the initial state to the goal, `None` if the deal is unsolvable
    pub solution: Option<SolutionPath>,
    /// States dequeued that were not already closed
    pub examined: u64,
    /// Highest frontier + closed size observed
    pub peak_live: u64,
    /// States dropped because their contents were already closed
    pub discarded: u64,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    /// Number of pours in the solution
    pub fn depth(&self) -> Option<usize> {
        self.solution.as_ref().map(SolutionPath::depth)
    }
}

/// States already examined, bucketed by hash
struct ClosedSet {
    mode: DedupMode,
    buckets: HashMap<u64, SmallVec<[NodeHandle; 1]>>,
    len: usize,
}

impl ClosedSet {
    fn new(mode: DedupMode, capacity: usize) -> Self {
        Self {
            mode,
            buckets: HashMap::with_capacity(capacity),
            len: 0,
        }
    }

    fn contains(&self, tree: &StateTree, state: &PuzzleState, hash: u64) -> bool {
        let Some(bucket) = self.buckets.get(&hash) else {
            return false;
        };
        match self.mode {
            DedupMode::HashOnly => true,
            DedupMode::Exact => bucket
                .iter()
                .any(|&h| tree.state(h).is_ok_and(|closed| closed == state)),
        }
    }

    fn insert(&mut self, hash: u64, handle: NodeHandle) {
        self.buckets.entry(hash).or_default().push(handle);
        self.len += 1;
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Search for a shortest sequence of pours from `initial` to a state where
/// every container is complete.
///
/// Returns `Ok` with `solution: None` when the frontier runs dry. Errors only
/// come from the node pool.
pub fn breadth_first_search(
    initial: &PuzzleState,
    config: &SearchConfig,
) -> Result<SearchOutcome, SearchError> {
    let start_time = Instant::now();
    info!(
        containers = initial.len(),
        dedup = ?config.dedup,
        "starting breadth-first search"
    );

    let mut tree = StateTree::with_observer(config.slab_nodes, Box::new(TracingObserver))?;
    let mut frontier: VecDeque<NodeHandle> = VecDeque::new();
    let mut closed = ClosedSet::new(config.dedup, config.closed_capacity);
    let mut children: Vec<PuzzleState> = Vec::new();

    let mut examined: u64 = 0;
    let mut discarded: u64 = 0;
    let mut peak_live: u64 = 1;

    frontier.push_back(tree.insert_root(initial.clone())?);

    loop {
        peak_live = peak_live.max((frontier.len() + closed.len()) as u64);

        let Some(handle) = frontier.pop_front() else {
            break;
        };

        let (hash, seen) = {
            let state = tree.state(handle)?;
            let hash = state.hash_value();
            (hash, closed.contains(&tree, state, hash))
        };
        if seen {
            // Queued before an identical sibling was closed
            tree.release(handle)?;
            discarded += 1;
            continue;
        }

        examined += 1;
        closed.insert(hash, handle);

        if config.progress_interval > 0 && examined % config.progress_interval == 0 {
            debug!(
                examined,
                frontier = frontier.len(),
                closed = closed.len(),
                depth = tree.depth(handle),
                "search progress"
            );
        }

        let state = tree.state(handle)?;
        if state.is_victorious() {
            let solution = tree.copy_whole_path(handle);
            let pending = frontier.len();
            for h in frontier.drain(..) {
                tree.release(h)?;
            }

            let elapsed = start_time.elapsed();
            info!(
                depth = solution.depth(),
                examined,
                peak_live,
                released = pending,
                elapsed_ms = elapsed.as_millis() as u64,
                "found solution"
            );
            return Ok(SearchOutcome {
                solution: Some(solution),
                examined,
                peak_live,
                discarded,
                elapsed,
            });
        }

        state.expand(&mut children);
        for child in children.drain(..) {
            let child_hash = child.hash_value();
            if closed.contains(&tree, &child, child_hash) {
                discarded += 1;
                continue;
            }
            frontier.push_back(tree.insert_child(child, handle)?);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        examined,
        peak_live,
        elapsed_ms = elapsed.as_millis() as u64,
        "frontier exhausted without a solution"
    );
    Ok(SearchOutcome {
        solution: None,
        examined,
        peak_live,
        discarded,
        elapsed,
    })
}
