//! Pool-backed search tree: states linked to the parent that produced them.

use crate::error::PoolError;
use crate::pool::{NodeHandle, NodePool, PoolObserver};
use crate::state::{Move, PuzzleState};

/// A state plus the link to its parent
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub state: PuzzleState,
    pub parent: Option<NodeHandle>,
}

/// Every state the search currently holds.
///
/// Parents are never released while a descendant is live, because the
/// search only releases nodes that were never expanded.
pub struct StateTree {
    pool: NodePool<SearchNode>,
}

impl StateTree {
    pub fn new(slab_nodes: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: NodePool::new(slab_nodes)?,
        })
    }

    pub fn with_observer(
        slab_nodes: usize,
        observer: Box<dyn PoolObserver>,
    ) -> Result<Self, PoolError> {
        Ok(Self {
            pool: NodePool::with_observer(slab_nodes, observer)?,
        })
    }

    pub fn insert_root(&mut self, state: PuzzleState) -> Result<NodeHandle, PoolError> {
        self.pool.allocate(SearchNode {
            state,
            parent: None,
        })
    }

    pub fn insert_child(
        &mut self,
        state: PuzzleState,
        parent: NodeHandle,
    ) -> Result<NodeHandle, PoolError> {
        self.pool.allocate(SearchNode {
            state,
            parent: Some(parent),
        })
    }

    /// Drop a node, returning its state
    pub fn release(&mut self, handle: NodeHandle) -> Result<PuzzleState, PoolError> {
        self.pool.release(handle).map(|node| node.state)
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SearchNode> {
        self.pool.get(handle)
    }

    /// The state behind a handle the caller knows to be live
    pub fn state(&self, handle: NodeHandle) -> Result<&PuzzleState, PoolError> {
        self.node(handle)
            .map(|n| &n.state)
            .ok_or_else(|| handle.not_live())
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.node(handle).and_then(|n| n.parent)
    }

    /// Number of parent links between `handle` and the root
    pub fn depth(&self, handle: NodeHandle) -> usize {
        let mut depth = 0;
        let mut current = self.parent(handle);
        while let Some(h) = current {
            depth += 1;
            current = self.parent(h);
        }
        depth
    }

    /// Clone every state from the root down to `handle` into a path that
    /// no longer depends on the tree.
    pub fn copy_whole_path(&self, handle: NodeHandle) -> SolutionPath {
        let mut states = Vec::with_capacity(self.depth(handle) + 1);
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.node(h) else { break };
            states.push(node.state.clone());
            current = node.parent;
        }
        states.reverse();
        SolutionPath { states }
    }

    /// Number of live nodes
    pub fn live(&self) -> usize {
        self.pool.live()
    }

    pub fn pool(&self) -> &NodePool<SearchNode> {
        &self.pool
    }
}

/// States from the initial deal to a goal, owned independently of the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionPath {
    states: Vec<PuzzleState>,
}

impl SolutionPath {
    pub fn states(&self) -> &[PuzzleState] {
        &self.states
    }

    /// Number of pours
    pub fn depth(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn initial(&self) -> Option<&PuzzleState> {
        self.states.first()
    }

    pub fn goal(&self) -> Option<&PuzzleState> {
        self.states.last()
    }

    /// The pour made at each step, replayed from consecutive states
    pub fn moves(&self) -> Vec<Move> {
        self.states
            .windows(2)
            .filter_map(|pair| pair[1].describe_action(&pair[0]))
            .collect()
    }
}
