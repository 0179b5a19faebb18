//! Fixed-size node pool backed by slabs.
//!
//! The search creates and drops huge numbers of same-sized nodes. The pool
//! carves them out of large slabs instead of going to the global allocator
//! for each one, and recycles freed slots ("gaps") before growing.
//!
//! Nodes are addressed by [`NodeHandle`], an index triple rather than a raw
//! address. Each slot carries a generation counter so a handle that outlived
//! its node is rejected instead of aliasing whatever reused the slot.

use std::collections::{BTreeSet, VecDeque};
use std::mem;

use tracing::{debug, trace};

use crate::error::PoolError;

/// Nodes per slab when no size is given
pub const DEFAULT_SLAB_NODES: usize = 1 << 16;

/// Opaque reference to a live node in a [`NodePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    slab: u32,
    slot: u32,
    generation: u32,
}

impl NodeHandle {
    pub fn slab(&self) -> usize {
        self.slab as usize
    }

    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub(crate) fn not_live(&self) -> PoolError {
        PoolError::NotLive {
            slab: self.slab,
            slot: self.slot,
        }
    }
}

/// Diagnostic sink for pool activity. Every method defaults to doing nothing.
pub trait PoolObserver {
    fn slab_created(&mut self, _slab: usize, _nodes: usize, _bytes: usize) {}

    fn allocated(&mut self, _handle: NodeHandle, _reused_gap: bool, _available_bytes: usize) {}

    fn released(&mut self, _handle: NodeHandle, _gaps_in_slab: usize) {}
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PoolObserver for NoopObserver {}

/// Observer that forwards pool events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn slab_created(&mut self, slab: usize, nodes: usize, bytes: usize) {
        debug!(slab, nodes, bytes, "allocated slab");
    }

    fn allocated(&mut self, handle: NodeHandle, reused_gap: bool, available_bytes: usize) {
        trace!(
            slab = handle.slab,
            slot = handle.slot,
            reused_gap,
            available_bytes,
            "allocate"
        );
    }

    fn released(&mut self, handle: NodeHandle, gaps_in_slab: usize) {
        trace!(slab = handle.slab, slot = handle.slot, gaps_in_slab, "release");
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

struct Slab<T> {
    /// Bump cursor is `slots.len()`; capacity is reserved up front
    slots: Vec<Slot<T>>,
    available_bytes: usize,
    gaps: VecDeque<u32>,
}

/// A growable set of fixed-capacity slabs holding values of one type
pub struct NodePool<T> {
    slabs: Vec<Slab<T>>,
    slab_nodes: usize,
    unit_bytes: usize,
    slab_bytes: usize,
    current: usize,
    /// Slabs that currently have at least one gap, lowest index first
    gapped: BTreeSet<usize>,
    live: usize,
    observer: Box<dyn PoolObserver>,
}

impl<T> NodePool<T> {
    /// Create a pool whose slabs hold `slab_nodes` nodes each. The first
    /// slab is reserved immediately.
    ///
    /// Fails with [`PoolError::OutOfMemory`] when a slab of that size cannot
    /// be addressed or reserved.
    pub fn new(slab_nodes: usize) -> Result<Self, PoolError> {
        Self::with_observer(slab_nodes, Box::new(NoopObserver))
    }

    pub fn with_observer(
        slab_nodes: usize,
        observer: Box<dyn PoolObserver>,
    ) -> Result<Self, PoolError> {
        let slab_nodes = slab_nodes.max(1);
        let unit_bytes = mem::size_of::<Slot<T>>().max(1);
        // Slot indices are stored as u32
        let slab_bytes = u32::try_from(slab_nodes)
            .ok()
            .and_then(|_| slab_nodes.checked_mul(unit_bytes))
            .ok_or(PoolError::OutOfMemory {
                nodes: slab_nodes,
                bytes: slab_nodes.saturating_mul(unit_bytes),
            })?;

        let mut pool = Self {
            slabs: Vec::new(),
            slab_nodes,
            unit_bytes,
            slab_bytes,
            current: 0,
            gapped: BTreeSet::new(),
            live: 0,
            observer,
        };
        pool.push_slab()?;
        Ok(pool)
    }

    /// Store `value` and return its handle.
    ///
    /// A gap in the lowest-indexed slab that has one is reused first (oldest
    /// gap of that slab first). Otherwise the value goes to the next unused
    /// slot of the current slab, which is replaced by a fresh slab once it
    /// has less than one node's worth of bytes left.
    pub fn allocate(&mut self, value: T) -> Result<NodeHandle, PoolError> {
        if self.slabs[self.current].available_bytes < self.unit_bytes {
            self.push_slab()?;
        }

        while let Some(&slab_index) = self.gapped.first() {
            let slab = &mut self.slabs[slab_index];
            let Some(slot_index) = slab.gaps.pop_front() else {
                self.gapped.remove(&slab_index);
                continue;
            };
            if slab.gaps.is_empty() {
                self.gapped.remove(&slab_index);
            }

            let slot = &mut slab.slots[slot_index as usize];
            slot.value = Some(value);
            slab.available_bytes -= self.unit_bytes;

            let handle = NodeHandle {
                slab: slab_index as u32,
                slot: slot_index,
                generation: slot.generation,
            };
            let available = slab.available_bytes;
            self.live += 1;
            self.observer.allocated(handle, true, available);
            return Ok(handle);
        }

        let slab = &mut self.slabs[self.current];
        let slot_index = slab.slots.len() as u32;
        slab.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        slab.available_bytes -= self.unit_bytes;

        let handle = NodeHandle {
            slab: self.current as u32,
            slot: slot_index,
            generation: 0,
        };
        let available = slab.available_bytes;
        self.live += 1;
        self.observer.allocated(handle, false, available);
        Ok(handle)
    }

    /// Take the value out of a live slot and queue the slot for reuse.
    pub fn release(&mut self, handle: NodeHandle) -> Result<T, PoolError> {
        let slabs = self.slabs.len();
        let slab = self
            .slabs
            .get_mut(handle.slab as usize)
            .ok_or(PoolError::UnknownSlab {
                slab: handle.slab,
                slabs,
            })?;
        let slot = slab
            .slots
            .get_mut(handle.slot as usize)
            .ok_or(PoolError::UnknownSlot {
                slab: handle.slab,
                slot: handle.slot,
            })?;

        if slot.generation != handle.generation {
            return Err(handle.not_live());
        }
        let value = slot.value.take().ok_or_else(|| handle.not_live())?;
        slot.generation = slot.generation.wrapping_add(1);

        slab.available_bytes += self.unit_bytes;
        slab.gaps.push_back(handle.slot);
        let gaps = slab.gaps.len();
        self.gapped.insert(handle.slab as usize);
        self.live -= 1;
        self.observer.released(handle, gaps);
        Ok(value)
    }

    /// The value behind `handle`, if it is still live
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        let slot = self
            .slabs
            .get(handle.slab as usize)?
            .slots
            .get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live nodes
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Bytes one node occupies inside a slab
    pub fn unit_bytes(&self) -> usize {
        self.unit_bytes
    }

    /// Unclaimed bytes left in `slab`, counting its gaps
    pub fn available_bytes(&self, slab: usize) -> Option<usize> {
        self.slabs.get(slab).map(|s| s.available_bytes)
    }

    /// Total bytes reserved across all slabs
    pub fn reserved_bytes(&self) -> usize {
        self.slabs.len().saturating_mul(self.slab_bytes)
    }

    fn push_slab(&mut self) -> Result<(), PoolError> {
        let bytes = self.slab_bytes;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(self.slab_nodes)
            .map_err(|_| PoolError::OutOfMemory {
                nodes: self.slab_nodes,
                bytes,
            })?;

        self.slabs.push(Slab {
            slots,
            available_bytes: bytes,
            gaps: VecDeque::new(),
        });
        self.current = self.slabs.len() - 1;
        self.observer
            .slab_created(self.current, self.slab_nodes, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn test_allocate_and_release() {
        let mut pool = NodePool::new(4).unwrap();
        let a = pool.allocate("a").unwrap();
        let b = pool.allocate("b").unwrap();

        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.get(b), Some(&"b"));
        assert_eq!(pool.live(), 2);

        assert_eq!(pool.release(a), Ok("a"));
        assert!(!pool.contains(a));
        assert_eq!(pool.live(), 1);
    }

    #[test]
    fn test_full_slab_appends_a_new_one() {
        let mut pool = NodePool::new(2).unwrap();
        let handles: Vec<_> = (0..5).map(|i| pool.allocate(i).unwrap()).collect();

        assert_eq!(pool.slab_count(), 3);
        let slabs: Vec<_> = handles.iter().map(NodeHandle::slab).collect();
        assert_eq!(slabs, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_gaps_reused_from_lowest_slab_in_fifo_order() {
        let mut pool = NodePool::new(2).unwrap();
        let h: Vec<_> = (0..6).map(|i| pool.allocate(i).unwrap()).collect();

        pool.release(h[5]).unwrap();
        pool.release(h[1]).unwrap();
        pool.release(h[0]).unwrap();

        let first = pool.allocate(10).unwrap();
        let second = pool.allocate(11).unwrap();
        let third = pool.allocate(12).unwrap();

        assert_eq!((first.slab(), first.slot()), (0, 1));
        assert_eq!((second.slab(), second.slot()), (0, 0));
        assert_eq!((third.slab(), third.slot()), (2, 1));
        assert_eq!(pool.slab_count(), 3);
    }

    #[test]
    fn test_available_bytes_tracks_live_nodes() {
        let mut pool = NodePool::new(8).unwrap();
        let unit = pool.unit_bytes();
        let full = 8 * unit;

        let h: Vec<_> = (0..3).map(|i| pool.allocate(i).unwrap()).collect();
        assert_eq!(pool.available_bytes(0), Some(full - 3 * unit));

        pool.release(h[1]).unwrap();
        assert_eq!(pool.available_bytes(0), Some(full - 2 * unit));
        assert_eq!(pool.reserved_bytes(), full);
    }

    #[test]
    fn test_double_release_is_an_error() {
        let mut pool = NodePool::new(4).unwrap();
        let a = pool.allocate(1u64).unwrap();
        pool.release(a).unwrap();

        assert_eq!(pool.release(a), Err(PoolError::NotLive { slab: 0, slot: 0 }));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut pool = NodePool::new(4).unwrap();
        let old = pool.allocate(1u64).unwrap();
        pool.release(old).unwrap();
        let new = pool.allocate(2u64).unwrap();

        assert_eq!((old.slab(), old.slot()), (new.slab(), new.slot()));
        assert_eq!(pool.get(old), None);
        assert!(pool.release(old).is_err());
        assert_eq!(pool.get(new), Some(&2));
    }

    #[test]
    fn test_foreign_handle_is_an_error() {
        let mut other = NodePool::new(2).unwrap();
        let handles: Vec<_> = (0..5).map(|i| other.allocate(i).unwrap()).collect();

        let mut pool: NodePool<i32> = NodePool::new(2).unwrap();
        assert!(matches!(
            pool.release(handles[4]),
            Err(PoolError::UnknownSlab { slab: 2, slabs: 1 })
        ));
        assert!(matches!(
            pool.release(handles[1]),
            Err(PoolError::UnknownSlot { slab: 0, slot: 1 })
        ));
    }

    #[test]
    fn test_oversized_slab_is_out_of_memory() {
        assert!(matches!(
            NodePool::<u64>::new(usize::MAX),
            Err(PoolError::OutOfMemory { nodes: usize::MAX, .. })
        ));
        assert!(matches!(
            NodePool::<u64>::new(usize::MAX / 2),
            Err(PoolError::OutOfMemory { .. })
        ));
        assert!(matches!(
            NodePool::<u8>::new((u32::MAX as usize).saturating_add(1)),
            Err(PoolError::OutOfMemory { .. })
        ));
    }

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl PoolObserver for Recorder {
        fn slab_created(&mut self, slab: usize, _nodes: usize, _bytes: usize) {
            self.events.borrow_mut().push(format!("slab {slab}"));
        }

        fn allocated(&mut self, handle: NodeHandle, reused_gap: bool, _available_bytes: usize) {
            self.events
                .borrow_mut()
                .push(format!("alloc {} {}", handle.slot(), reused_gap));
        }

        fn released(&mut self, handle: NodeHandle, gaps_in_slab: usize) {
            self.events
                .borrow_mut()
                .push(format!("release {} {}", handle.slot(), gaps_in_slab));
        }
    }

    #[test]
    fn test_observer_sees_pool_activity() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder {
            events: Rc::clone(&events),
        };
        let mut pool = NodePool::with_observer(4, Box::new(recorder)).unwrap();

        let a = pool.allocate('a').unwrap();
        pool.release(a).unwrap();
        pool.allocate('b').unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["slab 0", "alloc 0 false", "release 0 1", "alloc 0 true"]
        );
    }

    fn release_plan() -> impl Strategy<Value = (Vec<usize>, usize, usize)> {
        (1usize..64).prop_flat_map(|n| {
            (
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                0..=n,
                0usize..64,
            )
        })
    }

    proptest! {
        #[test]
        fn reallocation_never_hands_out_a_live_slot(
            slab_nodes in 1usize..9,
            (order, released, extra) in release_plan(),
        ) {
            let mut pool = NodePool::new(slab_nodes).unwrap();
            let handles: Vec<_> = (0..order.len()).map(|i| pool.allocate(i).unwrap()).collect();

            for &i in &order[..released] {
                prop_assert_eq!(pool.release(handles[i]).unwrap(), i);
            }

            let mut live: HashSet<(usize, usize)> = order[released..]
                .iter()
                .map(|&i| (handles[i].slab(), handles[i].slot()))
                .collect();
            for value in 0..extra {
                let h = pool.allocate(1000 + value).unwrap();
                prop_assert!(live.insert((h.slab(), h.slot())));
            }

            prop_assert_eq!(pool.live(), live.len());
            for slab in 0..pool.slab_count() {
                let in_slab = live.iter().filter(|(s, _)| *s == slab).count();
                prop_assert_eq!(
                    pool.available_bytes(slab).unwrap(),
                    (slab_nodes - in_slab) * pool.unit_bytes()
                );
            }
        }
    }
}
