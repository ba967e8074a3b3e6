use crate::node::NodeId;
use crate::page::PageHandle;
use crate::priority::PriorityTag;
use crate::stack::Stack;
use fxhash::FxHashSet;
use std::collections::VecDeque;

/// A queued intent to resume a node at a given step index, at a given
/// priority, with a tie-breaker id (spec §3 "Layer (queue entry)"). Owns its
/// `Stack` uniquely: a layer is removed from the queue while popped and
/// only one copy of it is ever live at a time, so no sharing is needed here
/// (sharing only happens once an activation *finishes*, via `Stack::parent`).
pub struct Layer {
    pub idx: usize,
    pub stack: Stack,
    pub priority: PriorityTag,
    pub id: u64,
}

/// De-dup key for a pending barrier arrival: `"{page.fullID}_{barrierID}"`
/// when a page is present, else the bare `barrierID`, else the sentinel for
/// "no barrier" (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarrierKey(String);

pub fn barrier_key(barrier_id: Option<u64>, page: Option<&PageHandle>) -> BarrierKey {
    match (barrier_id, page) {
        (None, _) => BarrierKey("0".to_string()),
        (Some(id), Some(page)) => BarrierKey(format!("{}_{}", page.borrow().full_id, id)),
        (Some(id), None) => BarrierKey(id.to_string()),
    }
}

/// `a` keeps priority over `b` iff `priority(a) < priority(b)`, or equal
/// priorities with `a.id <= b.id` (spec invariant 3).
fn keeps_priority(a: &Layer, b: &Layer) -> bool {
    a.priority < b.priority || (a.priority == b.priority && a.id <= b.id)
}

/// A skew heap node. Standard merge: pick the smaller root, swap its
/// children, recursively merge the (pre-swap) right child into the loser
/// (spec §4.1 "Merge").
struct HeapNode {
    layer: Layer,
    left: Option<Box<HeapNode>>,
    right: Option<Box<HeapNode>>,
}

fn merge(a: Option<Box<HeapNode>>, b: Option<Box<HeapNode>>) -> Option<Box<HeapNode>> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(mut a), Some(b)) => {
            if !keeps_priority(&a.layer, &b.layer) {
                return merge(Some(b), Some(a));
            }
            let old_right = a.right.take();
            a.right = merge(old_right, Some(b));
            std::mem::swap(&mut a.left, &mut a.right);
            Some(a)
        }
    }
}

/// Hybrid scheduler: buckets 0,1,2,5 are FIFO; buckets 3,4 (`barrier`,
/// `sampler`) share one skew heap. Not thread-safe — single drainer
/// (spec §4.1, §5).
pub struct PriorityQueue {
    child: VecDeque<Layer>,
    pure: VecDeque<Layer>,
    read: VecDeque<Layer>,
    effect: VecDeque<Layer>,
    heap: Option<Box<HeapNode>>,
    pub barriers: FxHashSet<BarrierKey>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        PriorityQueue {
            child: VecDeque::new(),
            pure: VecDeque::new(),
            read: VecDeque::new(),
            effect: VecDeque::new(),
            heap: None,
            barriers: FxHashSet::default(),
        }
    }

    /// Creates a fresh root `Stack` and enqueues `idx=0, id=0` at `priority`
    /// (spec §4.1 `pushFirstHeapItem`).
    pub fn push_first_heap_item(&mut self, stack: Stack, priority: PriorityTag) {
        self.push_heap(0, stack, priority, 0);
    }

    /// General enqueue, used both for root seeding and for re-enqueuing at
    /// priority boundaries (spec §4.1 `pushHeap`).
    pub fn push_heap(&mut self, idx: usize, stack: Stack, priority: PriorityTag, id: u64) {
        let layer = Layer { idx, stack, priority, id };
        match priority {
            PriorityTag::Child => self.child.push_back(layer),
            PriorityTag::Pure => self.pure.push_back(layer),
            PriorityTag::Read => self.read.push_back(layer),
            PriorityTag::Effect => self.effect.push_back(layer),
            PriorityTag::Barrier | PriorityTag::Sampler => {
                let node = Box::new(HeapNode { layer, left: None, right: None });
                self.heap = merge(self.heap.take(), Some(node));
            }
        }
    }

    /// Scans buckets in order 0..5, returning the first non-empty. For the
    /// shared heap bucket, pops the root and re-merges its children (spec
    /// §4.1 "Drain discipline").
    pub fn delete_min(&mut self) -> Option<Layer> {
        if let Some(layer) = self.child.pop_front() {
            return Some(layer);
        }
        if let Some(layer) = self.pure.pop_front() {
            return Some(layer);
        }
        if let Some(layer) = self.read.pop_front() {
            return Some(layer);
        }
        if let Some(root) = self.heap.take() {
            self.heap = merge(root.left, root.right);
            return Some(root.layer);
        }
        if let Some(layer) = self.effect.pop_front() {
            return Some(layer);
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.child.is_empty()
            && self.pure.is_empty()
            && self.read.is_empty()
            && self.heap.is_none()
            && self.effect.is_empty()
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
