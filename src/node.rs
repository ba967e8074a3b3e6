use crate::priority::PriorityTag;
use crate::queue::PriorityQueue;
use crate::stack::Stack;
use crate::state::StateRefId;
use crate::value::{NodeScope, Value};
use std::rc::Rc;

/// Arena key for a compiled [`Node`]. Assigned by whatever builds the graph
/// (out of scope here per spec §1); the kernel only ever indexes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A priority + optional barrier id attached to a step. Present only on
/// steps that must be scheduled rather than executed in-line — spec §3
/// "Step".
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub priority: PriorityTag,
    pub barrier_id: Option<u64>,
}

/// Where a `mov` reads its value from.
#[derive(Clone)]
pub enum MovFrom {
    Stack,
    A,
    B,
    /// `data.store` holds the literal payload directly (spec: "'value'→the
    /// literal `data.store`").
    Value(Value),
    /// `data.store` holds the [`StateRefId`] to resolve through the page/scope
    /// overlay chain.
    Store(StateRefId),
}

/// Where a `mov` writes its value to.
#[derive(Clone)]
pub enum MovTo {
    Stack,
    A,
    B,
    Store(StateRefId),
}

#[derive(Clone)]
pub struct Mov {
    pub from: MovFrom,
    pub to: MovTo,
    /// "don't derive yet, I only need identity" — passed through to
    /// `initRefInScope` when `from` is `Store`.
    pub soft_read: bool,
}

/// Signature for `compute` user functions. The queue is threaded through so
/// a function can observe/sample outstanding work; the kernel never calls
/// back into it itself.
pub type ComputeFn = Rc<dyn Fn(Value, &NodeScope, &Stack, &mut PriorityQueue) -> Value>;

#[derive(Clone)]
pub struct Compute {
    pub func: Option<ComputeFn>,
    /// If true, invoke directly; if false, wrap in `catch_unwind` isolation.
    pub safe: bool,
    pub pure: bool,
    /// If true, the return value is a predicate: falsy skips the rest of
    /// the node without failing it.
    pub filter: bool,
}

#[derive(Clone)]
pub enum StepKind {
    Mov(Mov),
    Compute(Compute),
}

#[derive(Clone)]
pub struct Step {
    pub kind: StepKind,
    pub order: Option<Order>,
}

impl Step {
    pub fn mov(mov: Mov) -> Self {
        Step { kind: StepKind::Mov(mov), order: None }
    }

    pub fn compute(compute: Compute) -> Self {
        Step { kind: StepKind::Compute(compute), order: None }
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

/// Recognized keys of a node's `meta` map (spec §3 "Node").
#[derive(Debug, Clone, Default)]
pub struct NodeMeta {
    pub op: Option<String>,
    pub need_fx_counter: bool,
    pub store_change: bool,
    pub warn_serialize: bool,
}

/// A compiled unit of work. Immutable after construction.
pub struct Node {
    pub id: NodeId,
    pub seq: Vec<Step>,
    pub next: Vec<NodeId>,
    /// Node-local metadata bag exposed to user functions as `scope`.
    /// Unrelated to [`crate::scope::Scope`] (a fork).
    pub scope: NodeScope,
    pub meta: NodeMeta,
}

impl Node {
    pub fn new(id: NodeId, seq: Vec<Step>, next: Vec<NodeId>) -> Self {
        Node { id, seq, next, scope: NodeScope::default(), meta: NodeMeta::default() }
    }
}
