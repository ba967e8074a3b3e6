//! A priority-ordered, reentrancy-safe reactive dataflow scheduler.
//!
//! Given a compiled graph of [`Node`]s and a `launch` call, the kernel
//! drains a hybrid priority queue — four FIFO buckets plus a shared skew
//! heap for join barriers and samplers — executing each node's step
//! sequence and writing results back into whichever state registry (global,
//! page, or scope) owns the touched cell. Building the graph itself (the
//! compiler, the public event/store/effect surface, serialization formats)
//! is out of scope; this crate only schedules and executes.

pub(crate) mod error;
pub(crate) mod graph;
pub(crate) mod interpreter;
pub(crate) mod kernel;
pub(crate) mod launch;
pub(crate) mod node;
pub(crate) mod page;
pub(crate) mod priority;
pub(crate) mod queue;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod stack;
pub(crate) mod state;
pub(crate) mod value;

pub(crate) mod innerlude {
    pub use crate::error::*;
    pub use crate::graph::*;
    pub use crate::kernel::*;
    pub use crate::launch::*;
    pub use crate::node::*;
    pub use crate::page::{Page, PageHandle};
    pub use crate::priority::PriorityTag;
    pub use crate::queue::PriorityQueue;
    pub use crate::scope::{Scope, ScopeHandle, ScopeValues};
    pub use crate::stack::{get_value, Stack};
    pub use crate::state::*;
    pub use crate::value::{NodeScope, Value};
}

pub use crate::innerlude::{
    get_value, launch, launch_reentrant, launch_unit, ActivationOutcome, BeforeCmd, Compute,
    ComputeFailure, ComputeFn, DeriveFn, DiagnosticSink, Graph, InspectorFn, Kernel, KernelError,
    LaunchConfig, LogDiagnosticSink, Mov, MovFrom, MovTo, Node, NodeId, NodeMeta, NodeScope, Order,
    Page, PageHandle, PriorityQueue, PriorityTag, RefMeta, Scope, ScopeHandle, ScopeValues,
    SerializeMeta, Stack, StateRef, StateRefId, Step, StepKind, UnitId, Value,
};

pub mod prelude {
    pub use crate::{
        launch, launch_reentrant, launch_unit, Kernel, LaunchConfig, Node, NodeId, UnitId, Value,
    };
}
