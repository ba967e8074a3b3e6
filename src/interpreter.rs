use crate::error::{ComputeFailure, DiagnosticSink};
use crate::node::{Compute, MovFrom, MovTo, Node, StepKind};
use crate::page::get_page_for_ref;
use crate::queue::{barrier_key, PriorityQueue};
use crate::resolver::{get_page_ref, init_ref_in_scope, read_ref, write_ref, RefLocation, RefTable};
use crate::stack::Stack;
use crate::value::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Ambient state snapshotted/restored around a drain (spec §4.4, §9 "Global
/// ambient state"). Bundled into a context object rather than kept in
/// process-wide globals/thread-locals, per the spec's own suggestion for a
/// strictly typed implementation.
#[derive(Clone, Default)]
pub struct Ambient {
    pub is_root: bool,
    pub current_page: Option<crate::page::PageHandle>,
    pub fork_page: Option<crate::scope::ScopeHandle>,
    pub is_watch: bool,
    pub is_pure: bool,
}

/// Outcome of running a node's step sequence from a given index.
pub enum Outcome {
    /// The node ran to completion (possibly after a `compute` step mutated
    /// `stack.value`); successors should be seeded.
    Finished,
    /// A `compute` step failed (unsafe fn panicked) or a filter rejected —
    /// no successors are scheduled.
    Stopped,
    /// A priority/barrier boundary caused the current layer to be
    /// re-enqueued; the drain should move on to the next popped layer.
    Deferred,
}

/// Executes one node's step sequence starting at `idx` (spec §4.3).
pub fn run_node(
    stack: &mut Stack,
    start_idx: usize,
    layer_priority: crate::priority::PriorityTag,
    node: &Node,
    refs: &mut RefTable,
    queue: &mut PriorityQueue,
    ambient: &mut Ambient,
    diagnostics: &dyn DiagnosticSink,
) -> Outcome {
    let mut idx = start_idx;

    while idx < node.seq.len() {
        let step = &node.seq[idx];

        if let Some(order) = step.order {
            // "first step" means the entry point of *this* popped layer, not
            // the node's step 0 — a node may resume mid-sequence after a
            // prior deferral.
            let mismatched_priority = idx != start_idx || layer_priority != order.priority;
            if mismatched_priority {
                return defer(stack, idx, order, node, queue);
            }
            if let Some(barrier_id) = order.barrier_id {
                let page = stack.page.as_ref();
                let key = barrier_key(Some(barrier_id), page);
                queue.barriers.remove(&key);
            }
        }

        match &step.kind {
            StepKind::Mov(mov) => run_mov(stack, mov, refs),
            StepKind::Compute(compute) => {
                let stop = run_compute(stack, compute, node, ambient, queue, diagnostics);
                if stop {
                    return Outcome::Stopped;
                }
            }
        }

        idx += 1;
    }

    Outcome::Finished
}

/// A step's `order` didn't match the layer we're executing: re-enqueue and
/// abandon this activation for now (spec §4.3, "enforce priority").
fn defer(
    stack: &mut Stack,
    idx: usize,
    order: crate::node::Order,
    node: &Node,
    queue: &mut PriorityQueue,
) -> Outcome {
    let owned = std::mem::replace(stack, placeholder_stack(node));
    match order.barrier_id {
        Some(barrier_id) => {
            let key = barrier_key(Some(barrier_id), owned.page.as_ref());
            if queue.barriers.insert(key) {
                queue.push_heap(idx, owned, order.priority, barrier_id);
            }
            // else: an arrival for this barrier is already enqueued; the
            // `owned` stack is dropped here, collapsing the two arrivals.
        }
        None => {
            queue.push_heap(idx, owned, order.priority, 0);
        }
    }
    Outcome::Deferred
}

/// `std::mem::replace` needs *some* value to leave behind; this one is
/// dropped immediately by the caller and never observed.
fn placeholder_stack(node: &Node) -> Stack {
    Stack::root(node.id, Value::Null, None, None)
}

fn run_mov(stack: &mut Stack, mov: &crate::node::Mov, refs: &mut RefTable) {
    let value = match &mov.from {
        MovFrom::Stack => stack.value.clone(),
        MovFrom::A => stack.a.clone(),
        MovFrom::B => stack.b.clone(),
        MovFrom::Value(v) => v.clone(),
        MovFrom::Store(id) => {
            // If the page we're caching doesn't own `id`, advance `stack.page`
            // to the nearest enclosing page that does (spec §9, load-bearing
            // side effect), else materialize in the fork scope.
            let owns_current = stack.page.as_ref().map_or(false, |p| p.borrow().owns(*id));
            if !owns_current {
                if let Some(owner) = get_page_for_ref(stack.page.as_ref(), *id) {
                    stack.page = Some(owner);
                } else if let Some(scope) = stack.scope.clone() {
                    let _ = init_ref_in_scope(&scope, refs, *id, false, true, mov.soft_read);
                } else {
                    log::trace!("mov read {:?} with no page or scope; falling back to global ref", id);
                }
            }
            let loc = if let Some(owner) = get_page_for_ref(stack.page.as_ref(), *id) {
                RefLocation::Page(owner, *id)
            } else if let Some(scope) = &stack.scope {
                RefLocation::Scope(scope.clone(), *id)
            } else {
                RefLocation::Global(*id)
            };
            read_ref(refs, &loc)
        }
    };

    match &mov.to {
        MovTo::Stack => stack.value = value,
        MovTo::A => stack.a = value,
        MovTo::B => stack.b = value,
        MovTo::Store(target) => {
            match get_page_ref(stack.page.as_ref(), stack.scope.as_ref(), refs, *target, false) {
                Ok(loc) => write_ref(refs, &loc, value),
                Err(err) => log::error!("failed to resolve store target {:?}: {err}", target),
            }
        }
    }
}

/// Runs a `compute` step. Returns `true` if the node's execution should
/// stop here (failure or filter rejection) — spec §4.3.
fn run_compute(
    stack: &mut Stack,
    compute: &Compute,
    node: &Node,
    ambient: &mut Ambient,
    queue: &mut PriorityQueue,
    diagnostics: &dyn DiagnosticSink,
) -> bool {
    let func = match &compute.func {
        Some(f) => f.clone(),
        None => return false,
    };

    let saved_watch = ambient.is_watch;
    let saved_pure = ambient.is_pure;
    ambient.is_watch = node.meta.op.as_deref() == Some("watch");
    ambient.is_pure = compute.pure;

    let input = stack.value.clone();
    let node_scope = &node.scope;
    let result = if compute.safe {
        Some(func(input, node_scope, stack, queue))
    } else {
        match catch_unwind(AssertUnwindSafe(|| func(input, node_scope, stack, queue))) {
            Ok(value) => Some(value),
            Err(payload) => {
                let message = panic_message(&payload);
                diagnostics.report(ComputeFailure { node: node.id, message });
                None
            }
        }
    };

    ambient.is_watch = saved_watch;
    ambient.is_pure = saved_pure;

    match result {
        None => true,
        Some(value) => {
            if compute.filter {
                !value.is_truthy()
            } else {
                stack.value = value;
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "compute step panicked with a non-string payload".to_string()
    }
}
