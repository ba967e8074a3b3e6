use crate::graph::UnitId;
use crate::kernel::Kernel;
use crate::node::NodeId;
use crate::page::PageHandle;
use crate::priority::PriorityTag;
use crate::queue::PriorityQueue;
use crate::scope::ScopeHandle;
use crate::stack::Stack;
use crate::value::Value;
use std::rc::Rc;

/// Object-form extras for `launch` (spec §4.5's `target, params, defer,
/// queue, page, scope, stack, meta` config). `targets`/`payloads` are passed
/// as separate slices rather than folded in here, since both calling
/// conventions the spec describes normalize to the same (unit, payload)
/// pairs either way.
#[derive(Default)]
pub struct LaunchConfig {
    pub page: Option<PageHandle>,
    pub fork_page: Option<ScopeHandle>,
    /// The activation this launch is chained from, if any — seeded targets
    /// become children of it rather than fresh roots.
    pub parent: Option<Rc<Stack>>,
    pub meta: Value,
}

/// `launch(unit, payload)` — the terse calling convention (spec §4.5). For
/// the reentrant `upsert=true` convention, call [`launch_reentrant`] instead
/// from inside a `compute` closure, which already holds the queue this would
/// otherwise need to reuse.
pub fn launch_unit(kernel: &mut Kernel, unit: UnitId, payload: Value) {
    launch(kernel, &[unit], &[payload], LaunchConfig::default());
}

/// `launch(config)` — the object calling convention (spec §4.5). Always
/// seeds a fresh queue and drains it to completion, matching the source's
/// preserved quirk of never merging a non-reentrant launch into an
/// in-progress drain (spec §9 open question 1).
pub fn launch(kernel: &mut Kernel, targets: &[UnitId], payloads: &[Value], config: LaunchConfig) {
    assert_eq!(targets.len(), payloads.len(), "launch: targets/payloads length mismatch");

    let page = config.page.clone().or_else(|| kernel.ambient.current_page.clone());
    let fork_page = config.fork_page.clone().or_else(|| kernel.ambient.fork_page.clone());

    // A nested launch into a different scope must not inherit the ambient
    // one (spec §4.5 "scope disambiguation").
    if let (Some(incoming), Some(ambient)) = (&config.fork_page, &kernel.ambient.fork_page) {
        if !Rc::ptr_eq(incoming, ambient) {
            kernel.ambient.fork_page = None;
        }
    }

    let mut queue = PriorityQueue::new();
    for (unit, payload) in targets.iter().zip(payloads.iter()) {
        let node = kernel.graph.get_graph(*unit);
        let stack = match &config.parent {
            Some(parent) => Stack::child(parent.clone(), node, payload.clone()),
            None => Stack::root(node, payload.clone(), page.clone(), fork_page.clone()),
        };
        queue.push_first_heap_item(stack, PriorityTag::Pure);
    }

    kernel.drain(&mut queue);
}

/// The reentrant path of spec §4.5: `upsert=true` called from inside a
/// running drain. A `compute` closure already holds the ambient queue (it's
/// threaded through as an argument — see [`crate::node::ComputeFn`]), so
/// "reuse the ambient `currentQueue`" is simply "push onto the queue you
/// were handed" — there's nothing to look up. It already knows which
/// `NodeId` to retrigger too, having captured that at graph-build time the
/// same way the graph compiler resolves `getGraph` once rather than on
/// every step.
///
/// Only the `upsert=true` convention is reachable from a `compute` closure.
/// The non-`upsert` reentrant case ("a fresh queue is created and drained to
/// completion before the outer step resumes", spec §4.5) needs a full nested
/// drain — graph, ambient, diagnostics, the works — and a closure only ever
/// holds the queue it was handed, not the `Kernel` that owns those. There is
/// no entry point for it; see `DESIGN.md` for why this is an intentional gap
/// rather than an oversight.
pub fn launch_reentrant(queue: &mut PriorityQueue, node: NodeId, payload: Value) {
    queue.push_first_heap_item(Stack::root(node, payload, None, None), PriorityTag::Pure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Compute, Mov, MovFrom, MovTo, Node, Step};

    fn double_node(graph: &mut crate::graph::Graph) -> NodeId {
        graph.insert_node(|id| {
            let seq = vec![
                Step::mov(Mov { from: MovFrom::Stack, to: MovTo::Stack, soft_read: false }),
                Step::compute(Compute {
                    func: Some(Rc::new(|v, _, _, _| match v {
                        Value::Number(n) => Value::Number(n * 2.0),
                        other => other,
                    })),
                    safe: true,
                    pure: true,
                    filter: false,
                }),
            ];
            Node::new(id, seq, vec![])
        })
    }

    #[test]
    fn launch_unit_drains_to_completion_and_restores_root() {
        let mut kernel = Kernel::new();
        let node = double_node(&mut kernel.graph);
        let unit = UnitId(0);
        kernel.graph.bind_unit(unit, node);

        assert!(kernel.is_root());
        launch_unit(&mut kernel, unit, Value::Number(21.0));
        assert!(kernel.is_root());
    }

    #[test]
    fn reentrant_launch_enqueues_without_draining() {
        let mut queue = PriorityQueue::new();
        assert!(queue.is_empty());
        launch_reentrant(&mut queue, NodeId(0), Value::Number(1.0));
        assert!(!queue.is_empty());
    }
}
