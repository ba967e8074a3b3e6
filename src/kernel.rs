use crate::error::{DiagnosticSink, LogDiagnosticSink};
use crate::graph::Graph;
use crate::interpreter::{run_node, Ambient, Outcome};
use crate::node::NodeId;
use crate::page::PageHandle;
use crate::priority::PriorityTag;
use crate::queue::PriorityQueue;
use crate::scope::ScopeHandle;
use crate::stack::{get_value, Stack};
use std::rc::Rc;

/// What happened to the most recently finished activation, handed to the
/// inspector hook alongside the stack (spec §4.3's local `{fail, failReason}`
/// frame, minus the reason — the diagnostic sink already got that).
pub struct ActivationOutcome {
    pub failed: bool,
}

/// `inspector(stack, local)` (spec §4.6, §6 `setInspector`). A single
/// process-wide slot; installing a new one replaces the old.
pub type InspectorFn = Rc<dyn Fn(&Stack, &ActivationOutcome)>;

/// Owns the compiled graph and the ambient drain state a caller's `launch`
/// calls snapshot/restore around (spec C4). One `Kernel` is meant to live
/// for the lifetime of a program; `launch` borrows it per call.
pub struct Kernel {
    pub graph: Graph,
    pub(crate) ambient: Ambient,
    inspector: Option<InspectorFn>,
    diagnostics: Box<dyn DiagnosticSink>,
}

impl Kernel {
    pub fn new() -> Self {
        Kernel::with_capacity(0, 0)
    }

    /// Mirrors `dioxus-core`'s `Scheduler::new`, which preallocates its
    /// `Slab`s instead of growing them node-by-node.
    pub fn with_capacity(nodes: usize, refs: usize) -> Self {
        Kernel {
            graph: Graph::with_capacity(nodes, refs),
            ambient: Ambient { is_root: true, ..Ambient::default() },
            inspector: None,
            diagnostics: Box::new(LogDiagnosticSink),
        }
    }

    pub fn is_root(&self) -> bool {
        self.ambient.is_root
    }

    pub fn set_inspector(&mut self, inspector: InspectorFn) {
        self.inspector = Some(inspector);
    }

    pub fn clear_inspector(&mut self) {
        self.inspector = None;
    }

    /// `setCurrentPage` (spec §6).
    pub fn set_current_page(&mut self, page: Option<PageHandle>) {
        self.ambient.current_page = page;
    }

    /// `setForkPage` (spec §6).
    pub fn set_fork_page(&mut self, scope: Option<ScopeHandle>) {
        self.ambient.fork_page = scope;
    }

    pub fn current_fork_page(&self) -> Option<ScopeHandle> {
        self.ambient.fork_page.clone()
    }

    pub fn set_diagnostics(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.diagnostics = sink;
    }

    /// The single drain loop (spec §4.4). Snapshots ambient state on entry
    /// and restores it on exit, so a reentrant `launch` issued from inside a
    /// `compute` step — which calls back into `drain` on its own queue —
    /// leaves the outer activation's ambient view untouched.
    pub(crate) fn drain(&mut self, queue: &mut PriorityQueue) {
        let snapshot = self.ambient.clone();
        self.ambient.is_root = false;

        while let Some(layer) = queue.delete_min() {
            let mut stack = layer.stack;
            self.ambient.current_page = stack.page.clone();
            self.ambient.fork_page = get_fork_page(&stack);

            let node_id = stack.node;
            log::trace!("draining node {:?} at step {}", node_id, layer.idx);

            let outcome = {
                let node = &self.graph.nodes[node_id.0];
                run_node(
                    &mut stack,
                    layer.idx,
                    layer.priority,
                    node,
                    &mut self.graph.refs,
                    queue,
                    &mut self.ambient,
                    self.diagnostics.as_ref(),
                )
            };

            match outcome {
                Outcome::Deferred => continue,
                Outcome::Stopped => {
                    self.notify_inspector(&stack, true);
                }
                Outcome::Finished => {
                    self.notify_inspector(&stack, false);
                    self.seed_successors(node_id, stack, queue);
                }
            }
        }

        self.ambient = snapshot;
    }

    fn notify_inspector(&self, stack: &Stack, failed: bool) {
        if let Some(inspector) = &self.inspector {
            inspector(stack, &ActivationOutcome { failed });
        }
    }

    /// After a node finishes, enqueue `child`-priority layers for every
    /// declared successor: the node's own `next` list, plus whatever the
    /// active fork scope links in on the side (spec §4.4).
    fn seed_successors(&self, node_id: NodeId, stack: Stack, queue: &mut PriorityQueue) {
        let node = &self.graph.nodes[node_id.0];
        let value = get_value(&stack);
        let fork_page = stack.scope.clone();
        let parent = Rc::new(stack);

        for &next in &node.next {
            queue.push_heap(0, Stack::child(parent.clone(), next, value.clone()), PriorityTag::Child, 0);
        }

        if let Some(scope) = fork_page {
            for next in side_channel_links(node, node_id, &scope) {
                queue.push_heap(0, Stack::child(parent.clone(), next, value.clone()), PriorityTag::Child, 0);
            }
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::new()
    }
}

/// `getForkPage(stack) → Scope|null` (spec §6).
fn get_fork_page(stack: &Stack) -> Option<ScopeHandle> {
    stack.scope.clone()
}

/// The extra edges a fork scope can attach to a finishing node beyond its
/// compiled `next` list: the scope's effect counter, store-change watcher,
/// serialize-warning node, and any explicit `additionalLinks` (spec §4.4).
fn side_channel_links(node: &crate::node::Node, node_id: NodeId, scope: &ScopeHandle) -> Vec<NodeId> {
    let scope = scope.borrow();
    let mut links = Vec::new();
    if node.meta.need_fx_counter {
        links.extend(scope.fx_count);
    }
    if node.meta.store_change {
        links.extend(scope.store_change);
    }
    if node.meta.warn_serialize {
        links.extend(scope.warn_serialize_node);
    }
    links.extend(scope.additional_links_for(node_id).iter().copied());
    links
}
