use crate::node::{Node, NodeId};
use crate::state::{StateRef, StateRefId};
use fxhash::FxHashMap;
use slab::Slab;

/// Identity of a user-facing unit (event/store/effect/etc) — spec GLOSSARY
/// "Unit". Opaque to the kernel; only ever used as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// The compiled graph: node arena, the global tier of state refs (read when
/// neither a page nor a scope owns the id), and the unit → node binding the
/// graph compiler would otherwise own. Construction is out of scope per
/// spec §1 — this is a minimal builder, not a compiler, kept just large
/// enough to exercise the kernel's contracts in §6.
pub struct Graph {
    pub(crate) nodes: Slab<Node>,
    pub refs: FxHashMap<StateRefId, StateRef>,
    units: FxHashMap<UnitId, NodeId>,
    next_ref_id: usize,
}

impl Graph {
    pub fn with_capacity(nodes: usize, refs: usize) -> Self {
        Graph {
            nodes: Slab::with_capacity(nodes),
            refs: FxHashMap::with_capacity_and_hasher(refs, Default::default()),
            units: FxHashMap::default(),
            next_ref_id: 0,
        }
    }

    pub fn insert_node(&mut self, build: impl FnOnce(NodeId) -> Node) -> NodeId {
        let entry = self.nodes.vacant_entry();
        let id = NodeId(entry.key());
        entry.insert(build(id));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn bind_unit(&mut self, unit: UnitId, node: NodeId) {
        self.units.insert(unit, node);
    }

    /// `getGraph(unit) → Node` (spec §6 collaborator contract).
    pub fn get_graph(&self, unit: UnitId) -> NodeId {
        *self.units.get(&unit).unwrap_or_else(|| panic!("unit {:?} has no bound node", unit))
    }

    pub fn alloc_ref_id(&mut self) -> StateRefId {
        let id = StateRefId(self.next_ref_id);
        self.next_ref_id += 1;
        id
    }

    pub fn insert_ref(&mut self, r: StateRef) {
        self.refs.insert(r.id, r);
    }
}
