use crate::node::NodeId;
use crate::state::{StateRef, StateRefId};
use crate::value::Value;
use fxhash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// External values a scope was constructed with — either already-live
/// `Value`s keyed by ref id, or raw serialized payloads keyed by `sid`
/// (spec §3 "Scope", §4.2 rules 1–2).
#[derive(Default)]
pub struct ScopeValues {
    pub id_map: FxHashMap<StateRefId, Value>,
    pub sid_map: FxHashMap<String, Value>,
}

/// A fork: an isolated state universe with its own lazily-materialized
/// state cells. See GLOSSARY "Scope" — unrelated to [`crate::node::Node`]'s
/// `scope` metadata bag.
pub struct Scope {
    pub reg: FxHashMap<StateRefId, StateRef>,
    pub values: ScopeValues,
    /// `sid -> ref id` the sid was assigned to; written exactly once per
    /// scope per sid (spec invariant 4).
    pub sid_id_map: FxHashMap<String, StateRefId>,
    pub from_serialize: bool,
    pub fx_count: Option<NodeId>,
    pub store_change: Option<NodeId>,
    pub warn_serialize_node: Option<NodeId>,
    pub additional_links: FxHashMap<NodeId, Vec<NodeId>>,
}

pub type ScopeHandle = Rc<RefCell<Scope>>;

impl Scope {
    pub fn new(from_serialize: bool) -> ScopeHandle {
        Rc::new(RefCell::new(Scope {
            reg: FxHashMap::default(),
            values: ScopeValues::default(),
            sid_id_map: FxHashMap::default(),
            from_serialize,
            fx_count: None,
            store_change: None,
            warn_serialize_node: None,
            additional_links: FxHashMap::default(),
        }))
    }

    pub fn additional_links_for(&self, node: NodeId) -> &[NodeId] {
        self.additional_links.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
