use crate::node::NodeId;
use crate::page::PageHandle;
use crate::scope::ScopeHandle;
use crate::value::Value;
use std::rc::Rc;

/// Per-activation record: scratch registers, the in-flight value, and the
/// overlay pointers a `mov` reads/writes through. Spec §3 "Stack".
///
/// `page` is mutated mid-node by the resolver (spec §9, second open
/// question) — a `mov` reading `from: 'store'` may advance `page` to the
/// nearest enclosing page that actually owns the ref, and later steps in
/// the same node see that update. This is load-bearing, not incidental.
pub struct Stack {
    pub node: NodeId,
    pub parent: Option<Rc<Stack>>,
    pub value: Value,
    pub a: Value,
    pub b: Value,
    pub page: Option<PageHandle>,
    pub scope: Option<ScopeHandle>,
    pub meta: Value,
}

impl Stack {
    /// A fresh root activation, as created by `pushFirstHeapItem` (spec §4.1).
    pub fn root(node: NodeId, value: Value, page: Option<PageHandle>, scope: Option<ScopeHandle>) -> Self {
        Stack { node, parent: None, value, a: Value::Null, b: Value::Null, page, scope, meta: Value::Null }
    }

    /// A child activation seeded from a finished parent's output (spec §4.4:
    /// "enqueue a `child`-priority layer carrying this stack as `parent` and
    /// the final value as payload").
    pub fn child(parent: Rc<Stack>, node: NodeId, value: Value) -> Self {
        let page = parent.page.clone();
        let scope = parent.scope.clone();
        let meta = parent.meta.clone();
        Stack { node, parent: Some(parent), value, a: Value::Null, b: Value::Null, page, scope, meta }
    }
}

/// `getValue(stack) → any`: the canonical "current value" of an activation
/// (spec §6 collaborator contract).
pub fn get_value(stack: &Stack) -> Value {
    stack.value.clone()
}
