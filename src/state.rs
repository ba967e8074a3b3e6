use crate::value::Value;
use std::rc::Rc;

/// Identity of a logical state cell. Stable across overlays: a page or
/// scope cell for the same id represents the same logical ref, just a
/// different storage location (spec invariant 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRefId(pub usize);

/// A single-argument pure transform used by `before` commands. Kept
/// separate from [`crate::node::ComputeFn`] since it never sees a `Stack`
/// or queue — it only ever derives one value from another.
pub type DeriveFn = Rc<dyn Fn(&Value) -> Value>;

/// One step of a ref's lazy derivation chain (spec §3 "StateRef", §4.2 rule 3).
#[derive(Clone)]
pub enum BeforeCmd {
    /// Derive from an upstream ref: `fn(from.current)`, or `from.current`
    /// verbatim when `fn` is absent. A `map` with neither `from` nor `fn`
    /// is a no-op (kept for graph-compile symmetry, never emitted in
    /// practice).
    Map { from: Option<StateRefId>, func: Option<DeriveFn> },
    /// Derive by shallow-cloning `current` and writing `current[field] =
    /// from.current`.
    Field { from: StateRefId, field: String },
}

/// How a scope-serialized value is parsed back into a live `Value` when a
/// scope was constructed `from_serialize` (spec §4.2 rule 2). `Ignore`
/// mirrors the source's literal `'ignore'` sentinel: the sid entry is
/// present but must not be read as a serialized payload.
#[derive(Clone)]
pub enum SerializeMeta {
    Ignore,
    Read(DeriveFn),
}

#[derive(Clone, Default)]
pub struct RefMeta {
    pub serialize: Option<SerializeMeta>,
}

/// A logical state cell. `before` is only consulted when materializing a
/// *fresh* scope overlay (`initRefInScope`) — a ref living directly in a
/// page, or the ref itself when neither page nor scope own it, is read as
/// plain `current`.
#[derive(Clone)]
pub struct StateRef {
    pub id: StateRefId,
    pub current: Value,
    pub initial: Value,
    pub meta: RefMeta,
    /// Serialized-value slot id, used to look the ref up in
    /// `Scope.values.sid_map` during materialization.
    pub sid: Option<String>,
    pub before: Option<Rc<Vec<BeforeCmd>>>,
    /// When true, a fresh scope overlay skips `before` derivation unless
    /// forced by `isGetState`/`isKernelCall` (spec §4.2 rule 3, `needToAssign`).
    pub no_init: bool,
}

impl StateRef {
    pub fn new(id: StateRefId, initial: Value) -> Self {
        StateRef {
            id,
            current: initial.clone(),
            initial,
            meta: RefMeta::default(),
            sid: None,
            before: None,
            no_init: false,
        }
    }
}
