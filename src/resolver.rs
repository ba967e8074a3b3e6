use crate::error::KernelError;
use crate::page::{get_page_for_ref, PageHandle};
use crate::scope::ScopeHandle;
use crate::state::{BeforeCmd, SerializeMeta, StateRef, StateRefId};
use crate::value::Value;
use fxhash::FxHashMap;

/// The global tier of the three-tier registry: state refs nobody's page or
/// scope has claimed. Lives as `Graph::refs`; resolver functions take it
/// directly (rather than the whole `Graph`) so a caller holding `&Node` from
/// the same graph can still pass this mutably without a borrow conflict.
pub type RefTable = FxHashMap<StateRefId, StateRef>;

/// Where a resolved state cell actually lives — the three-tier registry
/// from spec §1 ("global, page, or scope").
pub enum RefLocation {
    Page(PageHandle, StateRefId),
    Scope(ScopeHandle, StateRefId),
    Global(StateRefId),
}

/// `readRef(ref) → any`: returns `ref.current` (spec §6). Operates on an
/// already-resolved location.
pub fn read_ref(refs: &RefTable, loc: &RefLocation) -> Value {
    match loc {
        RefLocation::Page(page, id) => page.borrow().reg[id].current.clone(),
        RefLocation::Scope(scope, id) => scope.borrow().reg[id].current.clone(),
        RefLocation::Global(id) => refs[id].current.clone(),
    }
}

pub fn write_ref(refs: &mut RefTable, loc: &RefLocation, value: Value) {
    match loc {
        RefLocation::Page(page, id) => {
            if let Some(r) = page.borrow_mut().reg.get_mut(id) {
                r.current = value;
            }
        }
        RefLocation::Scope(scope, id) => {
            if let Some(r) = scope.borrow_mut().reg.get_mut(id) {
                r.current = value;
            }
        }
        RefLocation::Global(id) => {
            if let Some(r) = refs.get_mut(id) {
                r.current = value;
            }
        }
    }
}

/// `getPageRef(page, scope, ref, isGetState) → StateRef` (spec §4.2). If a
/// page owns the id, use that cell. Else, if a scope is present, ensure the
/// cell exists (materializing lazily) and use the scope's cell. Else fall
/// back to the global definition.
pub fn get_page_ref(
    page: Option<&PageHandle>,
    scope: Option<&ScopeHandle>,
    refs: &mut RefTable,
    id: StateRefId,
    is_get_state: bool,
) -> Result<RefLocation, KernelError> {
    if let Some(owner) = get_page_for_ref(page, id) {
        return Ok(RefLocation::Page(owner, id));
    }
    if let Some(scope) = scope {
        init_ref_in_scope(scope, refs, id, is_get_state, false, false)?;
        return Ok(RefLocation::Scope(scope.clone(), id));
    }
    Ok(RefLocation::Global(id))
}

/// `initRefInScope` (spec §4.2). Idempotent: returns immediately if the
/// scope already has a cell for `source_id`.
pub fn init_ref_in_scope(
    scope: &ScopeHandle,
    refs: &mut RefTable,
    source_id: StateRefId,
    is_get_state: bool,
    is_kernel_call: bool,
    soft_read: bool,
) -> Result<(), KernelError> {
    if scope.borrow().reg.contains_key(&source_id) {
        return Ok(());
    }

    let source_ref = refs.get(&source_id).unwrap_or_else(|| {
        panic!("state ref {:?} was never registered with the graph", source_id)
    });
    let mut cell = source_ref.clone();
    cell.current = source_ref.initial.clone();
    let sid = cell.sid.clone();
    let before = cell.before.clone();
    let no_init = cell.no_init;

    let from_id_map = scope.borrow().values.id_map.get(&source_id).cloned();
    if let Some(value) = from_id_map {
        cell.current = value;
    } else if let Some(sid) = sid.as_deref() {
        let already_assigned = scope.borrow().sid_id_map.contains_key(sid);
        let raw = scope.borrow().values.sid_map.get(sid).cloned();
        if let (Some(raw), false) = (raw, already_assigned) {
            let from_serialize = scope.borrow().from_serialize;
            let ignored = matches!(cell.meta.serialize, Some(SerializeMeta::Ignore));
            cell.current = if from_serialize && !ignored {
                match &cell.meta.serialize {
                    Some(SerializeMeta::Read(f)) => f(&raw),
                    _ => raw,
                }
            } else {
                raw
            };
        } else if let Some(before) = before.clone() {
            if !soft_read {
                process_before(scope, refs, &mut cell, &before, is_get_state, is_kernel_call, no_init)?;
            }
        }
    } else if let Some(before) = before {
        if !soft_read {
            process_before(scope, refs, &mut cell, &before, is_get_state, is_kernel_call, no_init)?;
        }
    }

    if let Some(sid) = sid {
        scope.borrow_mut().sid_id_map.insert(sid, source_id);
    }
    scope.borrow_mut().reg.insert(source_id, cell);
    Ok(())
}

fn process_before(
    scope: &ScopeHandle,
    refs: &mut RefTable,
    cell: &mut StateRef,
    commands: &[BeforeCmd],
    is_get_state: bool,
    is_kernel_call: bool,
    no_init: bool,
) -> Result<(), KernelError> {
    let need_to_assign = is_get_state || !no_init || is_kernel_call;
    let mut cloned = false;

    for cmd in commands {
        match cmd {
            BeforeCmd::Map { from, func } => {
                if let Some(from_id) = from {
                    init_ref_in_scope(scope, refs, *from_id, is_get_state, is_kernel_call, false)?;
                    if need_to_assign {
                        let from_current = scope.borrow().reg[from_id].current.clone();
                        cell.current = match func {
                            Some(f) => f(&from_current),
                            None => from_current,
                        };
                    }
                }
                // Neither `from` nor `fn` present: no-op, per spec.
            }
            BeforeCmd::Field { from, field } => {
                init_ref_in_scope(scope, refs, *from, is_get_state, is_kernel_call, false)?;
                if !cloned {
                    if !cell.current.is_object() {
                        return Err(KernelError::NonObjectFieldTarget);
                    }
                    cell.current = cell.current.shallow_clone();
                    cloned = true;
                }
                if need_to_assign {
                    let from_current = scope.borrow().reg[from].current.clone();
                    cell.current.set_field(field, from_current);
                }
            }
        }
    }
    Ok(())
}
