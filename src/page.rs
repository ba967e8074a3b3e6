use crate::state::{StateRef, StateRefId};
use fxhash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A node in the tree of per-instance state overlays ("Leaf" in the
/// source, "page" everywhere else — spec §3 "Leaf (page)").
pub struct Page {
    pub reg: FxHashMap<StateRefId, StateRef>,
    pub parent: Option<PageHandle>,
    pub full_id: String,
}

/// Pages are shared: a stack's `page` pointer and a page's children all
/// reference the same node, and a page outlives any single activation.
pub type PageHandle = Rc<RefCell<Page>>;

impl Page {
    pub fn new(full_id: impl Into<String>, parent: Option<PageHandle>) -> PageHandle {
        Rc::new(RefCell::new(Page { reg: FxHashMap::default(), parent, full_id: full_id.into() }))
    }

    pub fn owns(&self, id: StateRefId) -> bool {
        self.reg.contains_key(&id)
    }
}

/// Walk `page`'s parent chain and return the nearest page whose `reg` owns
/// `id`, if any (spec §4.2 `getPageForRef`).
pub fn get_page_for_ref(page: Option<&PageHandle>, id: StateRefId) -> Option<PageHandle> {
    let mut cursor = page.cloned();
    while let Some(p) = cursor {
        if p.borrow().owns(id) {
            return Some(p);
        }
        cursor = p.borrow().parent.clone();
    }
    None
}
