use fxhash::FxHashMap;
use indexmap::IndexMap;
use std::any::Any;
use std::rc::Rc;

/// The dynamic payload that flows through the kernel.
///
/// The source this kernel is modeled on is untyped (TS/JS); state refs,
/// stack scratch registers, and compute return values are all "any". We
/// keep that dynamism but make shallow-clone and truthiness explicit instead
/// of relying on JS coercion rules.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Map(Rc<IndexMap<String, Value>>),
    /// Escape hatch for host data the kernel never inspects (node-local
    /// `scope` bags, user closures' captured state, etc).
    Opaque(Rc<dyn Any>),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn map(items: IndexMap<String, Value>) -> Self {
        Value::Map(Rc::new(items))
    }

    /// JS-style truthiness: used by `compute { filter: true }` steps.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Opaque(_) => true,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Positional clone for arrays, keyed clone for everything else that
    /// qualifies as an object. Per spec: "Non-object `current` under a
    /// `field` command is undefined behavior from the source and should be
    /// rejected" — callers must check `is_object()` first.
    pub fn shallow_clone(&self) -> Value {
        match self {
            Value::List(items) => Value::List(Rc::new((**items).clone())),
            Value::Map(fields) => Value::Map(Rc::new((**fields).clone())),
            other => other.clone(),
        }
    }

    /// Write `value` into `self[field]`, shallow-cloning on first write so
    /// sibling overlays aren't mutated. Only meaningful on `Map` values;
    /// matching the source, lists are indexed by `field` parsed as usize.
    pub fn set_field(&mut self, field: &str, value: Value) {
        match self {
            Value::Map(fields) => {
                Rc::make_mut(fields).insert(field.to_string(), value);
            }
            Value::List(items) => {
                if let Ok(idx) = field.parse::<usize>() {
                    let items = Rc::make_mut(items);
                    if idx >= items.len() {
                        items.resize(idx + 1, Value::Null);
                    }
                    items[idx] = value;
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// A node-local metadata bag, handed to user functions as their `scope`
/// argument. Unrelated to [`crate::scope::Scope`] (a fork) — see spec §3.
pub type NodeScope = FxHashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_js_coercion() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::Number(1.0).is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn shallow_clone_list_is_positional_and_independent() {
        let original = Value::list(vec![Value::Number(1.0), Value::Number(2.0)]);
        let mut cloned = original.shallow_clone();
        cloned.set_field("0", Value::Number(9.0));
        match (&original, &cloned) {
            (Value::List(a), Value::List(b)) => {
                assert_eq!(a[0], Value::Number(1.0));
                assert_eq!(b[0], Value::Number(9.0));
            }
            _ => panic!("expected lists"),
        }
    }

    #[test]
    fn shallow_clone_map_is_keyed_and_independent() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Value::Number(1.0));
        let original = Value::map(fields);
        let mut cloned = original.shallow_clone();
        cloned.set_field("a", Value::Number(2.0));
        match (&original, &cloned) {
            (Value::Map(a), Value::Map(b)) => {
                assert_eq!(a["a"], Value::Number(1.0));
                assert_eq!(b["a"], Value::Number(2.0));
            }
            _ => panic!("expected maps"),
        }
    }
}
