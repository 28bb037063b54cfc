//! Key/value selection callbacks.
//!
//! Key selectors arrive either as a function or as a record field name; the
//! tagged `Accessor` resolves that once at operator construction time instead
//! of re-inspecting the argument per item.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::value::Value;

/// A key-extraction function over a single item.
pub type KeyFn = Rc<dyn Fn(&Value) -> Value>;

/// Index-aware filter callback.
pub type Predicate = Rc<dyn Fn(&Value, usize) -> bool>;

/// Index-aware projection callback.
pub type Selector = Rc<dyn Fn(&Value, usize) -> Value>;

/// Custom equality used by the comparing set operators.
pub type Comparer = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Custom key ordering used by `order_by`/`then_by`.
pub type KeyCompare = Rc<dyn Fn(&Value, &Value) -> Ordering>;

/// Fully-baked item comparator (key extraction and direction applied),
/// stored on ordered sequences so `then_by` can chain from it.
pub type ItemCompare = dyn Fn(&Value, &Value) -> Ordering;

#[derive(Clone)]
pub enum Accessor {
    /// Look the key up as a record field; missing fields resolve to null.
    Name(String),
    Func(KeyFn),
}

impl Accessor {
    pub fn name(name: impl Into<String>) -> Self {
        Accessor::Name(name.into())
    }

    pub fn func(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Accessor::Func(Rc::new(f))
    }

    pub fn apply(&self, item: &Value) -> Value {
        match self {
            Accessor::Name(name) => item.field(name).cloned().unwrap_or(Value::Null),
            Accessor::Func(f) => f(item),
        }
    }
}

impl From<&str> for Accessor {
    fn from(name: &str) -> Self {
        Accessor::Name(name.to_string())
    }
}

impl From<String> for Accessor {
    fn from(name: String) -> Self {
        Accessor::Name(name)
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessor::Name(n) => write!(f, "Accessor::Name({n:?})"),
            Accessor::Func(_) => write!(f, "Accessor::Func(..)"),
        }
    }
}

/// Wrap a closure as a [`Predicate`].
pub fn predicate(f: impl Fn(&Value, usize) -> bool + 'static) -> Predicate {
    Rc::new(f)
}

/// Wrap a closure as a [`Selector`].
pub fn selector(f: impl Fn(&Value, usize) -> Value + 'static) -> Selector {
    Rc::new(f)
}

/// Wrap a closure as a [`Comparer`].
pub fn comparer(f: impl Fn(&Value, &Value) -> bool + 'static) -> Comparer {
    Rc::new(f)
}
