//! Filtering and projection: `where`/`select`/`select_many` and the
//! item-rewriting helpers built on the same shape.
//!
//! All of these are lazy: the returned sequence pulls from its parent on
//! demand and preserves encounter order.

use std::rc::Rc;

use rinq_core::prelude::*;

pub trait ProjectOps {
    /// Keep items the index-aware predicate accepts.
    fn where_with(&self, pred: impl Fn(&Value, usize) -> bool + 'static) -> Sequence;

    /// Map every item through the index-aware selector.
    fn select(&self, f: impl Fn(&Value, usize) -> Value + 'static) -> Sequence;

    /// Flatten the collections produced by `selector` (one sub-sequence or
    /// list per source item). With a result combiner, every (source item,
    /// selected item) pair is mapped through it.
    fn select_many(
        &self,
        selector: impl Fn(&Value, usize) -> Value + 'static,
        result: Option<Rc<dyn Fn(&Value, &Value) -> Value>>,
    ) -> Sequence;

    /// Keep items of one value kind ("int", "str", "record", ...).
    fn of_type(&self, kind: &str) -> Sequence;

    /// Swap items matching the predicate for the replacement the rewrite
    /// function produces.
    fn replace_where(
        &self,
        pred: impl Fn(&Value) -> bool + 'static,
        replacement: impl Fn(&Value) -> Value + 'static,
    ) -> Sequence;

    /// Swap items equal to `search` (by the comparer, or value equality)
    /// for `replacement`.
    fn replace(&self, search: Value, replacement: Value, comp: Option<Comparer>) -> Sequence;

    /// Every `step`-th item, starting with the `step`-th.
    fn take_every(&self, step: usize) -> Result<Sequence>;
}

impl ProjectOps for Sequence {
    fn where_with(&self, pred: impl Fn(&Value, usize) -> bool + 'static) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut idx = 0;
                Box::new(std::iter::from_fn(move || loop {
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            let keep = pred(&v, idx);
                            idx += 1;
                            if keep {
                                return Some(Ok(v));
                            }
                        }
                    }
                }))
            }),
            None,
        )
    }

    fn select(&self, f: impl Fn(&Value, usize) -> Value + 'static) -> Sequence {
        let estimate = propagate_hint(self.try_length_hint());
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut idx = 0;
                Box::new(std::iter::from_fn(move || match cur.next()? {
                    Err(e) => Some(Err(e)),
                    Ok(v) => {
                        let mapped = f(&v, idx);
                        idx += 1;
                        Some(Ok(mapped))
                    }
                }))
            }),
            estimate,
        )
    }

    fn select_many(
        &self,
        selector: impl Fn(&Value, usize) -> Value + 'static,
        result: Option<Rc<dyn Fn(&Value, &Value) -> Value>>,
    ) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut idx = 0;
                let mut pending: Option<(Value, std::vec::IntoIter<Value>)> = None;
                Box::new(std::iter::from_fn(move || loop {
                    if let Some((source, inner)) = pending.as_mut() {
                        if let Some(item) = inner.next() {
                            let out = match &result {
                                Some(f) => f(source, &item),
                                None => item,
                            };
                            return Some(Ok(out));
                        }
                        pending = None;
                    }
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            let selected = selector(&v, idx);
                            idx += 1;
                            let items = match flatten_collection(&selected) {
                                Ok(items) => items,
                                Err(e) => return Some(Err(e)),
                            };
                            pending = Some((v, items.into_iter()));
                        }
                    }
                }))
            }),
            None,
        )
    }

    fn of_type(&self, kind: &str) -> Sequence {
        let kind = kind.to_string();
        self.where_with(move |v, _| v.kind() == kind)
    }

    fn replace_where(
        &self,
        pred: impl Fn(&Value) -> bool + 'static,
        replacement: impl Fn(&Value) -> Value + 'static,
    ) -> Sequence {
        self.select(move |v, _| if pred(v) { replacement(v) } else { v.clone() })
    }

    fn replace(&self, search: Value, replacement: Value, comp: Option<Comparer>) -> Sequence {
        self.replace_where(
            move |v| match &comp {
                Some(c) => c(&search, v),
                None => *v == search,
            },
            move |_| replacement.clone(),
        )
    }

    fn take_every(&self, step: usize) -> Result<Sequence> {
        if step == 0 {
            return Err(Error::InvalidIndex { index: 0 });
        }
        Ok(self.where_with(move |_, idx| (idx + 1) % step == 0))
    }
}

/// A selected collection: nested sequences iterate (a caching pass), lists
/// yield their elements, and anything else acts as a single-element
/// collection.
fn flatten_collection(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Seq(seq) => seq.iterate().collect(),
        Value::List(items) => Ok(items.clone()),
        other => Ok(vec![other.clone()]),
    }
}

/// Projection keeps the parent's length hint; it maps items one to one.
pub(crate) fn propagate_hint(hint: LengthHint) -> Option<CountEstimate> {
    match hint {
        LengthHint::Known(n) => Some(CountEstimate::Finite(n)),
        LengthHint::Infinite => Some(CountEstimate::Infinite),
        LengthHint::Unknown => None,
    }
}
