//! Correlated joins: the nested-loop `join`/`group_join` primitives and the
//! inner/left/right/full/cross forms composed from them.
//!
//! For every left item, in original order, the right sequence (materialized
//! once on the first pull) is scanned and one result is produced per key
//! match. `group_join` instead yields the whole matching subsequence as a
//! single group together with the left item and its key.

use std::rc::Rc;

use rinq_core::prelude::*;

use crate::set::SetOps;

/// Result combiner for pairwise joins.
pub type JoinResult = Rc<dyn Fn(&Value, &Value) -> Value>;

/// Result combiner for group joins: (left item, matching group, key).
pub type GroupJoinResult = Rc<dyn Fn(&Value, Sequence, &Value) -> Value>;

/// Result combiner for outer joins where the right side may be absent.
pub type OuterJoinResult = Rc<dyn Fn(&Value, Option<&Value>) -> Value>;

/// Result combiner for right joins: the left side may be absent.
pub type RightJoinResult = Rc<dyn Fn(Option<&Value>, &Value) -> Value>;

pub trait JoinOps {
    fn join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: JoinResult,
        comp: Option<Comparer>,
    ) -> Sequence;

    fn group_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: GroupJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence;

    /// `join` with the record-merging default combiner.
    fn inner_join(&self, other: &Sequence, left_key: Accessor, right_key: Accessor) -> Sequence;

    /// Every left item at least once; unmatched left items pair with `None`.
    fn left_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: OuterJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence;

    /// Mirror of `left_join`: every right item at least once.
    fn right_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: RightJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence;

    /// Left join united with the unmatched right remainder.
    fn full_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        left_result: OuterJoinResult,
        right_result: OuterJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence;

    /// Cartesian product through the join machinery.
    fn cross_join(&self, other: &Sequence, result: JoinResult) -> Sequence;
}

fn keys_match(comp: &Option<Comparer>, a: &Value, b: &Value) -> bool {
    match comp {
        Some(c) => c(a, b),
        None => a == b,
    }
}

/// Record fields merge with the right side winning name collisions; any
/// other combination pairs up as a two-element list.
pub fn merge_items(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Record(left), Value::Record(right)) => {
            let mut fields = left.clone();
            for (name, value) in right {
                if let Some(slot) = fields.iter_mut().find(|(n, _)| n == name) {
                    slot.1 = value.clone();
                } else {
                    fields.push((name.clone(), value.clone()));
                }
            }
            Value::Record(fields)
        }
        _ => Value::List(vec![a.clone(), b.clone()]),
    }
}

/// Materialize the right side once, pairing each item with its key.
fn keyed_side(side: &Sequence, key: &Accessor) -> Result<Vec<(Value, Value)>> {
    side.assert_finite()?;
    side.iterate()
        .map(|item| item.map(|v| (key.apply(&v), v)))
        .collect()
}

impl JoinOps for Sequence {
    fn join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: JoinResult,
        comp: Option<Comparer>,
    ) -> Sequence {
        let src = self.clone();
        let right = other.clone();
        self.derived(
            defer(move || {
                let keyed = match keyed_side(&right, &right_key) {
                    Ok(keyed) => Rc::new(keyed),
                    Err(e) => return Box::new(std::iter::once(Err(e))) as Pull,
                };
                let mut cur = src.iterate();
                let left_key = left_key.clone();
                let comp = comp.clone();
                let result = result.clone();
                let mut pending: Option<(Value, Value, usize)> = None;
                Box::new(std::iter::from_fn(move || loop {
                    if let Some((item, key, pos)) = pending.as_mut() {
                        while *pos < keyed.len() {
                            let (rk, rv) = &keyed[*pos];
                            *pos += 1;
                            if keys_match(&comp, key, rk) {
                                return Some(Ok(result(item, rv)));
                            }
                        }
                        pending = None;
                    }
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            let key = left_key.apply(&v);
                            pending = Some((v, key, 0));
                        }
                    }
                }))
            }),
            None,
        )
    }

    fn group_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: GroupJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence {
        let src = self.clone();
        let right = other.clone();
        self.derived(
            defer(move || {
                let keyed = match keyed_side(&right, &right_key) {
                    Ok(keyed) => keyed,
                    Err(e) => return Box::new(std::iter::once(Err(e))) as Pull,
                };
                let mut cur = src.iterate();
                let left_key = left_key.clone();
                let comp = comp.clone();
                let result = result.clone();
                let right = right.clone();
                Box::new(std::iter::from_fn(move || match cur.next()? {
                    Err(e) => Some(Err(e)),
                    Ok(v) => {
                        let key = left_key.apply(&v);
                        let matches: Vec<Value> = keyed
                            .iter()
                            .filter(|(rk, _)| keys_match(&comp, &key, rk))
                            .map(|(_, rv)| rv.clone())
                            .collect();
                        let group = right.derived_materialized(matches);
                        group.set_group_key(Some(key.clone()));
                        Some(Ok(result(&v, group, &key)))
                    }
                }))
            }),
            None,
        )
    }

    fn inner_join(&self, other: &Sequence, left_key: Accessor, right_key: Accessor) -> Sequence {
        self.join(
            other,
            left_key,
            right_key,
            Rc::new(|a, b| merge_items(a, b)),
            None,
        )
    }

    fn left_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: OuterJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence {
        let expand = result.clone();
        self.group_join(
            other,
            left_key,
            right_key,
            Rc::new(move |left, group, _key| {
                // Groups are materialized; iterating them cannot fail.
                let items: Vec<Value> = group.iterate().collect::<Result<_>>().unwrap_or_default();
                let expanded: Vec<Value> = if items.is_empty() {
                    vec![expand(left, None)]
                } else {
                    items.iter().map(|b| expand(left, Some(b))).collect()
                };
                Value::List(expanded)
            }),
            comp,
        )
        .flatten_lists()
    }

    fn right_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        result: RightJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence {
        other.left_join(
            self,
            right_key,
            left_key,
            Rc::new(move |right_item, left_item| result(left_item, right_item)),
            comp,
        )
    }

    fn full_join(
        &self,
        other: &Sequence,
        left_key: Accessor,
        right_key: Accessor,
        left_result: OuterJoinResult,
        right_result: OuterJoinResult,
        comp: Option<Comparer>,
    ) -> Sequence {
        let left_part = self.left_join(other, left_key.clone(), right_key.clone(), left_result, comp.clone());
        let right_unmatched = unmatched_right(self, other, left_key, right_key, comp, right_result);
        left_part.union(&right_unmatched, None)
    }

    fn cross_join(&self, other: &Sequence, result: JoinResult) -> Sequence {
        self.join(
            other,
            Accessor::func(|v| v.clone()),
            Accessor::func(|v| v.clone()),
            result,
            Some(comparer(|_, _| true)),
        )
    }
}

/// Right items with no key match on the left, mapped through the combiner.
fn unmatched_right(
    left: &Sequence,
    right: &Sequence,
    left_key: Accessor,
    right_key: Accessor,
    comp: Option<Comparer>,
    result: OuterJoinResult,
) -> Sequence {
    let left = left.clone();
    let src = right.clone();
    right.derived(
        defer(move || {
            let left_keys: Result<Vec<Value>> = match left.assert_finite() {
                Ok(()) => left.iterate().map(|i| i.map(|v| left_key.apply(&v))).collect(),
                Err(e) => Err(e),
            };
            let left_keys = match left_keys {
                Ok(keys) => keys,
                Err(e) => return Box::new(std::iter::once(Err(e))) as Pull,
            };
            let mut cur = src.iterate();
            let right_key = right_key.clone();
            let comp = comp.clone();
            let result = result.clone();
            Box::new(std::iter::from_fn(move || loop {
                match cur.next()? {
                    Err(e) => return Some(Err(e)),
                    Ok(v) => {
                        let key = right_key.apply(&v);
                        if !left_keys.iter().any(|lk| keys_match(&comp, lk, &key)) {
                            return Some(Ok(result(&Value::Null, Some(&v))));
                        }
                    }
                }
            }))
        }),
        None,
    )
}

/// Internal helper: splice the elements of list items into the stream.
trait FlattenLists {
    fn flatten_lists(&self) -> Sequence;
}

impl FlattenLists for Sequence {
    fn flatten_lists(&self) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut pending: std::vec::IntoIter<Value> = Vec::new().into_iter();
                Box::new(std::iter::from_fn(move || loop {
                    if let Some(item) = pending.next() {
                        return Some(Ok(item));
                    }
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(Value::List(items)) => pending = items.into_iter(),
                        Ok(other) => return Some(Ok(other)),
                    }
                }))
            }),
            None,
        )
    }
}
