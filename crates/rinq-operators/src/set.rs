//! Set algebra over sequences: distinct, union, except, intersect, and the
//! key-projecting `_by` variants.
//!
//! Membership is tracked in a seen-set accumulated incrementally during
//! iteration (never pre-computed for the streaming side). The default probe
//! is the structural value hash; a custom comparer falls back to a linear
//! scan over the retained values.

use std::collections::HashSet;

use rinq_core::prelude::*;

/// Incremental membership structure for the comparing operators.
pub(crate) enum Seen {
    Hashed(HashSet<Hash256>),
    Linear(Vec<Value>, Comparer),
}

impl Seen {
    pub(crate) fn new(comp: Option<Comparer>) -> Seen {
        match comp {
            Some(c) => Seen::Linear(Vec::new(), c),
            None => Seen::Hashed(HashSet::new()),
        }
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        match self {
            Seen::Hashed(set) => set.contains(&hash_value(value)),
            Seen::Linear(values, comp) => values.iter().any(|seen| comp(value, seen)),
        }
    }

    pub(crate) fn insert(&mut self, value: Value) {
        match self {
            Seen::Hashed(set) => {
                set.insert(hash_value(&value));
            }
            Seen::Linear(values, _) => values.push(value),
        }
    }
}

pub trait SetOps {
    /// Suppress values seen earlier in the iteration.
    fn distinct(&self, comp: Option<Comparer>) -> Sequence;

    /// Suppress items whose key was seen earlier.
    fn distinct_by(&self, key: Accessor, comp: Option<Comparer>) -> Sequence;

    /// This sequence unchanged, then the other's items that are not already
    /// contained (in this sequence or in the union emitted so far).
    fn union(&self, other: &Sequence, comp: Option<Comparer>) -> Sequence;

    fn union_by(&self, other: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence;

    /// Items of this sequence not contained in `exclude`. The right-hand
    /// side must be finite; it is materialized on the first pull.
    fn except(&self, exclude: &Sequence, comp: Option<Comparer>) -> Sequence;

    fn except_by(&self, exclude: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence;

    /// Items contained in both sequences. The side with fewer known items is
    /// iterated (falling back to the right-hand operand when lengths are not
    /// knowable) and the other side is materialized for probing.
    fn intersect(&self, other: &Sequence, comp: Option<Comparer>) -> Sequence;

    fn intersect_by(&self, other: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence;
}

fn identity_key() -> Accessor {
    Accessor::func(|v| v.clone())
}

fn distinct_impl(seq: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
    let src = seq.clone();
    seq.derived(
        defer(move || {
            let mut cur = src.iterate();
            let mut seen = Seen::new(comp.clone());
            let key = key.clone();
            Box::new(std::iter::from_fn(move || loop {
                match cur.next()? {
                    Err(e) => return Some(Err(e)),
                    Ok(v) => {
                        let k = key.apply(&v);
                        if seen.contains(&k) {
                            continue;
                        }
                        seen.insert(k);
                        return Some(Ok(v));
                    }
                }
            }))
        }),
        None,
    )
}

fn union_impl(seq: &Sequence, other: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
    let src = seq.clone();
    let right = other.clone();
    let estimate = match (seq.try_length_hint(), other.try_length_hint()) {
        (LengthHint::Infinite, _) | (_, LengthHint::Infinite) => Some(CountEstimate::Infinite),
        _ => None,
    };
    seq.derived(
        defer(move || {
            let mut left = src.iterate();
            let mut right_cur = right.iterate();
            let mut left_done = false;
            let mut seen = Seen::new(comp.clone());
            let key = key.clone();
            Box::new(std::iter::from_fn(move || loop {
                if !left_done {
                    match left.next() {
                        Some(Err(e)) => return Some(Err(e)),
                        Some(Ok(v)) => {
                            // Left passes through unchanged; only the right
                            // side is deduplicated against it.
                            seen.insert(key.apply(&v));
                            return Some(Ok(v));
                        }
                        None => left_done = true,
                    }
                }
                match right_cur.next()? {
                    Err(e) => return Some(Err(e)),
                    Ok(v) => {
                        let k = key.apply(&v);
                        if seen.contains(&k) {
                            continue;
                        }
                        seen.insert(k);
                        return Some(Ok(v));
                    }
                }
            }))
        }),
        estimate,
    )
}

fn except_impl(seq: &Sequence, exclude: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
    let src = seq.clone();
    let excluded = exclude.clone();
    seq.derived(
        defer(move || {
            let mut members = Seen::new(comp.clone());
            if let Err(e) = excluded.assert_finite() {
                return Box::new(std::iter::once(Err(e)));
            }
            let key = key.clone();
            for item in excluded.iterate() {
                match item {
                    Err(e) => return Box::new(std::iter::once(Err(e))),
                    Ok(v) => members.insert(key.apply(&v)),
                }
            }
            let mut cur = src.iterate();
            Box::new(std::iter::from_fn(move || loop {
                match cur.next()? {
                    Err(e) => return Some(Err(e)),
                    Ok(v) => {
                        if !members.contains(&key.apply(&v)) {
                            return Some(Ok(v));
                        }
                    }
                }
            }))
        }),
        None,
    )
}

fn intersect_impl(
    seq: &Sequence,
    other: &Sequence,
    key: Accessor,
    comp: Option<Comparer>,
) -> Sequence {
    let src = seq.clone();
    let right = other.clone();
    seq.derived(
        defer(move || {
            // Probe the side with fewer known items; with unknowable lengths
            // the right-hand operand is the one walked.
            let (outer, inner) = match (src.try_length_hint().known(), right.try_length_hint().known())
            {
                (Some(a), Some(b)) if a < b => (src.clone(), right.clone()),
                _ => (right.clone(), src.clone()),
            };
            let mut members = Seen::new(comp.clone());
            if let Err(e) = inner.assert_finite() {
                return Box::new(std::iter::once(Err(e)));
            }
            let key = key.clone();
            for item in inner.iterate() {
                match item {
                    Err(e) => return Box::new(std::iter::once(Err(e))),
                    Ok(v) => members.insert(key.apply(&v)),
                }
            }
            let mut cur = outer.iterate();
            Box::new(std::iter::from_fn(move || loop {
                match cur.next()? {
                    Err(e) => return Some(Err(e)),
                    Ok(v) => {
                        if members.contains(&key.apply(&v)) {
                            return Some(Ok(v));
                        }
                    }
                }
            }))
        }),
        None,
    )
}

impl SetOps for Sequence {
    fn distinct(&self, comp: Option<Comparer>) -> Sequence {
        distinct_impl(self, identity_key(), comp)
    }

    fn distinct_by(&self, key: Accessor, comp: Option<Comparer>) -> Sequence {
        distinct_impl(self, key, comp)
    }

    fn union(&self, other: &Sequence, comp: Option<Comparer>) -> Sequence {
        union_impl(self, other, identity_key(), comp)
    }

    fn union_by(&self, other: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
        union_impl(self, other, key, comp)
    }

    fn except(&self, exclude: &Sequence, comp: Option<Comparer>) -> Sequence {
        except_impl(self, exclude, identity_key(), comp)
    }

    fn except_by(&self, exclude: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
        except_impl(self, exclude, key, comp)
    }

    fn intersect(&self, other: &Sequence, comp: Option<Comparer>) -> Sequence {
        intersect_impl(self, other, identity_key(), comp)
    }

    fn intersect_by(&self, other: &Sequence, key: Accessor, comp: Option<Comparer>) -> Sequence {
        intersect_impl(self, other, key, comp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|&i| Value::Int(i)).collect()
    }

    fn seq(items: &[i64]) -> Sequence {
        Sequence::from_values(ints(items))
    }

    fn collect(seq: &Sequence) -> Vec<Value> {
        seq.iterate().collect::<Result<_>>().unwrap()
    }

    #[test]
    fn distinct_suppresses_duplicates_in_order() {
        let out = seq(&[1, 3, 2, 3, 1]).distinct(None);
        assert_eq!(collect(&out), ints(&[1, 3, 2]));
    }

    #[test]
    fn distinct_with_custom_comparer() {
        let parity: Comparer = comparer(|a, b| match (a, b) {
            (Value::Int(x), Value::Int(y)) => x % 2 == y % 2,
            _ => false,
        });
        let out = seq(&[1, 3, 2, 4]).distinct(Some(parity));
        assert_eq!(collect(&out), ints(&[1, 2]));
    }

    #[test]
    fn union_appends_unseen_values() {
        let out = seq(&[1, 3, 2]).union(&seq(&[1, 4]), None);
        assert_eq!(collect(&out), ints(&[1, 3, 2, 4]));
    }

    #[test]
    fn union_by_key() {
        let out = seq(&[1, 3, 2]).union_by(
            &seq(&[1, 4]),
            Accessor::func(|v| match v {
                Value::Int(i) => Value::Int(i * 2),
                other => other.clone(),
            }),
            None,
        );
        // 1 maps to an already-seen key; only 4 is new.
        assert_eq!(collect(&out), ints(&[1, 3, 2, 4]));
    }

    #[test]
    fn except_excludes_right_hand_values() {
        let out = seq(&[1, 3, 2, 3]).except(&seq(&[3]), None);
        assert_eq!(collect(&out), ints(&[1, 2]));
    }

    #[test]
    fn except_requires_finite_right_hand() {
        let infinite =
            Sequence::from_infinite_producer(Box::new((0..).map(|i| Ok(Value::Int(i)))));
        let out = seq(&[1, 2]).except(&infinite, None);
        let err = out.iterate().next().unwrap().unwrap_err();
        assert!(matches!(err, Error::NotFinite));
    }

    #[test]
    fn intersect_walks_right_when_lengths_unknowable() {
        let left = Sequence::from_producer(
            Box::new(vec![1i64, 3, 2].into_iter().map(|i| Ok(Value::Int(i)))),
            None,
        );
        let right = Sequence::from_producer(
            Box::new(vec![2i64, 1].into_iter().map(|i| Ok(Value::Int(i)))),
            None,
        );
        let out = left.intersect(&right, None);
        // Unknowable lengths: the right-hand operand is the walked side, so
        // its order wins.
        assert_eq!(collect(&out), ints(&[2, 1]));
    }

    #[test]
    fn intersect_prefers_smaller_known_side() {
        let left = seq(&[1, 3]);
        let right = seq(&[3, 2, 1]);
        let out = left.intersect(&right, None);
        assert_eq!(collect(&out), ints(&[1, 3]));
    }

    #[test]
    fn empty_sources_are_valid_empty_results() {
        let empty = Sequence::empty();
        assert_eq!(collect(&empty.distinct(None)), vec![]);
        assert_eq!(collect(&empty.union(&Sequence::empty(), None)), vec![]);
        assert_eq!(collect(&empty.intersect(&seq(&[1]), None)), vec![]);
        assert_eq!(collect(&empty.except(&seq(&[1]), None)), vec![]);
    }
}
