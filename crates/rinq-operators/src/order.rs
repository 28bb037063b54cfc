//! Ordering: `order_by`/`then_by` with chained comparators, plus reversal
//! and seeded shuffling.
//!
//! Ordering inherently forces materialization: the source is snapshotted
//! (a private pass for dynamic sources) and sorted stably. `then_by` does
//! not re-sort independently; it chains onto the comparator installed by
//! the previous ordering, consulting the new key only on ties.

use std::cmp::Ordering;
use std::rc::Rc;

use rinq_core::prelude::*;

pub trait OrderOps {
    /// Sort ascending by the optional key; the optional comparator replaces
    /// the default key ordering.
    fn order_by(&self, key: Option<Accessor>, order: Option<KeyCompare>) -> Result<Sequence>;

    fn order_by_descending(
        &self,
        key: Option<Accessor>,
        order: Option<KeyCompare>,
    ) -> Result<Sequence>;

    /// Subordinate ordering: applies only where the previous comparator
    /// ties. Without a previous ordering this is a plain `order_by`.
    fn then_by(&self, key: Accessor, order: Option<KeyCompare>) -> Result<Sequence>;

    fn then_by_descending(&self, key: Accessor, order: Option<KeyCompare>) -> Result<Sequence>;

    /// Sort this sequence's own buffer. Not available in Dynamic mode.
    fn order_by_in_place(&self, key: Option<Accessor>, order: Option<KeyCompare>)
        -> Result<Sequence>;

    /// Materialized copy in reverse order.
    fn reverse(&self) -> Result<Sequence>;

    /// Deterministic permutation for a given seed; entropy-seeded otherwise.
    fn shuffle(&self, seed: Option<u64>) -> Result<Sequence>;
}

/// Bake key extraction, custom ordering, and direction into one item
/// comparator, the unit `then_by` chains on.
fn bake_compare(key: Option<Accessor>, order: Option<KeyCompare>, desc: bool) -> Rc<ItemCompare> {
    let order = order.unwrap_or_else(|| Rc::new(|a: &Value, b: &Value| default_ordering(a, b)));
    Rc::new(move |a: &Value, b: &Value| {
        let result = match &key {
            Some(k) => order(&k.apply(a), &k.apply(b)),
            None => order(a, b),
        };
        if desc {
            result.reverse()
        } else {
            result
        }
    })
}

fn chain(first: Rc<ItemCompare>, second: Rc<ItemCompare>) -> Rc<ItemCompare> {
    Rc::new(move |a: &Value, b: &Value| match first(a, b) {
        Ordering::Equal => second(a, b),
        decided => decided,
    })
}

fn sorted_copy(seq: &Sequence, cmp: Rc<ItemCompare>) -> Result<Sequence> {
    let mut items = seq.snapshot()?;
    items.sort_by(|a, b| cmp(a, b));
    let result = seq.derived_materialized(items);
    result.set_order_compare(Some(cmp));
    Ok(result)
}

impl OrderOps for Sequence {
    fn order_by(&self, key: Option<Accessor>, order: Option<KeyCompare>) -> Result<Sequence> {
        sorted_copy(self, bake_compare(key, order, false))
    }

    fn order_by_descending(
        &self,
        key: Option<Accessor>,
        order: Option<KeyCompare>,
    ) -> Result<Sequence> {
        sorted_copy(self, bake_compare(key, order, true))
    }

    fn then_by(&self, key: Accessor, order: Option<KeyCompare>) -> Result<Sequence> {
        let next = bake_compare(Some(key), order, false);
        match self.order_compare() {
            Some(prev) => sorted_copy(self, chain(prev, next)),
            None => sorted_copy(self, next),
        }
    }

    fn then_by_descending(&self, key: Accessor, order: Option<KeyCompare>) -> Result<Sequence> {
        let next = bake_compare(Some(key), order, true);
        match self.order_compare() {
            Some(prev) => sorted_copy(self, chain(prev, next)),
            None => sorted_copy(self, next),
        }
    }

    fn order_by_in_place(
        &self,
        key: Option<Accessor>,
        order: Option<KeyCompare>,
    ) -> Result<Sequence> {
        if self.is_dynamic() {
            return Err(Error::InvalidOperationOnMode(
                "a dynamic sequence cannot be sorted in place".into(),
            ));
        }
        self.ensure_generated(None)?;
        let cmp = bake_compare(key, order, false);
        let mut items = self.snapshot()?;
        items.sort_by(|a, b| cmp(a, b));
        self.replace_buffer(items)?;
        self.set_order_compare(Some(cmp));
        Ok(self.clone())
    }

    fn reverse(&self) -> Result<Sequence> {
        let mut items = self.snapshot()?;
        items.reverse();
        Ok(self.derived_materialized(items))
    }

    fn shuffle(&self, seed: Option<u64>) -> Result<Sequence> {
        let mut items = self.snapshot()?;
        let mut rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        for i in (1..items.len()).rev() {
            items.swap(i, rng.usize(..=i));
        }
        Ok(self.derived_materialized(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|&i| Value::Int(i)).collect()
    }

    fn collect(seq: &Sequence) -> Vec<Value> {
        seq.iterate().collect::<Result<_>>().unwrap()
    }

    #[test]
    fn order_by_sorts_ascending_and_descending() {
        let seq = Sequence::from_values(ints(&[1, 3, 2]));
        assert_eq!(collect(&seq.order_by(None, None).unwrap()), ints(&[1, 2, 3]));
        assert_eq!(
            collect(&seq.order_by_descending(None, None).unwrap()),
            ints(&[3, 2, 1])
        );
    }

    #[test]
    fn order_by_key_with_strings() {
        let seq = Sequence::from_values(vec![
            Value::record([("name", Value::from("cyd"))]),
            Value::record([("name", Value::from("ada"))]),
        ]);
        let out = seq.order_by(Some(Accessor::name("name")), None).unwrap();
        assert_eq!(
            collect(&out)[0].field("name"),
            Some(&Value::from("ada"))
        );
    }

    #[test]
    fn then_by_breaks_ties_only() {
        let item = |a: i64, b: i64| Value::record([("a", Value::Int(a)), ("b", Value::Int(b))]);
        let seq = Sequence::from_values(vec![item(1, 2), item(0, 9), item(1, 1)]);
        let out = seq
            .order_by(Some(Accessor::name("a")), None)
            .unwrap()
            .then_by(Accessor::name("b"), None)
            .unwrap();
        let rows = collect(&out);
        assert_eq!(rows[0], item(0, 9));
        assert_eq!(rows[1], item(1, 1));
        assert_eq!(rows[2], item(1, 2));
    }

    #[test]
    fn then_by_descending_chains() {
        let item = |a: i64, b: i64| Value::record([("a", Value::Int(a)), ("b", Value::Int(b))]);
        let seq = Sequence::from_values(vec![item(1, 1), item(1, 2), item(0, 0)]);
        let out = seq
            .order_by(Some(Accessor::name("a")), None)
            .unwrap()
            .then_by_descending(Accessor::name("b"), None)
            .unwrap();
        let rows = collect(&out);
        assert_eq!(rows[0], item(0, 0));
        assert_eq!(rows[1], item(1, 2));
        assert_eq!(rows[2], item(1, 1));
    }

    #[test]
    fn in_place_sort_rejected_on_dynamic() {
        let seq = Sequence::dynamic_over(std::rc::Rc::new(std::cell::RefCell::new(ints(&[2, 1]))));
        assert!(matches!(
            seq.order_by_in_place(None, None),
            Err(Error::InvalidOperationOnMode(_))
        ));
        // Out-of-place ordering snapshots the current pass instead.
        let sorted = seq.order_by(None, None).unwrap();
        assert_eq!(collect(&sorted), ints(&[1, 2]));
    }

    #[test]
    fn infinite_sources_fail_fast() {
        let seq = Sequence::from_infinite_producer(Box::new((0..).map(|i| Ok(Value::Int(i)))));
        assert!(matches!(seq.order_by(None, None), Err(Error::NotFinite)));
        assert!(matches!(seq.reverse(), Err(Error::NotFinite)));
        assert!(matches!(seq.shuffle(Some(1)), Err(Error::NotFinite)));
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let seq = Sequence::from_values(ints(&[1, 2, 3, 4, 5, 6, 7, 8]));
        let a = collect(&seq.shuffle(Some(42)).unwrap());
        let b = collect(&seq.shuffle(Some(42)).unwrap());
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_by(default_ordering);
        assert_eq!(sorted, ints(&[1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn empty_source_is_a_valid_empty_result() {
        let out = Sequence::empty().order_by(None, None).unwrap();
        assert_eq!(collect(&out), vec![]);
    }
}
