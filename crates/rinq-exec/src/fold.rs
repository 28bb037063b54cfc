//! Aggregation and reduction terminals: count/any/all/contains, fold,
//! numeric reductions, extremes, and the driving `for_each` loop.
//!
//! `min`/`max` short-circuit the moment the type's extreme representable
//! value is seen. Counting is authoritative: it never trusts the
//! non-authoritative length estimate, so `count` always agrees with the
//! materialized length.

use std::ops::ControlFlow;
use std::rc::Rc;

use rinq_core::prelude::*;

use crate::pick::Filter;

/// Binary fold step for `aggregate`.
pub type FoldFn = Rc<dyn Fn(&Value, &Value) -> Value>;

pub trait FoldOps {
    /// Number of (matching) items. Authoritative; walks unless the length is
    /// already exact (complete buffer or foreign source).
    fn count(&self, pred: Option<Filter>) -> Result<usize>;

    fn is_empty_seq(&self) -> Result<bool>;
    fn any(&self, pred: Option<Filter>) -> Result<bool>;
    fn all(&self, pred: Filter) -> Result<bool>;
    fn contains(&self, value: &Value, comp: Option<Comparer>) -> Result<bool>;

    /// Pairwise equality of two finite sequences.
    fn sequence_equal(&self, other: &Sequence, comp: Option<Comparer>) -> Result<bool>;

    /// Fold items left to right. Without a seed the first item seeds the
    /// fold and an empty source is an error; with a seed an empty source
    /// returns the seed. The optional `finish` transforms the final value.
    fn aggregate(
        &self,
        f: FoldFn,
        seed: Option<Value>,
        finish: Option<KeyFn>,
    ) -> Result<Value>;

    fn sum(&self, key: Option<Accessor>) -> Result<Value>;
    fn average(&self, key: Option<Accessor>) -> Result<Value>;

    /// Smallest/largest key value.
    fn min(&self, key: Option<Accessor>) -> Result<Value>;
    fn max(&self, key: Option<Accessor>) -> Result<Value>;

    /// Item owning the smallest/largest key.
    fn min_by(&self, key: Accessor) -> Result<Value>;
    fn max_by(&self, key: Accessor) -> Result<Value>;

    /// Running halved average folded to its final value.
    fn moving_average(&self, seed: f64) -> Result<f64>;

    /// Drive the sequence; the callback may stop the iteration early, which
    /// is the engine's only cancellation mechanism.
    fn for_each(&self, f: impl FnMut(&Value, usize) -> ControlFlow<()>) -> Result<()>;
}

impl FoldOps for Sequence {
    fn count(&self, pred: Option<Filter>) -> Result<usize> {
        if pred.is_none() {
            if self.is_extended() {
                if let LengthHint::Known(n) = self.try_length_hint() {
                    return Ok(n);
                }
            }
            // Only a complete own buffer is authoritative; a drained
            // non-caching sequence has an empty buffer and no length.
            if let Some(items) = self.materialized_items() {
                return Ok(items.len());
            }
        }
        self.assert_finite()?;
        let mut count = 0;
        for item in self.iterate() {
            let item = item?;
            if pred.as_ref().is_none_or(|p| p(&item)) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn is_empty_seq(&self) -> Result<bool> {
        match self.iterate().next() {
            None => Ok(true),
            Some(Err(e)) => Err(e),
            Some(Ok(_)) => Ok(false),
        }
    }

    fn any(&self, pred: Option<Filter>) -> Result<bool> {
        for item in self.iterate() {
            let item = item?;
            if pred.as_ref().is_none_or(|p| p(&item)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn all(&self, pred: Filter) -> Result<bool> {
        for item in self.iterate() {
            if !pred(&item?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn contains(&self, value: &Value, comp: Option<Comparer>) -> Result<bool> {
        let value = value.clone();
        self.any(Some(Rc::new(move |item: &Value| match &comp {
            Some(c) => c(&value, item),
            None => value == *item,
        })))
    }

    fn sequence_equal(&self, other: &Sequence, comp: Option<Comparer>) -> Result<bool> {
        self.assert_finite()?;
        other.assert_finite()?;
        let mut left = self.iterate();
        let mut right = other.iterate();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ok(true),
                (None, Some(_)) | (Some(_), None) => return Ok(false),
                (Some(a), Some(b)) => {
                    let (a, b) = (a?, b?);
                    let equal = match &comp {
                        Some(c) => c(&a, &b),
                        None => a == b,
                    };
                    if !equal {
                        return Ok(false);
                    }
                }
            }
        }
    }

    fn aggregate(&self, f: FoldFn, seed: Option<Value>, finish: Option<KeyFn>) -> Result<Value> {
        self.assert_finite()?;
        let mut acc = seed;
        for item in self.iterate() {
            let item = item?;
            acc = Some(match acc {
                Some(acc) => f(&acc, &item),
                None => item,
            });
        }
        match acc {
            Some(value) => Ok(match finish {
                Some(finish) => finish(&value),
                None => value,
            }),
            None => Err(Error::EmptyResult),
        }
    }

    fn sum(&self, key: Option<Accessor>) -> Result<Value> {
        self.assert_finite()?;
        let mut int_total: i64 = 0;
        let mut float_total: f64 = 0.0;
        let mut saw_float = false;
        for item in self.iterate() {
            let item = item?;
            let v = match &key {
                Some(k) => k.apply(&item),
                None => item,
            };
            match v {
                Value::Int(i) => {
                    int_total = int_total.wrapping_add(i);
                    float_total += i as f64;
                }
                Value::Float(f) => {
                    saw_float = true;
                    float_total += f;
                }
                other => {
                    return Err(Error::InvalidItemType {
                        op: "sum",
                        found: other.kind(),
                    })
                }
            }
        }
        if saw_float {
            Ok(Value::Float(float_total))
        } else {
            Ok(Value::Int(int_total))
        }
    }

    fn average(&self, key: Option<Accessor>) -> Result<Value> {
        self.assert_finite()?;
        let mut total = 0.0;
        let mut count = 0usize;
        for item in self.iterate() {
            let item = item?;
            let v = match &key {
                Some(k) => k.apply(&item),
                None => item,
            };
            match v.as_f64() {
                Some(f) => {
                    total += f;
                    count += 1;
                }
                None => {
                    return Err(Error::InvalidItemType {
                        op: "average",
                        found: v.kind(),
                    })
                }
            }
        }
        if count == 0 {
            Ok(Value::Float(0.0))
        } else {
            Ok(Value::Float(total / count as f64))
        }
    }

    fn min(&self, key: Option<Accessor>) -> Result<Value> {
        extreme(self, key, true).map(|(value, _)| value)
    }

    fn max(&self, key: Option<Accessor>) -> Result<Value> {
        extreme(self, key, false).map(|(value, _)| value)
    }

    fn min_by(&self, key: Accessor) -> Result<Value> {
        extreme(self, Some(key), true).map(|(_, item)| item)
    }

    fn max_by(&self, key: Accessor) -> Result<Value> {
        extreme(self, Some(key), false).map(|(_, item)| item)
    }

    fn moving_average(&self, seed: f64) -> Result<f64> {
        self.assert_finite()?;
        let mut ma = seed;
        for item in self.iterate() {
            let item = item?;
            match item.as_f64() {
                Some(x) => ma = (ma + x) / 2.0,
                None => {
                    return Err(Error::InvalidItemType {
                        op: "moving_average",
                        found: item.kind(),
                    })
                }
            }
        }
        Ok(ma)
    }

    fn for_each(&self, mut f: impl FnMut(&Value, usize) -> ControlFlow<()>) -> Result<()> {
        for (idx, item) in self.iterate().enumerate() {
            let item = item?;
            if f(&item, idx).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// The sentinel extreme of the value's own type ends the scan immediately.
fn is_sentinel_extreme(value: &Value, minimum: bool) -> bool {
    match (value, minimum) {
        (Value::Int(i), true) => *i == i64::MIN,
        (Value::Int(i), false) => *i == i64::MAX,
        (Value::Float(f), true) => *f == f64::NEG_INFINITY,
        (Value::Float(f), false) => *f == f64::INFINITY,
        _ => false,
    }
}

fn extreme(seq: &Sequence, key: Option<Accessor>, minimum: bool) -> Result<(Value, Value)> {
    seq.assert_finite()?;
    let mut best: Option<(Value, Value)> = None;
    for item in seq.iterate() {
        let item = item?;
        let k = match &key {
            Some(key) => key.apply(&item),
            None => item.clone(),
        };
        if is_sentinel_extreme(&k, minimum) {
            return Ok((k, item));
        }
        let better = match &best {
            None => true,
            Some((bk, _)) => {
                let ord = default_ordering(&k, bk);
                if minimum {
                    ord == std::cmp::Ordering::Less
                } else {
                    ord == std::cmp::Ordering::Greater
                }
            }
        };
        if better {
            best = Some((k, item));
        }
    }
    best.ok_or(Error::EmptyResult)
}

// --- asynchronous iteration/aggregation callbacks ---

/// Drive the sequence with an awaited callback; one item completes fully
/// before the next is pulled.
pub async fn for_each_async<F, Fut>(seq: &Sequence, mut f: F) -> Result<()>
where
    F: FnMut(Value, usize) -> Fut,
    Fut: std::future::Future<Output = ControlFlow<()>>,
{
    for (idx, item) in seq.iterate().enumerate() {
        let item = item?;
        if f(item, idx).await.is_break() {
            break;
        }
    }
    Ok(())
}

/// Fold with an awaited step function.
pub async fn aggregate_async<F, Fut>(seq: &Sequence, f: F, seed: Option<Value>) -> Result<Value>
where
    F: Fn(Value, Value) -> Fut,
    Fut: std::future::Future<Output = Value>,
{
    seq.assert_finite()?;
    let mut acc = seed;
    for item in seq.iterate() {
        let item = item?;
        acc = Some(match acc {
            Some(acc) => f(acc, item).await,
            None => item,
        });
    }
    acc.ok_or(Error::EmptyResult)
}

/// Count with an awaited predicate.
pub async fn count_async<F, Fut>(seq: &Sequence, pred: F) -> Result<usize>
where
    F: Fn(Value) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    seq.assert_finite()?;
    let mut count = 0;
    for item in seq.iterate() {
        if pred(item?).await {
            count += 1;
        }
    }
    Ok(count)
}

/// Short-circuiting awaited any/all.
pub async fn any_async<F, Fut>(seq: &Sequence, pred: F) -> Result<bool>
where
    F: Fn(Value) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for item in seq.iterate() {
        if pred(item?).await {
            return Ok(true);
        }
    }
    Ok(false)
}

pub async fn all_async<F, Fut>(seq: &Sequence, pred: F) -> Result<bool>
where
    F: Fn(Value) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for item in seq.iterate() {
        if !pred(item?).await {
            return Ok(false);
        }
    }
    Ok(true)
}
