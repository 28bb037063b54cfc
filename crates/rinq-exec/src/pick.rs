//! Singleton extraction: first/last/single/element_at and their defaulting
//! variants.
//!
//! `first` and `single` short-circuit without materializing; the from-the-end
//! extractions walk with a bounded window, so a dynamic or unknown-length
//! source is never trusted for a cached length.

use std::collections::VecDeque;
use std::rc::Rc;

use rinq_core::prelude::*;

/// Optional filter applied before extraction.
pub type Filter = Rc<dyn Fn(&Value) -> bool>;

pub trait PickOps {
    fn first(&self, pred: Option<Filter>) -> Result<Value>;
    fn first_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value>;
    fn last(&self, pred: Option<Filter>) -> Result<Value>;
    fn last_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value>;

    /// Exactly one qualifying item; a second match fails immediately.
    fn single(&self, pred: Option<Filter>) -> Result<Value>;
    fn single_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value>;

    /// Positional access; negative indices count from the end.
    fn element_at(&self, index: i64) -> Result<Value>;
    fn element_at_or_default(&self, index: i64, default: Value) -> Result<Value>;
}

fn matches(pred: &Option<Filter>, value: &Value) -> bool {
    match pred {
        Some(f) => f(value),
        None => true,
    }
}

fn first_match(seq: &Sequence, pred: &Option<Filter>) -> Result<Option<Value>> {
    for item in seq.iterate() {
        let item = item?;
        if matches(pred, &item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

fn last_match(seq: &Sequence, pred: &Option<Filter>) -> Result<Option<Value>> {
    seq.assert_finite()?;
    let mut last = None;
    for item in seq.iterate() {
        let item = item?;
        if matches(pred, &item) {
            last = Some(item);
        }
    }
    Ok(last)
}

fn single_match(seq: &Sequence, pred: &Option<Filter>) -> Result<Option<Value>> {
    let mut found: Option<Value> = None;
    for (idx, item) in seq.iterate().enumerate() {
        let item = item?;
        if !matches(pred, &item) {
            continue;
        }
        if found.is_some() {
            return Err(Error::MultipleMatches { index: idx });
        }
        found = Some(item);
    }
    Ok(found)
}

fn element_from_end(seq: &Sequence, back: usize) -> Result<Option<Value>> {
    seq.assert_finite()?;
    let mut window: VecDeque<Value> = VecDeque::with_capacity(back + 1);
    for item in seq.iterate() {
        window.push_back(item?);
        if window.len() > back {
            window.pop_front();
        }
    }
    if window.len() == back {
        Ok(window.pop_front())
    } else {
        Ok(None)
    }
}

impl PickOps for Sequence {
    fn first(&self, pred: Option<Filter>) -> Result<Value> {
        first_match(self, &pred)?.ok_or(Error::EmptyResult)
    }

    fn first_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value> {
        Ok(first_match(self, &pred)?.unwrap_or(default))
    }

    fn last(&self, pred: Option<Filter>) -> Result<Value> {
        last_match(self, &pred)?.ok_or(Error::EmptyResult)
    }

    fn last_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value> {
        Ok(last_match(self, &pred)?.unwrap_or(default))
    }

    fn single(&self, pred: Option<Filter>) -> Result<Value> {
        single_match(self, &pred)?.ok_or(Error::EmptyResult)
    }

    fn single_or_default(&self, pred: Option<Filter>, default: Value) -> Result<Value> {
        Ok(single_match(self, &pred)?.unwrap_or(default))
    }

    fn element_at(&self, index: i64) -> Result<Value> {
        self.element_at_impl(index)?
            .ok_or(Error::InvalidIndex { index })
    }

    fn element_at_or_default(&self, index: i64, default: Value) -> Result<Value> {
        Ok(self.element_at_impl(index)?.unwrap_or(default))
    }
}

trait ElementAtImpl {
    fn element_at_impl(&self, index: i64) -> Result<Option<Value>>;
}

impl ElementAtImpl for Sequence {
    fn element_at_impl(&self, index: i64) -> Result<Option<Value>> {
        if index < 0 {
            return element_from_end(self, index.unsigned_abs() as usize);
        }
        // Walk rather than trust a cached length; the walk itself caches
        // wherever the mode allows it.
        let target = index as usize;
        for (idx, item) in self.iterate().enumerate() {
            let item = item?;
            if idx == target {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}
