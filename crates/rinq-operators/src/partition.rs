//! Partitioning and windowing: skip/take families and fixed-size chunking.
//!
//! Negative counts mean "from the end" and delegate to the `_last`
//! counterparts. The `_last` operators run a bounded sliding buffer, so a
//! dynamic source is never materialized beyond `count` items.

use std::collections::VecDeque;

use rinq_core::prelude::*;

pub trait PartitionOps {
    /// Drop the first `count` items; negative counts drop from the end.
    fn skip(&self, count: i64) -> Sequence;

    /// Drop the trailing `count` items.
    fn skip_last(&self, count: usize) -> Sequence;

    /// Drop items until the predicate first returns false.
    fn skip_while(&self, pred: impl Fn(&Value) -> bool + 'static) -> Sequence;

    /// Keep the first `count` items; negative counts keep from the end.
    fn take(&self, count: i64) -> Sequence;

    /// Keep the trailing `count` items (bounded sliding buffer).
    fn take_last(&self, count: usize) -> Sequence;

    /// Keep items until the predicate first returns false.
    fn take_while(&self, pred: impl Fn(&Value) -> bool + 'static) -> Sequence;

    /// Fixed-size sub-sequences; the final chunk may be short.
    fn chunk(&self, size: usize) -> Result<Sequence>;
}

impl PartitionOps for Sequence {
    fn skip(&self, count: i64) -> Sequence {
        if count < 0 {
            return self.skip_last(count.unsigned_abs() as usize);
        }
        let count = count as usize;
        let estimate = match self.try_length_hint() {
            LengthHint::Known(n) => Some(CountEstimate::Finite(n.saturating_sub(count))),
            LengthHint::Infinite => Some(CountEstimate::Infinite),
            LengthHint::Unknown => None,
        };
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut remaining = count;
                Box::new(std::iter::from_fn(move || loop {
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            if remaining == 0 {
                                return Some(Ok(v));
                            }
                            remaining -= 1;
                        }
                    }
                }))
            }),
            estimate,
        )
    }

    fn skip_last(&self, count: usize) -> Sequence {
        let estimate = match self.try_length_hint() {
            LengthHint::Known(n) => Some(CountEstimate::Finite(n.saturating_sub(count))),
            _ => None,
        };
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut window: VecDeque<Value> = VecDeque::with_capacity(count + 1);
                Box::new(std::iter::from_fn(move || loop {
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            window.push_back(v);
                            if window.len() > count {
                                return window.pop_front().map(Ok);
                            }
                        }
                    }
                }))
            }),
            estimate,
        )
    }

    fn skip_while(&self, pred: impl Fn(&Value) -> bool + 'static) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut skipping = true;
                Box::new(std::iter::from_fn(move || loop {
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => {
                            if skipping && pred(&v) {
                                continue;
                            }
                            skipping = false;
                            return Some(Ok(v));
                        }
                    }
                }))
            }),
            None,
        )
    }

    fn take(&self, count: i64) -> Sequence {
        if count < 0 {
            return self.take_last(count.unsigned_abs() as usize);
        }
        let count = count as usize;
        let estimate = match self.try_length_hint() {
            LengthHint::Known(n) => Some(CountEstimate::Finite(n.min(count))),
            // Taking finitely many items makes even an infinite source finite.
            LengthHint::Infinite | LengthHint::Unknown => Some(CountEstimate::Finite(count)),
        };
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut remaining = count;
                Box::new(std::iter::from_fn(move || {
                    if remaining == 0 {
                        return None;
                    }
                    match cur.next()? {
                        Err(e) => Some(Err(e)),
                        Ok(v) => {
                            remaining -= 1;
                            Some(Ok(v))
                        }
                    }
                }))
            }),
            estimate,
        )
    }

    fn take_last(&self, count: usize) -> Sequence {
        let estimate = match self.try_length_hint() {
            LengthHint::Known(n) => Some(CountEstimate::Finite(n.min(count))),
            _ => None,
        };
        let src = self.clone();
        self.derived(
            defer(move || {
                if count == 0 {
                    return Box::new(std::iter::empty()) as Pull;
                }
                if let Err(e) = src.assert_finite() {
                    return Box::new(std::iter::once(Err(e)));
                }
                let mut window: VecDeque<Value> = VecDeque::with_capacity(count + 1);
                for item in src.iterate() {
                    match item {
                        Err(e) => return Box::new(std::iter::once(Err(e))),
                        Ok(v) => {
                            window.push_back(v);
                            if window.len() > count {
                                window.pop_front();
                            }
                        }
                    }
                }
                Box::new(window.into_iter().map(Ok))
            }),
            estimate,
        )
    }

    fn take_while(&self, pred: impl Fn(&Value) -> bool + 'static) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut done = false;
                Box::new(std::iter::from_fn(move || {
                    if done {
                        return None;
                    }
                    match cur.next()? {
                        Err(e) => Some(Err(e)),
                        Ok(v) => {
                            if pred(&v) {
                                Some(Ok(v))
                            } else {
                                done = true;
                                None
                            }
                        }
                    }
                }))
            }),
            None,
        )
    }

    fn chunk(&self, size: usize) -> Result<Sequence> {
        if size == 0 {
            return Err(Error::InvalidIndex { index: 0 });
        }
        let estimate = match self.try_length_hint() {
            LengthHint::Known(n) => Some(CountEstimate::Finite(n.div_ceil(size))),
            LengthHint::Infinite => Some(CountEstimate::Infinite),
            LengthHint::Unknown => None,
        };
        let src = self.clone();
        let parent = self.clone();
        Ok(self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let parent = parent.clone();
                Box::new(std::iter::from_fn(move || {
                    let mut data = Vec::with_capacity(size);
                    while data.len() < size {
                        match cur.next() {
                            None => break,
                            Some(Err(e)) => return Some(Err(e)),
                            Some(Ok(v)) => data.push(v),
                        }
                    }
                    if data.is_empty() {
                        return None;
                    }
                    Some(Ok(Value::Seq(parent.derived_materialized(data))))
                }))
            }),
            estimate,
        ))
    }
}
