//! The `Sequence` state machine and pull-based iteration protocol.
//!
//! A sequence is one of:
//! - *Materialized*: the buffer is complete, no producer remains.
//! - *Streaming-cached*: pulls append to the buffer; exhaustion collapses
//!   into Materialized.
//! - *Streaming-uncached*: pulls pass through without caching; a fully
//!   drained sequence is permanently unusable for iteration.
//! - *Dynamic*: the producer factory is re-invoked at the start of every
//!   full pass, so repeated iteration reflects a live external source.
//!   Caching is always off in this mode.
//! - *Extended*: iteration and length queries delegate to a foreign
//!   indexable source; the own buffer is bypassed entirely.
//!
//! Production is suspend/resume pull driven entirely by the consumer: nothing
//! runs unless something is actively pulling, and a consumer that stops
//! pulling leaves the sequence in whatever partial state it reached.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::accessor::ItemCompare;
use crate::error::{Error, Result};
use crate::id::SeqId;
use crate::value::Value;

/// A suspended pull source yielding items one at a time.
pub type Pull = Box<dyn Iterator<Item = Result<Value>>>;

/// Factory of pull sources; invoked fresh per full pass in Dynamic mode.
pub type PullFactory = Rc<dyn Fn() -> Pull>;

/// A foreign iterable + length-bearing object a sequence can delegate to.
///
/// This is the explicit adapter replacing ad-hoc retrofitting of the host's
/// native collection type: wrap the collection, don't patch it.
pub trait ExtendedSource {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<Value>;
}

impl ExtendedSource for RefCell<Vec<Value>> {
    fn len(&self) -> usize {
        self.borrow().len()
    }
    fn get(&self, index: usize) -> Option<Value> {
        self.borrow().get(index).cloned()
    }
}

/// Non-authoritative size hint stored on a not-yet-materialized sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountEstimate {
    Finite(usize),
    Infinite,
}

/// Answer of [`Sequence::try_length_hint`]: authoritative once materialized,
/// a hint before that, `Unknown` when no hint exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHint {
    Known(usize),
    Infinite,
    Unknown,
}

impl LengthHint {
    pub fn known(self) -> Option<usize> {
        match self {
            LengthHint::Known(n) => Some(n),
            _ => None,
        }
    }
}

struct Lineage {
    parent_id: SeqId,
    parent: Weak<RefCell<Inner>>,
}

struct Inner {
    id: SeqId,
    type_name: String,
    buffer: Vec<Value>,
    producer: Option<Pull>,
    generated: bool,
    store: bool,
    pass_store: bool,
    dynamic: Option<PullFactory>,
    extended: Option<Rc<dyn ExtendedSource>>,
    estimate: Option<CountEstimate>,
    lineage: Option<Lineage>,
    group_key: Option<Value>,
    tag: Option<Value>,
    ordering: Option<Rc<ItemCompare>>,
}

impl Inner {
    fn fresh() -> Self {
        Inner {
            id: SeqId::next(),
            type_name: "Sequence".to_string(),
            buffer: Vec::new(),
            producer: None,
            generated: true,
            store: true,
            pass_store: false,
            dynamic: None,
            extended: None,
            estimate: None,
            lineage: None,
            group_key: None,
            tag: None,
            ordering: None,
        }
    }
}

/// Cheaply-cloneable handle over the sequence state. All access is
/// single-threaded; derived sequences read their parent only through the
/// parent's own iteration protocol.
#[derive(Clone)]
pub struct Sequence {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Sequence")
            .field("id", &inner.id)
            .field("generated", &inner.generated)
            .field("store", &inner.store)
            .field("dynamic", &inner.dynamic.is_some())
            .field("extended", &inner.extended.is_some())
            .field("buffered", &inner.buffer.len())
            .finish()
    }
}

// --- construction ---

impl Sequence {
    /// Materialized sequence over known finite data.
    pub fn from_values(items: Vec<Value>) -> Sequence {
        let mut inner = Inner::fresh();
        inner.buffer = items;
        Sequence {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Streaming-cached sequence over a suspended producer.
    pub fn from_producer(producer: Pull, estimate: Option<CountEstimate>) -> Sequence {
        let mut inner = Inner::fresh();
        inner.producer = Some(producer);
        inner.generated = false;
        inner.estimate = estimate;
        Sequence {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Streaming-uncached sequence over an unbounded producer. The infinite
    /// hint makes every materializing operation fail fast instead of looping.
    pub fn from_infinite_producer(producer: Pull) -> Sequence {
        let seq = Sequence::from_producer(producer, Some(CountEstimate::Infinite));
        seq.inner.borrow_mut().store = false;
        seq
    }

    /// Integer range; decrements when `from > to`. Bounds exclusive on the
    /// `to` side.
    pub fn range(from: i64, to: i64) -> Sequence {
        let estimate = CountEstimate::Finite(from.abs_diff(to) as usize);
        let mut next = from;
        let producer = std::iter::from_fn(move || {
            if from <= to {
                if next >= to {
                    return None;
                }
                let v = next;
                next += 1;
                Some(Ok(Value::Int(v)))
            } else {
                if next <= to {
                    return None;
                }
                let v = next;
                next -= 1;
                Some(Ok(Value::Int(v)))
            }
        });
        Sequence::from_producer(Box::new(producer), Some(estimate))
    }

    /// Repeat a fixed value `count` times.
    pub fn repeat(value: Value, count: usize) -> Sequence {
        Sequence::repeat_with(move |_| value.clone(), count)
    }

    /// Repeat a factory result `count` times; the factory gets the index.
    pub fn repeat_with(f: impl Fn(usize) -> Value + 'static, count: usize) -> Sequence {
        let mut i = 0;
        let producer = std::iter::from_fn(move || {
            if i >= count {
                return None;
            }
            let v = f(i);
            i += 1;
            Some(Ok(v))
        });
        Sequence::from_producer(Box::new(producer), Some(CountEstimate::Finite(count)))
    }

    pub fn empty() -> Sequence {
        Sequence::from_values(Vec::new())
    }

    /// Passthrough over a foreign iterable; iteration and length queries
    /// delegate entirely, the own buffer is unused.
    pub fn extend(source: Rc<dyn ExtendedSource>) -> Sequence {
        let mut inner = Inner::fresh();
        inner.extended = Some(source);
        Sequence {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Dynamic sequence: the factory is re-invoked at the start of every
    /// full pass. Caching is forced off.
    pub fn dynamic(factory: PullFactory) -> Sequence {
        let mut inner = Inner::fresh();
        inner.dynamic = Some(factory);
        inner.generated = false;
        inner.store = false;
        Sequence {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Dynamic sequence over a shared external list; mutations to the list
    /// between passes are observed by the next pass.
    pub fn dynamic_over(source: Rc<RefCell<Vec<Value>>>) -> Sequence {
        Sequence::dynamic(Rc::new(move || {
            let source = source.clone();
            let mut idx = 0;
            Box::new(std::iter::from_fn(move || {
                let v = source.borrow().get(idx).cloned()?;
                idx += 1;
                Some(Ok(v))
            }))
        }))
    }
}

// --- flag and payload accessors ---

impl Sequence {
    pub fn id(&self) -> SeqId {
        self.inner.borrow().id
    }

    /// Concrete subtype name carried into the wire format.
    pub fn type_name(&self) -> String {
        self.inner.borrow().type_name.clone()
    }

    pub fn set_type_name(&self, name: impl Into<String>) {
        self.inner.borrow_mut().type_name = name.into();
    }

    pub fn group_key(&self) -> Option<Value> {
        self.inner.borrow().group_key.clone()
    }

    pub fn set_group_key(&self, key: Option<Value>) {
        self.inner.borrow_mut().group_key = key;
    }

    pub fn tag(&self) -> Option<Value> {
        self.inner.borrow().tag.clone()
    }

    pub fn set_tag(&self, tag: Option<Value>) {
        self.inner.borrow_mut().tag = tag;
    }

    /// The sequence this one was derived from, if it is still alive.
    /// Diagnostics only; never used for ownership.
    pub fn parent(&self) -> Option<Sequence> {
        let inner = self.inner.borrow();
        inner
            .lineage
            .as_ref()
            .and_then(|l| l.parent.upgrade())
            .map(|rc| Sequence { inner: rc })
    }

    pub fn parent_id(&self) -> Option<SeqId> {
        self.inner.borrow().lineage.as_ref().map(|l| l.parent_id)
    }

    pub fn is_generated(&self) -> bool {
        self.inner.borrow().generated
    }

    pub fn stores(&self) -> bool {
        self.inner.borrow().store
    }

    pub fn pass_store(&self) -> bool {
        self.inner.borrow().pass_store
    }

    pub fn is_dynamic(&self) -> bool {
        self.inner.borrow().dynamic.is_some()
    }

    pub fn is_extended(&self) -> bool {
        self.inner.borrow().extended.is_some()
    }

    /// Whether this sequence can seed a dynamic view: it must own (or be able
    /// to own) a complete buffer for the factory to read.
    pub fn supports_dynamic(&self) -> bool {
        let inner = self.inner.borrow();
        inner.extended.is_none() && (inner.store || inner.dynamic.is_some())
    }

    /// Item comparator installed by the last ordering operator, consulted by
    /// `then_by` for comparator chaining.
    pub fn order_compare(&self) -> Option<Rc<ItemCompare>> {
        self.inner.borrow().ordering.clone()
    }

    pub fn set_order_compare(&self, cmp: Option<Rc<ItemCompare>>) {
        self.inner.borrow_mut().ordering = cmp;
    }

    /// Number of items currently buffered (not the logical length).
    pub fn buffered_len(&self) -> usize {
        self.inner.borrow().buffer.len()
    }

    /// Snapshot of the complete buffer, only if this sequence is fully
    /// materialized in its own buffer. Never pulls.
    pub fn materialized_items(&self) -> Option<Vec<Value>> {
        let inner = self.inner.borrow();
        if inner.generated && inner.extended.is_none() && inner.dynamic.is_none() && inner.store {
            Some(inner.buffer.clone())
        } else {
            None
        }
    }

    /// Shallow equality used by `Value`: same handle, or both materialized
    /// with equal buffers. Deep comparison that may pull is the explicit
    /// `sequence_equal` terminal.
    pub fn value_eq(&self, other: &Sequence) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        match (self.materialized_items(), other.materialized_items()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

// --- the iteration protocol ---

impl Sequence {
    /// Pull source over this sequence's logical order.
    ///
    /// Extended sequences delegate to the foreign source; Dynamic sequences
    /// invoke a fresh producer instance; streaming sequences resume the
    /// stored producer, appending to the buffer when caching is on. A fully
    /// drained single-pass sequence yields `ExhaustedSingleUse`.
    pub fn iterate(&self) -> Pull {
        let inner = self.inner.borrow();
        if let Some(src) = inner.extended.clone() {
            let mut idx = 0;
            return Box::new(std::iter::from_fn(move || {
                if idx >= src.len() {
                    return None;
                }
                let v = src.get(idx)?;
                idx += 1;
                Some(Ok(v))
            }));
        }
        if let Some(factory) = inner.dynamic.clone() {
            drop(inner);
            return factory();
        }
        if inner.generated && !inner.store {
            return Box::new(std::iter::once(Err(Error::ExhaustedSingleUse)));
        }
        drop(inner);
        Box::new(Cursor {
            seq: self.clone(),
            idx: 0,
        })
    }

    /// Length estimate without forcing enumeration: authoritative once the
    /// buffer is complete, the stored hint before that.
    pub fn try_length_hint(&self) -> LengthHint {
        let inner = self.inner.borrow();
        if let Some(src) = &inner.extended {
            return LengthHint::Known(src.len());
        }
        if inner.generated && inner.dynamic.is_none() {
            return LengthHint::Known(inner.buffer.len());
        }
        match inner.estimate {
            Some(CountEstimate::Finite(n)) => LengthHint::Known(n),
            Some(CountEstimate::Infinite) => LengthHint::Infinite,
            None => LengthHint::Unknown,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.try_length_hint(), LengthHint::Infinite)
    }

    /// Fail fast instead of looping forever: materializing operations call
    /// this before their first pull.
    pub fn assert_finite(&self) -> Result<()> {
        if self.is_infinite() {
            Err(Error::NotFinite)
        } else {
            Ok(())
        }
    }

    /// One full pass collected into a private vector. Works in every mode
    /// (a caching pass for streaming-cached, a fresh pass for dynamic); the
    /// buffer of this sequence is never shared with the result.
    pub fn snapshot(&self) -> Result<Vec<Value>> {
        self.assert_finite()?;
        self.iterate().collect()
    }
}

struct Cursor {
    seq: Sequence,
    idx: usize,
}

impl Iterator for Cursor {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        {
            let inner = self.seq.inner.borrow();
            if self.idx < inner.buffer.len() {
                let v = inner.buffer[self.idx].clone();
                self.idx += 1;
                return Some(Ok(v));
            }
            if inner.generated {
                return None;
            }
        }
        // The producer is taken out for the duration of one pull so it can
        // itself iterate other sequences without overlapping borrows.
        let mut producer = {
            let mut inner = self.seq.inner.borrow_mut();
            match inner.producer.take() {
                Some(p) => p,
                None => return None,
            }
        };
        let item = producer.next();
        let mut inner = self.seq.inner.borrow_mut();
        match item {
            None => {
                inner.generated = true;
                inner.estimate = None;
                tracing::trace!(id = %inner.id, buffered = inner.buffer.len(), store = inner.store, "producer exhausted");
                None
            }
            Some(Err(e)) => {
                inner.producer = Some(producer);
                Some(Err(e))
            }
            Some(Ok(v)) => {
                inner.producer = Some(producer);
                if inner.store {
                    inner.buffer.push(v.clone());
                    self.idx = inner.buffer.len();
                }
                Some(Ok(v))
            }
        }
    }
}

/// Defer producer construction until the first pull, so building an operator
/// chain never touches the sources.
pub fn defer(f: impl FnOnce() -> Pull + 'static) -> Pull {
    let mut pending: Option<Box<dyn FnOnce() -> Pull>> = Some(Box::new(f));
    let mut live: Option<Pull> = None;
    Box::new(std::iter::from_fn(move || {
        if live.is_none() {
            live = Some(pending.take()?());
        }
        live.as_mut()?.next()
    }))
}

// --- state transitions ---

impl Sequence {
    /// Pull and cache at most `until` items (all when omitted). No-op if the
    /// buffer already satisfies the request; full materialization fails fast
    /// on an infinite hint.
    pub fn ensure_generated(&self, until: Option<usize>) -> Result<Sequence> {
        {
            let inner = self.inner.borrow();
            if inner.extended.is_some() {
                return Ok(self.clone());
            }
            if inner.dynamic.is_some() {
                return Err(Error::InvalidOperationOnMode(
                    "a dynamic sequence cannot be materialized in place".into(),
                ));
            }
            if inner.generated || inner.producer.is_none() {
                return Ok(self.clone());
            }
            if let Some(n) = until {
                if inner.buffer.len() >= n {
                    return Ok(self.clone());
                }
            }
            if !inner.store {
                return Err(Error::InvalidOperationOnMode(
                    "storing is disabled; this sequence cannot be materialized".into(),
                ));
            }
        }
        if until.is_none() {
            self.assert_finite()?;
        }
        loop {
            let done = {
                let inner = self.inner.borrow();
                inner.generated || until.is_some_and(|n| inner.buffer.len() >= n)
            };
            if done {
                break;
            }
            let mut producer = {
                let mut inner = self.inner.borrow_mut();
                match inner.producer.take() {
                    Some(p) => p,
                    None => break,
                }
            };
            let item = producer.next();
            let mut inner = self.inner.borrow_mut();
            match item {
                None => {
                    inner.generated = true;
                    inner.estimate = None;
                    tracing::trace!(id = %inner.id, buffered = inner.buffer.len(), "materialized");
                }
                Some(Err(e)) => {
                    inner.producer = Some(producer);
                    return Err(e);
                }
                Some(Ok(v)) => {
                    inner.producer = Some(producer);
                    inner.buffer.push(v);
                }
            }
        }
        Ok(self.clone())
    }

    /// Drain the producer completely: collapses to Materialized when caching
    /// is on, otherwise just exhausts the stream.
    pub fn finalize(&self) -> Result<Sequence> {
        {
            let inner = self.inner.borrow();
            if inner.extended.is_some() || inner.dynamic.is_some() || inner.generated {
                return Ok(self.clone());
            }
            if inner.store {
                drop(inner);
                return self.ensure_generated(None);
            }
        }
        self.assert_finite()?;
        for item in self.iterate() {
            item?;
        }
        Ok(self.clone())
    }

    /// Stop caching pulled items. Only legal before anything is buffered;
    /// with `pass` set, derived sequences inherit the disabled store.
    pub fn disable_store(&self, pass: bool) -> Result<Sequence> {
        let mut inner = self.inner.borrow_mut();
        if inner.extended.is_some() {
            return Err(Error::InvalidOperationOnMode(
                "an extended sequence does not own a buffer".into(),
            ));
        }
        if inner.dynamic.is_some() || !inner.store {
            return Err(Error::InvalidOperationOnMode(
                "storing is disabled already".into(),
            ));
        }
        if !inner.buffer.is_empty() {
            return Err(Error::InvalidOperationOnMode(
                "items are already buffered".into(),
            ));
        }
        inner.store = false;
        inner.pass_store = pass;
        tracing::trace!(id = %inner.id, pass, "store disabled");
        Ok(self.clone())
    }

    /// Out-of-place conversion to Dynamic: materializes this sequence, then
    /// returns a dynamic view whose per-pass producer reads this sequence's
    /// buffer live (later `set_data` on the source is observed).
    pub fn to_dynamic(&self) -> Result<Sequence> {
        if self.is_dynamic() {
            return Ok(self.clone());
        }
        if !self.supports_dynamic() {
            return Err(Error::InvalidOperationOnMode(
                "this sequence cannot seed a dynamic view".into(),
            ));
        }
        self.ensure_generated(None)?;
        let src = self.clone();
        let result = Sequence::dynamic(Rc::new(move || {
            let src = src.clone();
            let mut idx = 0;
            Box::new(std::iter::from_fn(move || {
                let v = src.inner.borrow().buffer.get(idx).cloned()?;
                idx += 1;
                Some(Ok(v))
            }))
        }));
        result.adopt_from(self);
        Ok(result)
    }

    /// Leave Dynamic mode. In place, the current pass is consumed into a
    /// normal cached buffer; out of place, a fresh materialized copy is
    /// returned and this sequence stays dynamic.
    pub fn disable_dynamic(&self, in_place: bool) -> Result<Sequence> {
        if !self.is_dynamic() {
            return Err(Error::InvalidOperationOnMode(
                "the sequence is not dynamic".into(),
            ));
        }
        let items: Vec<Value> = self.iterate().collect::<Result<_>>()?;
        if in_place {
            let mut inner = self.inner.borrow_mut();
            inner.dynamic = None;
            inner.buffer = items;
            inner.store = true;
            inner.generated = true;
            inner.estimate = None;
            tracing::trace!(id = %inner.id, buffered = inner.buffer.len(), "dynamic disabled in place");
            Ok(self.clone())
        } else {
            let result = Sequence::from_values(items);
            result.adopt_from(self);
            Ok(result)
        }
    }

    /// Swap the complete buffer of a materialized sequence, keeping flags,
    /// payload, and lineage. Used by in-place reordering.
    pub fn replace_buffer(&self, items: Vec<Value>) -> Result<Sequence> {
        let mut inner = self.inner.borrow_mut();
        if inner.extended.is_some() || inner.dynamic.is_some() {
            return Err(Error::InvalidOperationOnMode(
                "this sequence does not own its items".into(),
            ));
        }
        if !inner.generated {
            return Err(Error::InvalidOperationOnMode(
                "the sequence is not fully materialized".into(),
            ));
        }
        inner.buffer = items;
        Ok(self.clone())
    }

    /// Replace the contents wholesale with new, known data.
    pub fn set_data(&self, items: Vec<Value>) -> Sequence {
        self.clear();
        self.inner.borrow_mut().buffer = items;
        self.clone()
    }

    /// Reset to an empty materialized state. Tag survives; ordering state,
    /// group key, producer, and mode conversions do not.
    pub fn clear(&self) -> Sequence {
        let mut inner = self.inner.borrow_mut();
        if inner.extended.is_none() {
            inner.buffer.clear();
        }
        inner.producer = None;
        inner.dynamic = None;
        inner.generated = true;
        inner.store = inner.extended.is_none();
        inner.estimate = None;
        inner.group_key = None;
        inner.ordering = None;
        self.clone()
    }
}

// --- derivation ---

impl Sequence {
    /// New sequence wired to a fresh producer expressed in terms of this
    /// sequence's iteration protocol. Lineage points back here; a disabled
    /// store is inherited when `pass_store` is set on the parent.
    pub fn derived(&self, producer: Pull, estimate: Option<CountEstimate>) -> Sequence {
        let child = Sequence::from_producer(producer, estimate);
        child.adopt_from(self);
        if self.pass_store() {
            let mut inner = child.inner.borrow_mut();
            inner.store = false;
            inner.pass_store = true;
        }
        child
    }

    /// Materialized derivation for eager operators (ordering, grouping).
    pub fn derived_materialized(&self, items: Vec<Value>) -> Sequence {
        let child = Sequence::from_values(items);
        child.adopt_from(self);
        child
    }

    fn adopt_from(&self, parent: &Sequence) {
        let parent_inner = parent.inner.borrow();
        let mut inner = self.inner.borrow_mut();
        inner.type_name = parent_inner.type_name.clone();
        inner.lineage = Some(Lineage {
            parent_id: parent_inner.id,
            parent: Rc::downgrade(&parent.inner),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|&i| Value::Int(i)).collect()
    }

    fn counting_producer(items: Vec<i64>, pulls: Rc<RefCell<usize>>) -> Pull {
        let mut iter = items.into_iter();
        Box::new(std::iter::from_fn(move || {
            *pulls.borrow_mut() += 1;
            iter.next().map(|i| Ok(Value::Int(i)))
        }))
    }

    #[test]
    fn materialized_iteration() {
        let seq = Sequence::from_values(ints(&[1, 3, 2]));
        assert!(seq.is_generated());
        let out: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(out, ints(&[1, 3, 2]));
        // Re-iteration is free for materialized sequences.
        let again: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn streaming_cached_memoizes_pulls() {
        let pulls = Rc::new(RefCell::new(0));
        let seq = Sequence::from_producer(
            counting_producer(vec![1, 3, 2], pulls.clone()),
            Some(CountEstimate::Finite(3)),
        );
        assert!(!seq.is_generated());
        seq.ensure_generated(None).unwrap();
        assert!(seq.is_generated());
        let first_pulls = *pulls.borrow();
        seq.ensure_generated(None).unwrap();
        let _: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        // Exactly one trip through the backing producer.
        assert_eq!(*pulls.borrow(), first_pulls);
        assert_eq!(seq.buffered_len(), 3);
    }

    #[test]
    fn partial_materialization_resumes() {
        let seq = Sequence::from_producer(
            counting_producer(vec![1, 2, 3, 4], Rc::new(RefCell::new(0))),
            None,
        );
        seq.ensure_generated(Some(2)).unwrap();
        assert_eq!(seq.buffered_len(), 2);
        assert!(!seq.is_generated());
        let out: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(out, ints(&[1, 2, 3, 4]));
        assert!(seq.is_generated());
    }

    #[test]
    fn single_pass_exhaustion_errors() {
        let seq = Sequence::from_producer(counting_producer(vec![1, 2], Rc::new(RefCell::new(0))), None)
            .disable_store(false)
            .unwrap();
        let out: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(out, ints(&[1, 2]));
        assert!(seq.buffered_len() == 0);
        let err = seq.iterate().next().unwrap().unwrap_err();
        assert!(matches!(err, Error::ExhaustedSingleUse));
    }

    #[test]
    fn disable_store_is_single_shot_and_pre_buffer_only() {
        let seq = Sequence::from_producer(counting_producer(vec![1], Rc::new(RefCell::new(0))), None);
        seq.disable_store(false).unwrap();
        assert!(matches!(
            seq.disable_store(false),
            Err(Error::InvalidOperationOnMode(_))
        ));

        let buffered = Sequence::from_producer(
            counting_producer(vec![1, 2], Rc::new(RefCell::new(0))),
            None,
        );
        buffered.ensure_generated(Some(1)).unwrap();
        assert!(matches!(
            buffered.disable_store(false),
            Err(Error::InvalidOperationOnMode(_))
        ));
    }

    #[test]
    fn dynamic_reflects_source_between_passes() {
        let shared = Rc::new(RefCell::new(ints(&[1, 3, 2])));
        let seq = Sequence::dynamic_over(shared.clone());
        assert!(seq.is_dynamic());
        let first: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(first, ints(&[1, 3, 2]));
        shared.borrow_mut().push(Value::Int(4));
        let second: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(second, ints(&[1, 3, 2, 4]));
    }

    #[test]
    fn dynamic_cannot_materialize_in_place() {
        let seq = Sequence::dynamic_over(Rc::new(RefCell::new(ints(&[1]))));
        assert!(matches!(
            seq.ensure_generated(None),
            Err(Error::InvalidOperationOnMode(_))
        ));
    }

    #[test]
    fn to_dynamic_tracks_source_buffer() {
        let seq = Sequence::from_values(ints(&[1, 3, 2]));
        let dynamic = seq.to_dynamic().unwrap();
        assert!(dynamic.is_dynamic());
        let first: Vec<Value> = dynamic.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(first, ints(&[1, 3, 2]));
        seq.set_data(ints(&[5]));
        let second: Vec<Value> = dynamic.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(second, ints(&[5]));
    }

    #[test]
    fn disable_dynamic_in_and_out_of_place() {
        let shared = Rc::new(RefCell::new(ints(&[1, 2])));
        let seq = Sequence::dynamic_over(shared.clone());

        let copy = seq.disable_dynamic(false).unwrap();
        assert!(!copy.is_dynamic());
        assert!(seq.is_dynamic());
        shared.borrow_mut().push(Value::Int(3));
        let frozen: Vec<Value> = copy.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(frozen, ints(&[1, 2]));

        seq.disable_dynamic(true).unwrap();
        assert!(!seq.is_dynamic());
        let out: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(out, ints(&[1, 2, 3]));
    }

    #[test]
    fn extended_delegates_iteration_and_length() {
        let foreign = Rc::new(RefCell::new(ints(&[1, 3, 2])));
        let seq = Sequence::extend(foreign.clone());
        assert!(seq.is_extended());
        assert_eq!(seq.try_length_hint(), LengthHint::Known(3));
        foreign.borrow_mut()[0] = Value::Int(0);
        let out: Vec<Value> = seq.iterate().collect::<Result<_>>().unwrap();
        assert_eq!(out, ints(&[0, 3, 2]));
    }

    #[test]
    fn length_hints() {
        let seq = Sequence::from_producer(
            counting_producer(vec![1, 2, 3], Rc::new(RefCell::new(0))),
            Some(CountEstimate::Finite(3)),
        );
        assert_eq!(seq.try_length_hint(), LengthHint::Known(3));
        let unhinted = Sequence::from_producer(
            counting_producer(vec![1], Rc::new(RefCell::new(0))),
            None,
        );
        assert_eq!(unhinted.try_length_hint(), LengthHint::Unknown);
        unhinted.ensure_generated(None).unwrap();
        assert_eq!(unhinted.try_length_hint(), LengthHint::Known(1));
    }

    #[test]
    fn infinite_fails_fast_on_materialization() {
        let seq = Sequence::from_infinite_producer(Box::new(
            (0..).map(|i| Ok(Value::Int(i))),
        ));
        assert!(seq.is_infinite());
        assert!(matches!(seq.assert_finite(), Err(Error::NotFinite)));
        assert!(matches!(seq.snapshot(), Err(Error::NotFinite)));
        assert!(matches!(seq.finalize(), Err(Error::NotFinite)));
    }

    #[test]
    fn lineage_is_non_owning() {
        let parent = Sequence::from_values(ints(&[1]));
        let child = parent.derived(defer({
            let src = parent.clone();
            move || src.iterate()
        }), None);
        assert_eq!(child.parent_id(), Some(parent.id()));
        assert!(child.parent().is_some());
        let parent_id = parent.id();
        drop(parent);
        // The producer closure keeps the parent alive; lineage alone does not.
        assert_eq!(child.parent_id(), Some(parent_id));
    }

    #[test]
    fn pass_store_inherited_by_derived() {
        let parent = Sequence::from_producer(
            counting_producer(vec![1], Rc::new(RefCell::new(0))),
            None,
        );
        parent.disable_store(true).unwrap();
        let child = parent.derived(defer({
            let src = parent.clone();
            move || src.iterate()
        }), None);
        assert!(!child.stores());
        assert!(child.pass_store());
    }
}
