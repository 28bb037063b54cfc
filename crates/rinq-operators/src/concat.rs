//! Concatenation and pairing: append/prepend/concat and the zip family.
//!
//! Length hints propagate additively when every operand is known-finite;
//! zip truncates to the shortest operand and requires every operand finite.

use std::rc::Rc;

use rinq_core::prelude::*;

pub trait ConcatOps {
    /// This sequence followed by the given items.
    fn append(&self, items: Vec<Value>) -> Sequence;

    /// The given items followed by this sequence.
    fn prepend(&self, items: Vec<Value>) -> Sequence;

    /// This sequence followed by each of the others in turn.
    fn concat(&self, others: &[Sequence]) -> Sequence;

    /// Pair items positionally as two-element lists.
    fn zip(&self, other: &Sequence) -> Sequence;

    /// Pair items positionally through a combiner.
    fn zip_with(&self, other: &Sequence, f: impl Fn(&Value, &Value) -> Value + 'static)
        -> Sequence;

    /// Triple items positionally as three-element lists.
    fn zip3(&self, second: &Sequence, third: &Sequence) -> Sequence;
}

fn additive_hint(hints: &[LengthHint]) -> Option<CountEstimate> {
    let mut total = 0usize;
    for hint in hints {
        match hint {
            LengthHint::Known(n) => total += n,
            LengthHint::Infinite => return Some(CountEstimate::Infinite),
            LengthHint::Unknown => return None,
        }
    }
    Some(CountEstimate::Finite(total))
}

fn min_hint(hints: &[LengthHint]) -> Option<CountEstimate> {
    let mut min: Option<usize> = None;
    for hint in hints {
        if let LengthHint::Known(n) = hint {
            min = Some(min.map_or(*n, |m| m.min(*n)));
        }
    }
    min.map(CountEstimate::Finite)
}

fn chain_sources(first: &Sequence, rest: Vec<Sequence>) -> Sequence {
    let hints: Vec<LengthHint> = std::iter::once(first.try_length_hint())
        .chain(rest.iter().map(|s| s.try_length_hint()))
        .collect();
    let src = first.clone();
    first.derived(
        defer(move || {
            let mut sources = std::iter::once(src.clone()).chain(rest.clone()).collect::<Vec<_>>();
            sources.reverse();
            let mut current: Option<Pull> = None;
            Box::new(std::iter::from_fn(move || loop {
                if current.is_none() {
                    current = Some(sources.pop()?.iterate());
                }
                match current.as_mut()?.next() {
                    Some(item) => return Some(item),
                    None => current = None,
                }
            }))
        }),
        additive_hint(&hints),
    )
}

fn zip_sources(
    driver: &Sequence,
    sources: Vec<Sequence>,
    combine: Rc<dyn Fn(Vec<Value>) -> Value>,
) -> Sequence {
    let hints: Vec<LengthHint> = sources.iter().map(|s| s.try_length_hint()).collect();
    driver.derived(
        defer(move || {
            for source in &sources {
                if let Err(e) = source.assert_finite() {
                    return Box::new(std::iter::once(Err(e))) as Pull;
                }
            }
            let mut cursors: Vec<Pull> = sources.iter().map(|s| s.iterate()).collect();
            let combine = combine.clone();
            Box::new(std::iter::from_fn(move || {
                let mut row = Vec::with_capacity(cursors.len());
                for cur in cursors.iter_mut() {
                    match cur.next()? {
                        Err(e) => return Some(Err(e)),
                        Ok(v) => row.push(v),
                    }
                }
                Some(Ok(combine(row)))
            }))
        }),
        min_hint(&hints),
    )
}

impl ConcatOps for Sequence {
    fn append(&self, items: Vec<Value>) -> Sequence {
        chain_sources(self, vec![Sequence::from_values(items)])
    }

    fn prepend(&self, items: Vec<Value>) -> Sequence {
        let hints = [LengthHint::Known(items.len()), self.try_length_hint()];
        let estimate = additive_hint(&hints);
        let src = self.clone();
        self.derived(
            defer(move || Box::new(items.into_iter().map(Ok).chain(src.iterate())) as Pull),
            estimate,
        )
    }

    fn concat(&self, others: &[Sequence]) -> Sequence {
        chain_sources(self, others.to_vec())
    }

    fn zip(&self, other: &Sequence) -> Sequence {
        zip_sources(
            self,
            vec![self.clone(), other.clone()],
            Rc::new(Value::List),
        )
    }

    fn zip_with(
        &self,
        other: &Sequence,
        f: impl Fn(&Value, &Value) -> Value + 'static,
    ) -> Sequence {
        zip_sources(
            self,
            vec![self.clone(), other.clone()],
            Rc::new(move |row: Vec<Value>| f(&row[0], &row[1])),
        )
    }

    fn zip3(&self, second: &Sequence, third: &Sequence) -> Sequence {
        zip_sources(
            self,
            vec![self.clone(), second.clone(), third.clone()],
            Rc::new(Value::List),
        )
    }
}
