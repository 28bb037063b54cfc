//! Small stream utilities: running averages and empty-source fallbacks.

use rinq_core::prelude::*;

pub trait MiscOps {
    /// Running halved average: `ma = (ma + item) / 2` per item.
    fn moving_averages(&self, seed: f64) -> Sequence;

    /// This sequence, or a single default item if it turns out empty.
    fn default_if_empty(&self, default: Value) -> Sequence;

    /// This sequence, or the fallback sequence if it turns out empty.
    fn fallback_if_empty(&self, fallback: &Sequence) -> Sequence;
}

impl MiscOps for Sequence {
    fn moving_averages(&self, seed: f64) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                let mut ma = seed;
                Box::new(std::iter::from_fn(move || match cur.next()? {
                    Err(e) => Some(Err(e)),
                    Ok(v) => match v.as_f64() {
                        Some(x) => {
                            ma = (ma + x) / 2.0;
                            Some(Ok(Value::Float(ma)))
                        }
                        None => Some(Err(Error::InvalidItemType {
                            op: "moving_averages",
                            found: v.kind(),
                        })),
                    },
                }))
            }),
            None,
        )
    }

    fn default_if_empty(&self, default: Value) -> Sequence {
        let src = self.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                match cur.next() {
                    None => Box::new(std::iter::once(Ok(default))) as Pull,
                    Some(first) => Box::new(std::iter::once(first).chain(cur)),
                }
            }),
            None,
        )
    }

    fn fallback_if_empty(&self, fallback: &Sequence) -> Sequence {
        let src = self.clone();
        let fallback = fallback.clone();
        self.derived(
            defer(move || {
                let mut cur = src.iterate();
                match cur.next() {
                    None => fallback.iterate(),
                    Some(first) => Box::new(std::iter::once(first).chain(cur)),
                }
            }),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(seq: &Sequence) -> Vec<Value> {
        seq.iterate().collect::<Result<_>>().unwrap()
    }

    #[test]
    fn moving_averages_fold_forward() {
        let seq = Sequence::from_values(vec![Value::Int(2), Value::Int(6)]);
        let out = collect(&seq.moving_averages(0.0));
        assert_eq!(out, vec![Value::Float(1.0), Value::Float(3.5)]);
    }

    #[test]
    fn moving_averages_reject_non_numeric_items() {
        let seq = Sequence::from_values(vec![Value::from("x")]);
        let err = seq.moving_averages(0.0).iterate().next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidItemType {
                op: "moving_averages",
                ..
            }
        ));
    }

    #[test]
    fn default_if_empty_substitutes_only_when_empty() {
        let out = Sequence::empty().default_if_empty(Value::Int(9));
        assert_eq!(collect(&out), vec![Value::Int(9)]);
        let seq = Sequence::from_values(vec![Value::Int(1)]);
        assert_eq!(collect(&seq.default_if_empty(Value::Int(9))), vec![Value::Int(1)]);
    }

    #[test]
    fn fallback_if_empty_switches_sources() {
        let fallback = Sequence::from_values(vec![Value::Int(7), Value::Int(8)]);
        let out = Sequence::empty().fallback_if_empty(&fallback);
        assert_eq!(collect(&out), vec![Value::Int(7), Value::Int(8)]);
    }
}
